use flag_client::types::{ContextValue, VisitorContext};
use serde::Serialize;

/// Query parameter overriding the flag value resolved for the visitor.
pub const FLAG_VALUE_PARAM: &str = "flagValue";
/// Query parameter selecting the flag provider account.
pub const ACCOUNT_PARAM: &str = "accountValue";

/// Overrides parsed from the page's query string. Every parameter other than
/// the two reserved ones becomes a visitor context entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OverrideParams {
    pub flag_value: Option<String>,
    pub account: Option<String>,
    pub extra_context: VisitorContext,
}

impl OverrideParams {
    /// Builds overrides from decoded query pairs. Reserved parameters keep
    /// their first occurrence, and an empty one counts as absent. Repeated
    /// context keys keep the last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = OverrideParams::default();
        let (mut seen_flag_value, mut seen_account) = (false, false);

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                FLAG_VALUE_PARAM if !seen_flag_value => {
                    seen_flag_value = true;
                    params.flag_value = non_empty(value);
                }
                ACCOUNT_PARAM if !seen_account => {
                    seen_account = true;
                    params.account = non_empty(value);
                }
                FLAG_VALUE_PARAM | ACCOUNT_PARAM | "" => {}
                _ => {
                    params
                        .extra_context
                        .insert(key.to_string(), ContextValue::coerce(value));
                }
            }
        }

        params
    }

    /// Parses a raw (still percent-encoded) query string.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
