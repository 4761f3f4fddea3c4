use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type VisitorContext = IndexMap<String, ContextValue>;

/// A targeting attribute attached to a visitor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ContextValue {
    /// Interprets a raw query-string value: `true`/`false` become booleans,
    /// numeric strings become numbers, anything else stays text.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "true" => return ContextValue::Bool(true),
            "false" => return ContextValue::Bool(false),
            _ => {}
        }

        if let Ok(i) = raw.parse::<i64>() {
            return ContextValue::Integer(i);
        }

        // `f64::from_str` also accepts "inf" and "NaN"; those stay text.
        let numeric_chars = raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        if numeric_chars
            && raw.chars().any(|c| c.is_ascii_digit())
            && let Ok(f) = raw.parse::<f64>()
            && f.is_finite()
        {
            return ContextValue::Float(f);
        }

        ContextValue::Text(raw.to_string())
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Bool(b) => write!(f, "{b}"),
            ContextValue::Integer(i) => write!(f, "{i}"),
            ContextValue::Float(x) => write!(f, "{x}"),
            ContextValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Integer(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Float(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

/// Identity that flags are evaluated against. Built once per page request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisitorRequest {
    pub id: String,
    pub has_consented: bool,
    pub context: VisitorContext,
}

impl VisitorRequest {
    pub fn new<I: Into<String>>(id: I, has_consented: bool) -> Self {
        VisitorRequest {
            id: id.into(),
            has_consented,
            context: VisitorContext::new(),
        }
    }

    /// Later entries overwrite earlier ones with the same key.
    pub fn merge_context<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, ContextValue)>,
    {
        self.context.extend(entries);
    }
}

/// Campaign information attached to a flag assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlagMetadata {
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub campaign_type: Option<String>,
    pub slug: Option<String>,
    pub variation_group_id: Option<String>,
    pub variation_id: Option<String>,
    pub is_reference: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedFlag {
    pub key: String,
    pub value: Option<String>,
    pub metadata: FlagMetadata,
}
