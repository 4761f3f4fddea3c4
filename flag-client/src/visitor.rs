use crate::provider::{ProviderClient, ProviderFetchError};
use crate::types::{ContextValue, FlagMetadata, ResolvedFlag, VisitorContext, VisitorRequest};
use std::collections::HashMap;
use std::sync::Arc;

/// Key reported for flags the provider did not assign to the visitor.
pub const UNKNOWN_FLAG_KEY: &str = "unknown";

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Flag {
    pub key: String,
    pub value: serde_json::Value,
    pub metadata: FlagMetadata,
}

pub struct Visitor {
    client: Arc<ProviderClient>,
    request: VisitorRequest,
    flags: HashMap<String, Flag>,
}

impl Visitor {
    pub(crate) fn new(client: Arc<ProviderClient>, request: VisitorRequest) -> Self {
        Visitor {
            client,
            request,
            flags: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.request.id
    }

    pub fn has_consented(&self) -> bool {
        self.request.has_consented
    }

    pub fn context(&self) -> &VisitorContext {
        &self.request.context
    }

    /// Takes effect on the next [`Visitor::fetch_flags`].
    pub fn update_context<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, ContextValue)>,
    {
        self.request.merge_context(entries);
    }

    /// Replaces the visitor's assignments with a fresh decision.
    pub async fn fetch_flags(&mut self) -> Result<(), ProviderFetchError> {
        self.flags = self.client.fetch_decisions(&self.request).await?;
        tracing::debug!(
            visitor_id = %self.request.id,
            flags = self.flags.len(),
            "Fetched flag assignments"
        );
        Ok(())
    }

    /// Reads a flag, falling back to `default` when the flag is not assigned
    /// or its value is null.
    pub fn get_flag(&self, key: &str, default: Option<&str>) -> ResolvedFlag {
        match self.flags.get(key) {
            Some(flag) => ResolvedFlag {
                key: flag.key.clone(),
                value: flag_value(&flag.value).or_else(|| default.map(String::from)),
                metadata: flag.metadata.clone(),
            },
            None => ResolvedFlag {
                key: UNKNOWN_FLAG_KEY.to_string(),
                value: default.map(String::from),
                metadata: FlagMetadata::default(),
            },
        }
    }
}

fn flag_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
