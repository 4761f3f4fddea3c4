//! Environment lookups for request-time configuration.
//!
//! Secrets such as API keys are read from the process environment rather than
//! the config file. Reads go through [`Environment`] so callers can be handed a
//! fixed map in tests.

use std::collections::HashMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing environment variable: {0}")]
    Missing(String),
    #[error("missing environment variables: neither {primary} nor {secondary} is set")]
    MissingEither { primary: String, secondary: String },
}

pub trait Environment: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

// Empty values are treated the same as unset ones.
fn lookup(env: &dyn Environment, name: &str) -> Option<String> {
    env.get(name).filter(|value| !value.is_empty())
}

pub fn require_env(env: &dyn Environment, name: &str) -> Result<String, ConfigurationError> {
    lookup(env, name).ok_or_else(|| ConfigurationError::Missing(name.to_string()))
}

/// Returns `primary` if set, otherwise `secondary`.
pub fn require_env_with_fallback(
    env: &dyn Environment,
    primary: &str,
    secondary: &str,
) -> Result<String, ConfigurationError> {
    lookup(env, primary)
        .or_else(|| lookup(env, secondary))
        .ok_or_else(|| ConfigurationError::MissingEither {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        })
}
