//! Feature-flag provider client.
//!
//! [`AccountRegistry`] owns one provider client per configured account and
//! hands out [`Visitor`]s whose flag assignments have already been fetched.

pub mod config;
pub mod metrics_defs;
pub mod provider;
pub mod registry;
pub mod types;
pub mod visitor;

#[cfg(test)]
mod testutils;

pub use config::Account;
pub use registry::{AccountRegistry, ProviderError};
pub use types::{ContextValue, FlagMetadata, ResolvedFlag, VisitorContext, VisitorRequest};
pub use visitor::Visitor;
