//! Client for the flag provider's decision API.

use crate::metrics_defs::{DECISION_FETCH_DURATION, DECISION_FETCH_FAILURE, PROVIDER_START};
use crate::types::{FlagMetadata, VisitorContext, VisitorRequest};
use crate::visitor::{Flag, Visitor};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use shared::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub env_id: String,
    pub api_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderStatus {
    NotInitialized,
    Ready,
}

#[derive(thiserror::Error, Debug)]
pub enum ProviderInitError {
    #[error("missing credentials for {account}: {source}")]
    MissingCredentials {
        account: crate::config::Account,
        #[source]
        source: shared::env::ConfigurationError,
    },
    #[error("{0} is not configured")]
    UnconfiguredAccount(crate::config::Account),
    #[error("empty {0}")]
    EmptyCredential(&'static str),
    #[error("invalid decision URL: {0}")]
    InvalidUrl(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ProviderFetchError {
    #[error("flag provider client is not initialized")]
    NotInitialized,
    #[error("decision API request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("decision API returned {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

#[derive(Serialize)]
struct DecisionRequest<'a> {
    visitor_id: &'a str,
    context: &'a VisitorContext,
    visitor_consent: bool,
    trigger_hit: bool,
}

#[derive(Deserialize)]
struct DecisionFlag {
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    metadata: FlagMetadata,
}

/// A started connection to the flag provider for one set of credentials.
///
/// The client stays `Ready` until [`ProviderClient::close`] is called; the
/// registry replaces closed clients on the next lookup.
pub struct ProviderClient {
    client: reqwest::Client,
    flags_url: Url,
    api_key: String,
    ready: AtomicBool,
}

impl ProviderClient {
    pub fn start(credentials: Credentials, decision_url: &Url) -> Result<Self, ProviderInitError> {
        if credentials.env_id.is_empty() {
            return Err(ProviderInitError::EmptyCredential("environment id"));
        }
        if credentials.api_key.is_empty() {
            return Err(ProviderInitError::EmptyCredential("API key"));
        }

        let mut flags_url = decision_url.clone();
        flags_url
            .path_segments_mut()
            .map_err(|_| ProviderInitError::InvalidUrl(decision_url.to_string()))?
            .pop_if_empty()
            .extend([credentials.env_id.as_str(), "flags"]);

        counter!(PROVIDER_START).increment(1);
        tracing::info!(env_id = %credentials.env_id, "Started flag provider client");

        Ok(ProviderClient {
            client: reqwest::Client::new(),
            flags_url,
            api_key: credentials.api_key,
            ready: AtomicBool::new(true),
        })
    }

    pub fn status(&self) -> ProviderStatus {
        match self.ready.load(Ordering::Relaxed) {
            true => ProviderStatus::Ready,
            false => ProviderStatus::NotInitialized,
        }
    }

    pub fn close(&self) {
        self.ready.store(false, Ordering::Relaxed);
    }

    pub fn new_visitor(self: &Arc<Self>, request: VisitorRequest) -> Visitor {
        Visitor::new(self.clone(), request)
    }

    pub(crate) async fn fetch_decisions(
        &self,
        request: &VisitorRequest,
    ) -> Result<HashMap<String, Flag>, ProviderFetchError> {
        if self.status() != ProviderStatus::Ready {
            return Err(ProviderFetchError::NotInitialized);
        }

        let started = Instant::now();
        let result = self.post_decision(request).await;
        histogram!(DECISION_FETCH_DURATION).record(started.elapsed().as_secs_f64());

        if result.is_err() {
            counter!(DECISION_FETCH_FAILURE).increment(1);
        }
        result
    }

    async fn post_decision(
        &self,
        request: &VisitorRequest,
    ) -> Result<HashMap<String, Flag>, ProviderFetchError> {
        let body = DecisionRequest {
            visitor_id: &request.id,
            context: &request.context,
            visitor_consent: request.has_consented,
            trigger_hit: false,
        };

        let response = self
            .client
            .post(self.flags_url.clone())
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFetchError::UnexpectedStatus { status, body });
        }

        let decisions = response.json::<HashMap<String, DecisionFlag>>().await?;

        Ok(decisions
            .into_iter()
            .map(|(key, decision)| {
                let flag = Flag {
                    key: key.clone(),
                    value: decision.value,
                    metadata: decision.metadata,
                };
                (key, flag)
            })
            .collect())
    }
}
