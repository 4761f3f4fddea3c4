use crate::config::Config;
use crate::metrics_defs::{
    RECOMMENDATION_FETCH_DURATION, RECOMMENDATION_FETCH_FAILURE, RECOMMENDATION_ITEMS,
};
use crate::types::{RecommendationResponse, RecommendationResult};
use http::StatusCode;
use serde_json::Value;
use shared::trail::LogTrail;
use shared::{counter, histogram};
use std::time::Instant;
use url::Url;

const TRAIL_SCOPE: &str = "Recommendations";

#[derive(thiserror::Error, Debug)]
pub enum RecommendationFetchError {
    #[error("invalid recommendation URL: {0}")]
    InvalidUrl(String),
    #[error("could not encode query: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("recommendation API request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("recommendation API returned {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

/// Parameters of a single recommendation lookup.
#[derive(Clone, Copy, Debug)]
pub struct RecommendationRequest<'a> {
    pub site_id: &'a str,
    pub bearer_token: &'a str,
    /// Strategy id, usually the resolved flag value.
    pub recommendation_id: &'a str,
    pub variables: &'a Value,
    pub fields: &'a [String],
}

#[derive(Clone)]
pub struct RecommendationClient {
    client: reqwest::Client,
    base_url: Url,
    fallback_label: String,
}

impl RecommendationClient {
    pub fn new(config: &Config) -> Self {
        RecommendationClient {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            fallback_label: config.fallback_label.clone(),
        }
    }

    pub fn fallback_label(&self) -> &str {
        &self.fallback_label
    }

    /// Fetches one recommendation block. Never fails: any error is written to
    /// `trail` and replaced by an empty block carrying the fallback label.
    pub async fn fetch_recommendations(
        &self,
        request: &RecommendationRequest<'_>,
        trail: &mut LogTrail,
    ) -> RecommendationResult {
        trail.info(
            TRAIL_SCOPE,
            format!(
                "Fetching recommendations for flagValue {}",
                request.recommendation_id
            ),
        );

        let started = Instant::now();
        let result = self.try_fetch(request).await;
        histogram!(RECOMMENDATION_FETCH_DURATION).record(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                let block_name = response
                    .name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| self.fallback_label.clone());
                let products = response.items.unwrap_or_default();

                histogram!(RECOMMENDATION_ITEMS).record(products.len() as f64);
                trail.info(
                    TRAIL_SCOPE,
                    format!("Recommendations fetched: {}", products.len()),
                );
                trail.info(TRAIL_SCOPE, format!("Block name: {block_name}"));

                RecommendationResult {
                    block_name,
                    products,
                }
            }
            Err(e) => {
                counter!(RECOMMENDATION_FETCH_FAILURE).increment(1);
                tracing::warn!(
                    error = %e,
                    recommendation_id = request.recommendation_id,
                    "Recommendation fetch failed"
                );
                trail.info(TRAIL_SCOPE, format!("Failed to fetch recommendations: {e}"));
                RecommendationResult::fallback(&self.fallback_label)
            }
        }
    }

    async fn try_fetch(
        &self,
        request: &RecommendationRequest<'_>,
    ) -> Result<RecommendationResponse, RecommendationFetchError> {
        let url = self.build_url(request)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(request.bearer_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendationFetchError::UnexpectedStatus { status, body });
        }

        Ok(response.json::<RecommendationResponse>().await?)
    }

    fn build_url(&self, request: &RecommendationRequest<'_>) -> Result<Url, RecommendationFetchError> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| RecommendationFetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "reco",
                request.site_id,
                "recos",
                request.recommendation_id,
            ]);

        let variables = serde_json::to_string(request.variables)?;
        let fields = serde_json::to_string(request.fields)?;
        url.query_pairs_mut()
            .append_pair("variables", &variables)
            .append_pair("fields", &fields);

        Ok(url)
    }
}
