//! Per-request pipeline: overrides, visitor, flag, recommendations.

use crate::config::{Config, EnvironmentNames, PageSettings};
use crate::metrics_defs::{PAGE_DEGRADED, PAGE_LOAD, PAGE_LOAD_DURATION};
use crate::params::OverrideParams;
use flag_client::{
    Account, AccountRegistry, ProviderError, ResolvedFlag, VisitorContext, VisitorRequest,
};
use recommender::{Product, RecommendationClient, RecommendationRequest, RecommendationResult};
use serde::Serialize;
use shared::env::{ConfigurationError, Environment, require_env};
use shared::trail::{LogLine, LogTrail, TrailOptions};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const TRAIL_SCOPE: &str = "Loader";

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Everything the page renderer needs for one request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageViewModel {
    pub visitor_id: String,
    pub account: Option<Account>,
    pub flag: Option<ResolvedFlag>,
    /// The value recommendations were requested for: the override if one was
    /// given, otherwise the visitor's assignment.
    pub flag_value: Option<String>,
    pub block_name: String,
    pub products: Vec<Product>,
    pub user_context: VisitorContext,
    pub overrides: OverrideParams,
    pub logs: Vec<LogLine>,
    /// Set when an error cut the pipeline short.
    pub degraded: bool,
}

struct Resolved {
    account: Account,
    flag: ResolvedFlag,
    flag_value: Option<String>,
    user_context: VisitorContext,
    recommendations: RecommendationResult,
}

pub struct PageLoader {
    registry: Arc<AccountRegistry>,
    recommender: RecommendationClient,
    env: Arc<dyn Environment>,
    settings: PageSettings,
    env_names: EnvironmentNames,
    variables: serde_json::Value,
    fields: Vec<String>,
}

impl PageLoader {
    pub fn new(config: &Config, registry: Arc<AccountRegistry>, env: Arc<dyn Environment>) -> Self {
        PageLoader {
            registry,
            recommender: RecommendationClient::new(&config.recommendations),
            env,
            settings: config.page.clone(),
            env_names: config.environment.clone(),
            variables: config.recommendations.variables.clone(),
            fields: config.recommendations.fields.clone(),
        }
    }

    /// Builds the view model for one request. Errors never escape: they are
    /// recorded in the trail and the page falls back to the default block.
    pub async fn load(&self, overrides: OverrideParams) -> PageViewModel {
        let started = Instant::now();
        counter!(PAGE_LOAD).increment(1);

        let mut trail = LogTrail::new(TrailOptions {
            timestamps: self.settings.log_timestamps,
            verbose: self.settings.verbose_trail,
        });
        trail.info(
            TRAIL_SCOPE,
            format!(
                "Parsed overrides: flagValue={}, accountValue={}, context keys={}",
                overrides.flag_value.as_deref().unwrap_or("-"),
                overrides.account.as_deref().unwrap_or("-"),
                overrides.extra_context.len()
            ),
        );

        let visitor_id = Uuid::new_v4().to_string();
        trail.info(TRAIL_SCOPE, format!("Generated visitorId: {visitor_id}"));

        let view = match self.resolve(&visitor_id, &overrides, &mut trail).await {
            Ok(resolved) => PageViewModel {
                visitor_id,
                account: Some(resolved.account),
                flag: Some(resolved.flag),
                flag_value: resolved.flag_value,
                block_name: resolved.recommendations.block_name,
                products: resolved.recommendations.products,
                user_context: resolved.user_context,
                overrides,
                logs: trail.into_lines(),
                degraded: false,
            },
            Err(e) => {
                counter!(PAGE_DEGRADED).increment(1);
                tracing::warn!(error = %e, visitor_id, "Serving fallback page");
                trail.info(TRAIL_SCOPE, format!("Loader error: {e}"));

                let fallback = RecommendationResult::fallback(self.recommender.fallback_label());
                PageViewModel {
                    visitor_id,
                    account: None,
                    flag: None,
                    flag_value: None,
                    block_name: fallback.block_name,
                    products: fallback.products,
                    user_context: VisitorContext::new(),
                    overrides,
                    logs: trail.into_lines(),
                    degraded: true,
                }
            }
        };

        histogram!(PAGE_LOAD_DURATION).record(started.elapsed().as_secs_f64());
        view
    }

    async fn resolve(
        &self,
        visitor_id: &str,
        overrides: &OverrideParams,
        trail: &mut LogTrail,
    ) -> Result<Resolved, LoaderError> {
        let site_id = require_env(self.env.as_ref(), &self.env_names.site_id_var)?;
        let bearer_token = require_env(self.env.as_ref(), &self.env_names.bearer_var)?;
        trail.info(TRAIL_SCOPE, "Environment variables verified");

        let account = self.registry.select_account(overrides.account.as_deref());
        trail.info(TRAIL_SCOPE, format!("Using flag provider {account}"));

        let mut request = VisitorRequest::new(visitor_id, self.settings.has_consented);
        request.merge_context(self.settings.default_context.clone());
        if !overrides.extra_context.is_empty() {
            trail.debug(
                TRAIL_SCOPE,
                format!("Merging query context: {}", to_json(&overrides.extra_context)),
            );
            request.merge_context(overrides.extra_context.clone());
        }

        trail.info(TRAIL_SCOPE, "Fetching flag provider visitor data");
        let visitor = self.registry.resolve_visitor(account, request).await?;
        trail.info(TRAIL_SCOPE, "Visitor data fetched");
        trail.info(
            TRAIL_SCOPE,
            format!("Reading user context: {}", to_json(visitor.context())),
        );

        let flag = visitor.get_flag(
            &self.settings.flag_key,
            self.settings.default_flag_value.as_deref(),
        );
        trail.info(TRAIL_SCOPE, format!("Flag key fetched: {}", flag.key));
        trail.info(
            TRAIL_SCOPE,
            format!("Campaign type: {}", to_json(&flag.metadata.campaign_type)),
        );
        trail.info(
            TRAIL_SCOPE,
            format!("Campaign name: {}", to_json(&flag.metadata.campaign_name)),
        );
        trail.info(
            TRAIL_SCOPE,
            format!("CampaignId: {}", to_json(&flag.metadata.campaign_id)),
        );

        // An empty assignment counts as no value.
        let flag_value = overrides
            .flag_value
            .clone()
            .or_else(|| flag.value.clone())
            .filter(|value| !value.is_empty());
        let recommendations = match flag_value.as_deref() {
            Some(value) => {
                trail.info(TRAIL_SCOPE, format!("Using flagValue: {value}"));
                let request = RecommendationRequest {
                    site_id: &site_id,
                    bearer_token: &bearer_token,
                    recommendation_id: value,
                    variables: &self.variables,
                    fields: &self.fields,
                };
                self.recommender.fetch_recommendations(&request, trail).await
            }
            None => {
                trail.info(
                    TRAIL_SCOPE,
                    "No flagValue provided, using default block name",
                );
                RecommendationResult::fallback(self.recommender.fallback_label())
            }
        };

        Ok(Resolved {
            account,
            flag,
            flag_value,
            user_context: visitor.context().clone(),
            recommendations,
        })
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
