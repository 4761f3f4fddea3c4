//! The recommendation page service.
//!
//! Every request runs the [`loader::PageLoader`] pipeline: query overrides,
//! flag provider visitor, flag value, recommendations. The result is rendered
//! as HTML on `/` and returned as JSON on `/api/page`.

pub mod api;
pub mod config;
pub mod errors;
pub mod loader;
pub mod metrics_defs;
pub mod params;
pub mod render;

#[cfg(test)]
mod testutils;

use crate::api::AppState;
use crate::errors::StorefrontError;
use crate::loader::PageLoader;
use crate::render::FormOptions;
use flag_client::{Account, AccountRegistry};
use shared::admin_service::AdminService;
use shared::env::{Environment, ProcessEnv};
use shared::http::run_http_service;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run(config: config::Config) -> Result<(), StorefrontError> {
    config.validate()?;

    let env: Arc<dyn Environment> = Arc::new(ProcessEnv);
    let registry = Arc::new(AccountRegistry::new(
        config.flag_provider.clone(),
        env.clone(),
    ));

    let default_account = Account::default();
    if !registry.has_credentials(default_account) {
        tracing::warn!(
            account = %default_account,
            "Flag provider credentials are missing, pages will be degraded"
        );
    }

    let state = AppState {
        loader: Arc::new(PageLoader::new(&config, registry.clone(), env)),
        form: Arc::new(FormOptions {
            title: config.page.title.clone(),
            strategies: config.page.strategies.clone(),
            accounts: config.flag_provider.accounts.keys().copied().collect(),
        }),
    };

    let admin_service =
        AdminService::new(move || registry.has_credentials(Account::default()));
    let admin_task = run_http_service::<_, StorefrontError>(
        &config.admin_listener.0.host,
        config.admin_listener.0.port,
        admin_service,
    );

    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr, "Storefront listening");
    let page_task = async {
        axum::serve(listener, api::router(state)).await?;
        Ok::<_, StorefrontError>(())
    };

    tokio::try_join!(page_task, admin_task)?;
    Ok(())
}
