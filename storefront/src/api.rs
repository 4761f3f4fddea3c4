use crate::loader::{PageLoader, PageViewModel};
use crate::params::OverrideParams;
use crate::render::{FormOptions, render_page};
use axum::extract::{RawQuery, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::HeaderValue;
use http::header::CACHE_CONTROL;
use std::sync::Arc;

pub const CACHE_CONTROL_VALUE: &str = "public, max-age=15, stale-while-revalidate=15";

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<PageLoader>,
    pub form: Arc<FormOptions>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/api/page", get(page_data))
        .with_state(state)
}

async fn load(loader: &PageLoader, query: Option<String>) -> PageViewModel {
    let overrides = OverrideParams::from_query(query.as_deref().unwrap_or_default());
    loader.load(overrides).await
}

// Degraded pages must not be cached.
fn with_cache_policy(view: &PageViewModel, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if !view.degraded {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    }
    response
}

async fn page(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let view = load(&state.loader, query).await;
    let html = render_page(&view, &state.form);
    with_cache_policy(&view, Html(html))
}

async fn page_data(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let view = load(&state.loader, query).await;
    let response = Json(&view).into_response();
    with_cache_policy(&view, response)
}
