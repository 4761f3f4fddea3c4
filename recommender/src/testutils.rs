use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

type Recorded = Arc<Mutex<Option<(String, HashMap<String, String>)>>>;

#[derive(Clone)]
struct MockState {
    bearer: &'static str,
    status: StatusCode,
    response: Value,
    last: Recorded,
}

/// In-process stand-in for the recommendation API.
pub struct MockRecommendationApi {
    pub addr: SocketAddr,
    last: Recorded,
}

impl MockRecommendationApi {
    pub async fn spawn(bearer: &'static str, status: StatusCode, response: Value) -> Self {
        let last: Recorded = Arc::new(Mutex::new(None));
        let state = MockState {
            bearer,
            status,
            response,
            last: last.clone(),
        };

        let app = Router::new()
            .route("/v1/reco/{site_id}/recos/{reco_id}", get(recommend))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockRecommendationApi { addr, last }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Path and decoded query of the most recent request.
    pub fn last_request(&self) -> Option<(String, HashMap<String, String>)> {
        self.last.lock().unwrap().clone()
    }
}

async fn recommend(
    State(state): State<MockState>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    *state.last.lock().unwrap() = Some((uri.path().to_string(), query));

    let expected = format!("Bearer {}", state.bearer);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "unauthorized"})),
        );
    }

    (state.status, Json(state.response.clone()))
}
