use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone)]
struct MockState {
    api_key: &'static str,
    status: StatusCode,
    response: Value,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<(String, Value)>>>,
}

/// In-process stand-in for the decision API.
pub struct MockDecisionApi {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<(String, Value)>>>,
}

impl MockDecisionApi {
    pub async fn spawn(api_key: &'static str, status: StatusCode, response: Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let state = MockState {
            api_key,
            status,
            response,
            hits: hits.clone(),
            last: last.clone(),
        };

        let app = Router::new()
            .route("/v2/{env_id}/flags", post(decide))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockDecisionApi { addr, hits, last }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/v2", self.addr)).unwrap()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Environment id and JSON body of the most recent decision request.
    pub fn last_request(&self) -> Option<(String, Value)> {
        self.last.lock().unwrap().clone()
    }
}

async fn decide(
    State(state): State<MockState>,
    Path(env_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last.lock().unwrap() = Some((env_id, body));

    let authorized = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| key == state.api_key);
    if !authorized {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"message": "invalid api key"})),
        );
    }

    (state.status, Json(state.response.clone()))
}
