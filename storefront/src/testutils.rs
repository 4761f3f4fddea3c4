use crate::config::Config;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use shared::env::Environment;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone)]
struct MockState {
    decision: (StatusCode, Value),
    recommendations: (StatusCode, Value),
    decision_hits: Arc<AtomicUsize>,
    last_decision: Arc<Mutex<Option<(String, Value)>>>,
    reco_paths: Arc<Mutex<Vec<String>>>,
}

/// Decision API and recommendation API served from one in-process listener.
pub struct MockUpstreams {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockUpstreams {
    pub async fn spawn(
        decision_status: StatusCode,
        decision_response: Value,
        reco_status: StatusCode,
        reco_response: Value,
    ) -> Self {
        let state = MockState {
            decision: (decision_status, decision_response),
            recommendations: (reco_status, reco_response),
            decision_hits: Arc::new(AtomicUsize::new(0)),
            last_decision: Arc::new(Mutex::new(None)),
            reco_paths: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/v2/{env_id}/flags", post(decide))
            .route("/v1/reco/{site_id}/recos/{reco_id}", get(recommend))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockUpstreams { addr, state }
    }

    pub fn decision_hits(&self) -> usize {
        self.state.decision_hits.load(Ordering::SeqCst)
    }

    /// Environment id and body of the most recent decision request.
    pub fn last_decision(&self) -> Option<(String, Value)> {
        self.state.last_decision.lock().unwrap().clone()
    }

    pub fn reco_paths(&self) -> Vec<String> {
        self.state.reco_paths.lock().unwrap().clone()
    }
}

async fn decide(
    State(state): State<MockState>,
    Path(env_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.decision_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_decision.lock().unwrap() = Some((env_id, body));
    let (status, response) = state.decision;
    (status, Json(response))
}

async fn recommend(State(state): State<MockState>, uri: Uri) -> (StatusCode, Json<Value>) {
    state.reco_paths.lock().unwrap().push(uri.path().to_string());
    let (status, response) = state.recommendations;
    (status, Json(response))
}

/// Default configuration pointed at `upstreams`.
pub fn test_config(upstreams: &MockUpstreams) -> Config {
    let mut config = Config::default();
    config.recommendations.base_url = Url::parse(&format!("http://{}", upstreams.addr)).unwrap();
    config.flag_provider.decision_url =
        Url::parse(&format!("http://{}/v2", upstreams.addr)).unwrap();
    config
}

pub fn test_env(vars: &[(&str, &str)]) -> Arc<dyn Environment> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(vars)
}
