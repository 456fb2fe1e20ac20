use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ============================================================================
// Stub HTTP Server
// ============================================================================

pub const ADMIN_CREDENTIALS: &str = "let-me-in";

#[derive(Default)]
struct StubState {
    /// Names that win; everyone else loses
    winners: HashSet<String>,
    played: Mutex<HashSet<String>>,
    plays: Mutex<u64>,
}

/// Local HTTP server standing in for the script endpoint
pub struct StubServer {
    pub base_url: String,
    state: Arc<StubState>,
    _handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        Self::start_with_winners(&[]).await
    }

    pub async fn start_with_winners(winners: &[&str]) -> Self {
        let state = Arc::new(StubState {
            winners: winners.iter().map(|name| name.to_string()).collect(),
            ..StubState::default()
        });

        let app = Router::new()
            .route("/json", get(json_route).post(echo_route))
            .route("/text", get(|| async { "plain text" }))
            .route("/fail", get(fail_route))
            .route("/headers", get(headers_route))
            .route("/exec", get(play_count_route).post(exec_route))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            _handle: handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn exec_url(&self) -> String {
        self.url("/exec")
    }

    pub fn has_played(&self, name: &str) -> bool {
        self.state.played.lock().unwrap().contains(name)
    }
}

async fn json_route() -> Json<Value> {
    Json(json!({"hello": "vault"}))
}

async fn echo_route(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"echo": body}))
}

async fn fail_route() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "boom"})),
    )
}

async fn headers_route(headers: HeaderMap) -> Json<Value> {
    let client = headers
        .get("x-client")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    Json(json!({"x-client": client}))
}

async fn play_count_route(State(state): State<Arc<StubState>>) -> Json<Value> {
    // The real endpoint reports the count as a string
    let plays = *state.plays.lock().unwrap();
    Json(json!({"plays": plays.to_string()}))
}

async fn exec_route(
    State(state): State<Arc<StubState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    let name = form.get("name").cloned().unwrap_or_default();

    match form.get("action").map(String::as_str) {
        Some("play") => {
            if !state.played.lock().unwrap().insert(name.clone()) {
                return Json(json!({"error": "name_already_played"}));
            }
            *state.plays.lock().unwrap() += 1;

            if state.winners.contains(&name) {
                Json(json!({"result": "win", "claimCode": format!("CV-{}", name.len())}))
            } else {
                Json(json!({"result": "lose"}))
            }
        }
        Some("delete") => {
            if form.get("credentials").map(String::as_str) != Some(ADMIN_CREDENTIALS) {
                return Json(json!({"error": "unauthorized"}));
            }
            let removed = state.played.lock().unwrap().remove(&name);
            Json(json!({"deleted": removed, "name": name}))
        }
        _ => Json(json!({"error": "unknown_action"})),
    }
}
