//! In-process stand-in for the shelter REST backend, used by tests.

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct BackendState {
    collections: HashMap<String, Vec<Value>>,
    reads: HashMap<String, usize>,
    writes: usize,
    next_id: u64,
    fail_reads: bool,
    fail_writes_silently: bool,
}

#[derive(Clone, Default)]
pub(crate) struct StubBackend {
    state: Arc<Mutex<BackendState>>,
}

type Shared = Arc<Mutex<BackendState>>;

impl StubBackend {
    pub(crate) fn with_dogs(dogs: Vec<Value>) -> Self {
        let backend = Self::default();
        backend
            .state
            .lock()
            .unwrap()
            .collections
            .insert("dogs".to_string(), dogs);
        backend
    }

    pub(crate) fn reads(&self, collection: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.reads.get(collection).copied().unwrap_or(0)
    }

    pub(crate) fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub(crate) fn fail_writes_silently(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes_silently = fail;
    }

    /// Serve on an ephemeral port and return the API base URL.
    pub(crate) async fn url(&self) -> String {
        let app = Router::new()
            .route("/api/{collection}/", get(list).post(create))
            .route("/api/{collection}/{id}/", axum::routing::put(update).delete(remove))
            .with_state(self.state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }
}

/// A base URL nothing listens on.
pub(crate) fn unreachable_url() -> String {
    "http://127.0.0.1:1/api".to_string()
}

fn singular(collection: &str) -> &'static str {
    match collection {
        "dogs" => "Dog",
        "breeds" => "Breed",
        _ => "Rescue type",
    }
}

async fn list(State(state): State<Shared>, Path(collection): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    *state.reads.entry(collection.clone()).or_insert(0) += 1;
    if state.fail_reads {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let items = state.collections.get(&collection).cloned().unwrap_or_default();
    Json(Value::Array(items)).into_response()
}

async fn create(
    State(state): State<Shared>,
    Path(collection): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.writes += 1;
    if state.fail_writes_silently {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let (field, conflict) = if collection == "dogs" {
        ("animal_id", "Dog with this animal_id already exists.".to_string())
    } else {
        ("name", format!("{} already exists", singular(&collection)))
    };
    let items = state.collections.entry(collection.clone()).or_default();
    if items.iter().any(|item| item[field] == body[field]) {
        return (StatusCode::CONFLICT, Json(json!({ "error": conflict }))).into_response();
    }

    state.next_id += 1;
    let id = format!("id-{}", state.next_id);
    body["_id"] = json!(id);
    state.collections.entry(collection.clone()).or_default().push(body);
    (
        StatusCode::CREATED,
        Json(json!({ "message": format!("{} added", singular(&collection)), "id": id })),
    )
        .into_response()
}

async fn update(
    State(state): State<Shared>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.writes += 1;
    if state.fail_writes_silently {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let items = state.collections.entry(collection.clone()).or_default();
    let Some(item) = items.iter_mut().find(|item| item["_id"] == json!(id)) else {
        let message = format!("{} not found", singular(&collection));
        return (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response();
    };
    if let (Some(target), Some(fields)) = (item.as_object_mut(), body.as_object()) {
        for (key, value) in fields {
            if key != "_id" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    Json(json!({ "message": format!("{} updated", singular(&collection)), "id": id }))
        .into_response()
}

async fn remove(
    State(state): State<Shared>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.writes += 1;
    if state.fail_writes_silently {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let items = state.collections.entry(collection.clone()).or_default();
    let before = items.len();
    items.retain(|item| item["_id"] != json!(id));
    if items.len() == before {
        let message = format!("{} not found", singular(&collection));
        return (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response();
    }
    Json(json!({ "message": format!("{} deleted", singular(&collection)) })).into_response()
}
