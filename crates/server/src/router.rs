//! Path routing into the portrayal engine.
//!
//! The path grammar accepts `/<model>` and `/api/<model>` equivalently,
//! plus the two `$blobfile.bin` companion-fetch shapes. Anything else,
//! including an unexpected file segment, returns the generic single-space
//! body with HTTP 200, which the legacy viewer treats as "no content".

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use geoscene_core::{
    ogc::{KvpQuery, OgcResponse, BLOB_FILE},
    portrayal::PortrayalEngine,
    store::Namespace,
};

/// Builds the application router over a shared engine.
pub fn build_router(engine: Arc<PortrayalEngine>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/{model}", get(handle_service))
        .route("/api/{model}", get(handle_service))
        .route("/{model}/{file}", get(handle_model_file))
        .route("/api/{model}/{file}", get(handle_model_file))
        .fallback(handle_unknown)
        .with_state(engine)
}

fn into_http(response: OgcResponse) -> Response {
    ([(header::CONTENT_TYPE, response.content_type.to_string())], response.body).into_response()
}

/// Service requests: `/<model>?...` and `/api/<model>?...`.
async fn handle_service(
    State(engine): State<Arc<PortrayalEngine>>,
    Path(model): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = KvpQuery::parse(raw.as_deref().unwrap_or(""));
    into_http(engine.handle_service(&model, &query).await)
}

/// File requests under a model: only `$blobfile.bin` is meaningful.
async fn handle_model_file(
    State(engine): State<Arc<PortrayalEngine>>,
    Path((model, file)): Path<(String, String)>,
    RawQuery(raw): RawQuery,
) -> Response {
    if file != BLOB_FILE {
        return into_http(OgcResponse::blank());
    }
    let query = KvpQuery::parse(raw.as_deref().unwrap_or(""));
    into_http(engine.handle_blob(&model, &query))
}

/// Anything outside the path grammar.
async fn handle_unknown() -> Response {
    into_http(OgcResponse::blank())
}

/// Liveness endpoint reporting registry and store shape.
async fn handle_health(State(engine): State<Arc<PortrayalEngine>>) -> Response {
    let store = engine.store();
    let health = serde_json::json!({
        "status": "ok",
        "models": engine.model_count(),
        "cache": {
            "registry_entries": store.entry_count(Namespace::Registry),
            "index_entries": store.entry_count(Namespace::Index),
            "blob_entries": store.entry_count(Namespace::Blob),
        },
    });
    Json(health).into_response()
}
