//! Routes: static pages and the `/api/*` JSON endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use studydesk_core::{Assistant, Catalog, Listing, MaterialDraft, CLARIFY_MESSAGE};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub assistant: Arc<Assistant>,
}

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/materials", get(materials_page))
        .route("/ai-helper", get(ai_helper_page))
        .route("/profile", get(profile_page))
        .route("/health", get(health))
        .route("/api/materials", get(list_materials))
        .route("/api/add_material", post(add_material))
        .route("/api/delete_material/:id", delete(delete_material))
        .route("/api/ask_ai", post(ask_ai))
        .route("/static/style.css", get(stylesheet))
        .route("/static/script.js", get(script))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn index_page() -> Html<&'static str> {
    Html(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html")))
}

async fn materials_page() -> Html<&'static str> {
    Html(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/materials.html")))
}

async fn ai_helper_page() -> Html<&'static str> {
    Html(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/ai_helper.html")))
}

async fn profile_page() -> Html<&'static str> {
    Html(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/profile.html")))
}

async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/style.css")),
    )
}

async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/script.js")),
    )
}

async fn list_materials(State(state): State<AppState>) -> Json<Listing> {
    Json(state.catalog.list())
}

/// POST /api/add_material: 400 with `{status:"error"}` when the body is unusable or a field is missing.
async fn add_material(
    State(state): State<AppState>,
    payload: Result<Json<MaterialDraft>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let draft = match payload {
        Ok(Json(draft)) => draft,
        Err(rejection) => {
            tracing::warn!("[GATEWAY] add_material body rejected: {}", rejection);
            return error_response(rejection.body_text());
        }
    };
    // The catalog writes the data file synchronously.
    let catalog = Arc::clone(&state.catalog);
    match tokio::task::spawn_blocking(move || catalog.add(draft)).await {
        Ok(Ok(material)) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "material": material })),
        ),
        Ok(Err(e)) => error_response(e.to_string()),
        Err(e) => internal_error(e),
    }
}

fn error_response(message: String) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": message })),
    )
}

fn internal_error(e: tokio::task::JoinError) -> (StatusCode, Json<Value>) {
    tracing::error!("[GATEWAY] Catalog task failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": "internal error" })),
    )
}

async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<Value>) {
    let catalog = Arc::clone(&state.catalog);
    match tokio::task::spawn_blocking(move || catalog.delete(id)).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "success" }))),
        Err(e) => internal_error(e),
    }
}

/// POST /api/ask_ai: always 200; failures come back as the `answer` text.
async fn ask_ai(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Json<Value> {
    let answer = match payload {
        Ok(Json(AskRequest {
            question: Some(question),
        })) => state.assistant.ask(&question).await,
        Ok(Json(AskRequest { question: None })) => CLARIFY_MESSAGE.to_string(),
        Err(rejection) => {
            tracing::warn!("[GATEWAY] ask_ai body rejected: {}", rejection);
            format!(
                "Sorry, an unexpected error occurred: {}",
                rejection.body_text()
            )
        }
    };
    Json(json!({ "answer": answer }))
}
