//! Thin Axum HTTP surface over [`WikiService`].
//!
//! Spec.md §6 fixes the RPC contract, not a transport; this router is the
//! transport this crate happens to ship, grounded on
//! `crates/app/src/router.rs`'s `Router::new().with_state(Arc::new(..))`
//! shape. There is no business logic here beyond extracting request shapes
//! and calling straight through to `WikiService`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::service::{PathSegment, WikiService};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_status();
        (status, self.to_string()).into_response()
    }
}

type AppState = Arc<WikiService>;

pub fn build_router(service: Arc<WikiService>) -> Router {
    Router::new()
        .route("/pages", post(create_page))
        .route("/pages/{name}", get(read_page).put(update_page).delete(delete_page))
        .route("/pages/{name}/render", get(render_page))
        .route("/pages/{name}/content", put(update_content))
        .route("/pages/{name}/whole", put(update_whole))
        .route("/pages/{name}/frontmatter", get(get_frontmatter).delete(remove_frontmatter_key))
        .route("/pages/{name}/frontmatter/merge", patch(merge_frontmatter))
        .route("/pages/{name}/frontmatter/replace", put(replace_frontmatter))
        .route("/search", get(search))
        .with_state(service)
}

#[derive(Deserialize)]
struct CreateRequest {
    name: String,
    markdown: String,
    #[serde(default)]
    frontmatter_toml: String,
}

async fn create_page(
    State(service): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> Result<StatusCode, Error> {
    service.create(&req.name, &req.markdown, &req.frontmatter_toml)?;
    Ok(StatusCode::CREATED)
}

async fn read_page(State(service): State<AppState>, Path(name): Path<String>) -> Result<Response, Error> {
    Ok(Json(service.read(&name)?).into_response())
}

async fn render_page(State(service): State<AppState>, Path(name): Path<String>) -> Result<Response, Error> {
    Ok(service.render(&name)?.into_response())
}

#[derive(Deserialize)]
struct UpdateRequest {
    markdown: Option<String>,
    frontmatter_toml: Option<String>,
}

async fn update_page(
    State(service): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<StatusCode, Error> {
    service.update(&name, req.markdown.as_deref(), req.frontmatter_toml.as_deref())?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct UpdateContentRequest {
    markdown: String,
}

async fn update_content(
    State(service): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<StatusCode, Error> {
    service.update_content(&name, &req.markdown)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct UpdateWholeRequest {
    text: String,
}

async fn update_whole(
    State(service): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateWholeRequest>,
) -> Result<StatusCode, Error> {
    service.update_whole(&name, &req.text)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_page(State(service): State<AppState>, Path(name): Path<String>) -> Result<StatusCode, Error> {
    service.delete(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_frontmatter(
    State(service): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, Error> {
    Ok(Json(service.frontmatter_get(&name)?).into_response())
}

async fn merge_frontmatter(
    State(service): State<AppState>,
    Path(name): Path<String>,
    Json(overlay): Json<serde_json::Value>,
) -> Result<Response, Error> {
    Ok(Json(service.frontmatter_merge(&name, overlay)?).into_response())
}

async fn replace_frontmatter(
    State(service): State<AppState>,
    Path(name): Path<String>,
    Json(replacement): Json<serde_json::Value>,
) -> Result<Response, Error> {
    Ok(Json(service.frontmatter_replace(&name, replacement)?).into_response())
}

#[derive(Deserialize)]
struct RemoveKeyRequest {
    path: Vec<PathSegment>,
}

async fn remove_frontmatter_key(
    State(service): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RemoveKeyRequest>,
) -> Result<Response, Error> {
    Ok(Json(service.frontmatter_remove_key_at_path(&name, &req.path)?).into_response())
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default = "default_search_limit")]
    limit: usize,
}

fn default_search_limit() -> usize {
    20
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<crate::service::SearchResult>,
}

async fn search(
    State(service): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, Error> {
    let results = service.search(&params.q, params.limit)?;
    Ok(Json(SearchResponse { results }).into_response())
}
