//! Entity routes.
//!
//! [`CrudRouter`] exposes every registered entity under two routes:
//!
//! - `GET /{entity}` - filtered, paginated list: `{"total": n, "result": [...]}`
//! - `POST /{entity}` - insert an object (returns it) or an array (returns the rows), 201
//! - `PUT /{entity}` - replace every matching row
//! - `PATCH /{entity}` - patch every matching row
//! - `DELETE /{entity}` - delete every matching row
//! - `GET /{entity}/{pk}` - one row, or 404 with an empty body
//! - `PUT /{entity}/{pk}`, `PATCH /{entity}/{pk}`, `DELETE /{entity}/{pk}`
//!
//! Filters come from the raw query string; bodies are JSON.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use quickcrud_core::logging::request_span;
use quickcrud_core::{CrudError, ParamMap, ValidationError};
use quickcrud_db::MutationCoordinator;
use tower_http::trace::TraceLayer;

use crate::response::{rows_json, ApiError, ApiResult};

/// Builds the axum router for a [`MutationCoordinator`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use quickcrud_db::{ColumnSpec, MutationCoordinator, SchemaRegistry, SemanticType};
/// use quickcrud_db_backends::InMemoryExecutor;
/// use quickcrud_http::CrudRouter;
///
/// let mut registry = SchemaRegistry::new();
/// registry
///     .register("items", vec![ColumnSpec::new("id", SemanticType::Int64).primary_key()])
///     .unwrap();
/// let coordinator = MutationCoordinator::new(registry.into_shared(), Arc::new(InMemoryExecutor::new()));
/// let _router = CrudRouter::new(coordinator).url_prefix("/api").into_router();
/// ```
#[derive(Debug, Clone)]
pub struct CrudRouter {
    coordinator: MutationCoordinator,
    url_prefix: String,
}

impl CrudRouter {
    /// Creates a router with no URL prefix.
    pub fn new(coordinator: MutationCoordinator) -> Self {
        Self {
            coordinator,
            url_prefix: String::new(),
        }
    }

    /// Sets the prefix prepended to every route (e.g. `"/api"`).
    #[must_use]
    pub fn url_prefix(mut self, prefix: &str) -> Self {
        self.url_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Returns the collection route pattern.
    pub fn collection_path(&self) -> String {
        format!("{}/{{entity}}", self.url_prefix)
    }

    /// Returns the single-resource route pattern.
    pub fn resource_path(&self) -> String {
        format!("{}/{{entity}}/{{pk}}", self.url_prefix)
    }

    /// Generates the axum router.
    pub fn into_router(self) -> Router {
        Router::new()
            .route(
                &self.collection_path(),
                get(list)
                    .post(create)
                    .put(replace_many)
                    .patch(patch_many)
                    .delete(delete_many),
            )
            .route(
                &self.resource_path(),
                get(retrieve)
                    .put(replace_one)
                    .patch(patch_one)
                    .delete(delete_one),
            )
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| request_span(req.method().as_str(), req.uri().path())),
            )
            .with_state(self.coordinator)
    }
}

fn params(query: Option<&str>) -> ParamMap {
    ParamMap::parse(query.unwrap_or(""))
}

fn parse_body(body: &Bytes) -> ApiResult<serde_json::Value> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError(
            ValidationError::new(format!("Malformed JSON body: {e}"), "invalid_body").into(),
        )
    })
}

// ── Collection handlers ────────────────────────────────────────────

async fn list(
    State(coordinator): State<MutationCoordinator>,
    Path(entity): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let result = coordinator.find_many(&entity, &params(query.as_deref())).await?;
    Ok(Json(result).into_response())
}

async fn create(
    State(coordinator): State<MutationCoordinator>,
    Path(entity): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&body)?;
    let payload = if body.is_array() {
        rows_json(&coordinator.insert_many(&entity, &body).await?)
    } else {
        coordinator.insert_one(&entity, &body).await?.to_json()
    };
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

async fn replace_many(
    State(coordinator): State<MutationCoordinator>,
    Path(entity): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&body)?;
    let rows = coordinator
        .replace_many(&entity, &params(query.as_deref()), &body)
        .await?;
    Ok(Json(rows_json(&rows)).into_response())
}

async fn patch_many(
    State(coordinator): State<MutationCoordinator>,
    Path(entity): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&body)?;
    let rows = coordinator
        .patch_many(&entity, &params(query.as_deref()), &body)
        .await?;
    Ok(Json(rows_json(&rows)).into_response())
}

async fn delete_many(
    State(coordinator): State<MutationCoordinator>,
    Path(entity): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let rows = coordinator.delete_many(&entity, &params(query.as_deref())).await?;
    Ok(Json(rows_json(&rows)).into_response())
}

// ── Single-resource handlers ───────────────────────────────────────

async fn retrieve(
    State(coordinator): State<MutationCoordinator>,
    Path((entity, pk)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    match coordinator.find_one(&entity, &pk, &params(query.as_deref())).await {
        Ok(row) => Ok(Json(row).into_response()),
        Err(CrudError::NotFound(detail)) => {
            tracing::debug!(entity = %entity, pk = %pk, detail = %detail, "No match");
            Ok(StatusCode::NOT_FOUND.into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn replace_one(
    State(coordinator): State<MutationCoordinator>,
    Path((entity, pk)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&body)?;
    let row = coordinator
        .replace_one(&entity, &pk, &params(query.as_deref()), &body)
        .await?;
    Ok(Json(row).into_response())
}

async fn patch_one(
    State(coordinator): State<MutationCoordinator>,
    Path((entity, pk)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&body)?;
    let row = coordinator
        .patch_one(&entity, &pk, &params(query.as_deref()), &body)
        .await?;
    Ok(Json(row).into_response())
}

async fn delete_one(
    State(coordinator): State<MutationCoordinator>,
    Path((entity, pk)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let row = coordinator
        .delete_one(&entity, &pk, &params(query.as_deref()))
        .await?;
    Ok(Json(row).into_response())
}
