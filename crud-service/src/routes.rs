//! HTTP routes
//!
//! Every resource gets the same five routes from [`resource_router`]:
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | POST | `/<r>` | create |
//! | GET | `/<r>` | index |
//! | GET | `/<r>/{id}` | read |
//! | PUT | `/<r>/{id}` | update |
//! | DELETE | `/<r>/{id}` | delete |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{StatusCode, Uri},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::handlers::{
    ApiError, ApiOperation, CrudService, Envelope, ErrorEnvelope, IndexQuery, Resource,
};
use crate::health;
use crate::repository::{PageResult, SqlStore};
use crate::resources::{Comments, Posts, Users};
use crate::state::AppState;
use crate::validation::RuleParseError;

type Service<R> = Arc<CrudService<R, SqlStore>>;

/// Complete application router: the three resources plus health endpoints
///
/// Fails if a resource declares a malformed validation rule.
pub fn router(state: AppState) -> Result<Router, RuleParseError> {
    let operational = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .with_state(state.clone());

    Ok(operational
        .merge(resource_router(Arc::new(state.crud_service::<Users>()?)))
        .merge(resource_router(Arc::new(state.crud_service::<Posts>()?)))
        .merge(resource_router(Arc::new(state.crud_service::<Comments>()?)))
        .fallback(fallback))
}

/// The five CRUD routes of resource `R`
pub fn resource_router<R: Resource>(service: Service<R>) -> Router {
    let collection = format!("/{}", R::PATH);
    let member = format!("/{}/{{id}}", R::PATH);

    Router::new()
        .route(&collection, get(index::<R>).post(create::<R>))
        .route(
            &member,
            get(read::<R>).put(update::<R>).delete(destroy::<R>),
        )
        .with_state(service)
}

async fn index<R: Resource>(
    State(service): State<Service<R>>,
    uri: Uri,
    query: IndexQuery,
) -> Result<Envelope<PageResult<Value>>, ApiError> {
    service.index(query, uri.path()).await
}

async fn create<R: Resource>(
    State(service): State<Service<R>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Value>, ApiError> {
    let Json(body) = json_body(body, ApiOperation::Create)?;
    service.create(body).await
}

async fn read<R: Resource>(
    State(service): State<Service<R>>,
    Path(id): Path<String>,
) -> Result<Envelope<Value>, ApiError> {
    let id = record_id::<R>(&id, ApiOperation::Read)?;
    service.read(id).await
}

async fn update<R: Resource>(
    State(service): State<Service<R>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Value>, ApiError> {
    let id = record_id::<R>(&id, ApiOperation::Update)?;
    let Json(body) = json_body(body, ApiOperation::Update)?;
    service.update(id, body).await
}

async fn destroy<R: Resource>(
    State(service): State<Service<R>>,
    Path(id): Path<String>,
) -> Result<Envelope<Value>, ApiError> {
    let id = record_id::<R>(&id, ApiOperation::Delete)?;
    service.delete(id).await
}

async fn fallback() -> ErrorEnvelope {
    ErrorEnvelope::message("Not Found", StatusCode::NOT_FOUND)
}

/// An id that is not an integer names no record
fn record_id<R: Resource>(raw: &str, operation: ApiOperation) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(R::schema().name, raw).with_operation(operation))
}

fn json_body(
    body: Result<Json<Value>, JsonRejection>,
    operation: ApiOperation,
) -> Result<Json<Value>, ApiError> {
    body.map_err(|rejection| {
        tracing::debug!(operation = %operation, error = %rejection, "Rejected request body");
        ApiError::invalid_field("body", "The request body must be valid JSON.")
            .with_operation(operation)
    })
}
