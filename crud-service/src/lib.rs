//! # crud-service
//!
//! Generic CRUD REST service over SQL-backed entities.
//!
//! Every resource (users, posts, comments) is served by one implementation of
//! create, read, update, delete and index. A resource only declares a static
//! [`EntitySchema`](schema::EntitySchema) and its validation rules.
//!
//! ## Features
//!
//! - **Generic CRUD**: [`CrudService`](handlers::CrudService) over any
//!   [`EntityStore`](repository::EntityStore), one router per resource
//! - **Listing**: bracketed filters, free-text search, date ranges, sorting and
//!   Laravel-style pagination links
//! - **Validation**: `required|string|max:255`-style rule strings, including
//!   `unique` and `exists` checks against the store
//! - **Lifecycle events**: listeners notified before and after every write
//! - **Secrets**: Argon2id hashing of columns declared secret, never returned
//! - **Envelopes**: `{data, message, status}` on success, `{errors|message, status}` on failure
//! - **Health checks**: liveness and readiness probes
//! - **Graceful shutdown**: proper signal handling (SIGTERM, SIGINT)
//!
//! ## Database schema
//!
//! The service never creates tables. Apply `sql/schema.sql` once before the
//! first start:
//!
//! ```text
//! sqlite3 crud.db < crud-service/sql/schema.sql
//! ```
//!
//! [`ensure_schema`](database::ensure_schema) fails startup with the list of
//! missing tables otherwise.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crud_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let pool = create_pool(&config.database).await?;
//!     ensure_schema(&pool, &crud_service::resources::SCHEMAS).await?;
//!     let state = AppState::new(config.clone(), pool)
//!         .with_notifier(Notifier::new().with_listener(TracingListener));
//!
//!     Server::new(config).serve(router(state)?).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod password;
pub mod record;
pub mod repository;
pub mod resources;
pub mod routes;
pub mod schema;
pub mod server;
pub mod state;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::database::{create_pool, ensure_schema};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, CrudService, Envelope, ErrorEnvelope, Resource, Shaper};
    pub use crate::health::{health, readiness};
    pub use crate::middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
        SENSITIVE_HEADERS,
    };
    pub use crate::observability::init_tracing;
    pub use crate::password::PasswordHasher;
    pub use crate::record::Record;
    pub use crate::repository::{
        EntityStore, GenericRepository, LifecycleEvent, LifecycleListener, Notifier, PageResult,
        SqlStore, TracingListener,
    };
    pub use crate::routes::{resource_router, router};
    pub use crate::schema::{Column, EntitySchema, Relation};
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::validation::{RuleSet, ValidationErrors};

    pub use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{delete, get, post, put},
        Json, Router,
    };
}
