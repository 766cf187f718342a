//! CRUD handlers
//!
//! One implementation of create, read, update, delete and index serves every
//! resource. A resource only declares its schema, validation rules and
//! output shaper through the [`Resource`] trait.
//!
//! # Features
//!
//! - **CRUD Operations**: [`CrudService`] validates input, calls the
//!   generic repository and shapes the result
//! - **Envelopes**: [`Envelope`] and [`ErrorEnvelope`] give every response
//!   the same `{data, message, status}` / `{errors|message, status}` shape
//! - **Index Queries**: [`IndexQuery`] reads bracketed filters, search,
//!   paging and sorting from the query string
//! - **Error Handling**: [`ApiError`] with automatic HTTP status code mapping
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_service::handlers::{CrudService, Resource, RuleSpec};
//!
//! struct Tags;
//!
//! impl Resource for Tags {
//!     const PATH: &'static str = "tag";
//!
//!     fn schema() -> &'static EntitySchema {
//!         &TAGS
//!     }
//!
//!     fn create_rules() -> RuleSpec {
//!         &[("label", "required|string|max:64|unique:tags,label")]
//!     }
//!
//!     fn update_rules() -> RuleSpec {
//!         &[("label", "sometimes|required|string|max:64|unique:tags,label")]
//!     }
//! }
//!
//! let service = CrudService::<Tags, _>::new(GenericRepository::new(store))?;
//! let envelope = service.create(json!({"label": "rust"})).await?;
//! ```

mod crud;
mod envelope;
mod error;
mod query;
mod shaper;

pub use crud::{CrudService, Resource, RuleSpec};
pub use envelope::{
    Envelope, ErrorEnvelope, DEFAULT_MESSAGE, RECORD_CREATED, RECORD_DELETED, RECORD_NOT_FOUND,
    RECORD_UPDATED,
};
pub use error::{ApiError, ApiErrorKind, ApiOperation};
pub use query::IndexQuery;
pub use shaper::{Shaper, Transform};
