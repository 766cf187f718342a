//! Persistence layer
//!
//! - [`EntityStore`]: per-table persistence trait, implemented by [`SqlStore`] over SQLite
//! - [`GenericRepository`]: shared CRUD behavior on top of any store, including
//!   lifecycle events, secret hashing, relation loading and listing
//! - [`FilterCondition`], [`QueryFilter`], [`OrderBy`], [`Pagination`]: query building blocks
//! - [`PageResult`]: one page of a listing with navigation metadata
//! - [`Notifier`]: fan-out of [`LifecycleEvent`]s to [`LifecycleListener`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_service::repository::{GenericRepository, ListParams, SqlStore};
//! use crud_service::resources::users::USERS;
//!
//! let users = GenericRepository::new(SqlStore::new(pool, &USERS));
//! let page = users.list(&ListParams { search: Some("ann".into()), ..Default::default() }).await?;
//! ```

mod error;
mod generic;
mod notify;
mod page;
mod query;
mod sqlite;
mod store;

// Re-export all public types
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use generic::{GenericRepository, ListParams, DEFAULT_PER_PAGE, END_DATE, START_DATE};
pub use notify::{LifecycleEvent, LifecycleListener, ListenerError, Notifier, TracingListener};
pub use page::PageResult;
pub use query::{
    FilterCondition, FilterOperator, FilterValue, OrderBy, OrderDirection, Pagination,
    ParseOrderDirectionError, QueryFilter,
};
pub use sqlite::SqlStore;
pub use store::{EntityStore, RepositoryResult};
