//! Entity store trait
//!
//! An [`EntityStore`] is the persistence abstraction for one entity table.
//! Methods use RPITIT (Return Position Impl Trait In Traits) so that
//! implementations can be plain `async fn`s without `async_trait`.
//!
//! ```rust,ignore
//! use crud_service::repository::{EntityStore, QueryFilter, SqlStore};
//! use crud_service::resources::users::USERS;
//!
//! let store = SqlStore::new(pool, &USERS);
//! let user = store.find_by_id(1).await?;
//! let active = store.count(&QueryFilter::new()).await?;
//! ```

use std::future::Future;

use serde_json::{Map, Value};

use super::error::RepositoryError;
use super::query::{OrderBy, Pagination, QueryFilter};
use crate::record::Record;
use crate::schema::{EntitySchema, Relation};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Persistence operations for one entity table
///
/// Writes accept a JSON object keyed by column name; keys that are not
/// declared columns of the schema are ignored. Reads never include hidden
/// columns.
pub trait EntityStore: Send + Sync {
    /// Schema of the table this store manages
    fn schema(&self) -> &'static EntitySchema;

    /// Find a record by primary key
    ///
    /// Returns `Ok(None)` if no row has this id.
    fn find_by_id(&self, id: i64) -> impl Future<Output = RepositoryResult<Option<Record>>> + Send;

    /// List records matching `filter`, in `order_by` order, limited by `pagination`
    fn find_all(
        &self,
        filter: &QueryFilter,
        order_by: Option<OrderBy>,
        pagination: Option<Pagination>,
    ) -> impl Future<Output = RepositoryResult<Vec<Record>>> + Send;

    /// Count records matching `filter`
    fn count(&self, filter: &QueryFilter) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Insert a record and return it as stored
    fn create(
        &self,
        data: &Map<String, Value>,
    ) -> impl Future<Output = RepositoryResult<Record>> + Send;

    /// Update a record and return it as stored
    ///
    /// Returns `Ok(None)` if no row has this id.
    fn update(
        &self,
        id: i64,
        data: &Map<String, Value>,
    ) -> impl Future<Output = RepositoryResult<Option<Record>>> + Send;

    /// Delete a record
    ///
    /// Returns `true` if a row was removed.
    fn delete(&self, id: i64) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Whether any row of `table` has `column = value`, ignoring row `except_id`
    ///
    /// Backs the `unique` and `exists` validation rules, which may name any
    /// table.
    fn value_exists(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        except_id: Option<i64>,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Attach `relations` to every record, one batched query per relation
    fn load_relations(
        &self,
        records: &mut [Record],
        relations: &'static [Relation],
    ) -> impl Future<Output = RepositoryResult<()>> + Send;
}
