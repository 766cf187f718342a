//! Generic repository
//!
//! [`GenericRepository`] wraps an [`EntityStore`] with the behavior shared
//! by every entity: lifecycle notifications around writes, hashing of secret
//! columns, eager loading of declared relations, and filtered, searched,
//! sorted, paginated listing.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::notify::{LifecycleEvent, Notifier};
use super::page::PageResult;
use super::query::{FilterCondition, FilterValue, OrderBy, OrderDirection, Pagination, QueryFilter};
use super::store::{EntityStore, RepositoryResult};
use crate::password::PasswordHasher;
use crate::record::{format_timestamp, Record};
use crate::schema::{ColumnKind, EntitySchema, CREATED_AT, ID_COLUMN};

/// Page size used when a listing does not ask for one
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Filter key selecting records created at or after a date
pub const START_DATE: &str = "start_date";

/// Filter key selecting records created at or before a date
pub const END_DATE: &str = "end_date";

/// Parameters of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    /// Equality filters by field, plus `start_date` / `end_date`; empty values are ignored
    pub filters: BTreeMap<String, String>,
    /// Free-text search over the searchable fields
    pub search: Option<String>,
    /// 1-indexed page number
    pub page: u64,
    /// Page size
    pub per_page: u64,
    /// Column to sort by
    pub sort_column: String,
    /// Sort direction
    pub sort_direction: OrderDirection,
    /// Request path used to build page links
    pub path: String,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            search: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_column: ID_COLUMN.to_string(),
            sort_direction: OrderDirection::Ascending,
            path: "/".to_string(),
        }
    }
}

/// Repository behavior shared by every entity
#[derive(Debug, Clone)]
pub struct GenericRepository<S> {
    store: S,
    notifier: Notifier,
    hasher: PasswordHasher,
}

impl<S: EntityStore> GenericRepository<S> {
    /// Repository over `store` with no listeners and default hashing parameters
    pub fn new(store: S) -> Self {
        Self {
            store,
            notifier: Notifier::new(),
            hasher: PasswordHasher::default(),
        }
    }

    /// Publish lifecycle events to `notifier`
    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Hash secret columns with `hasher`
    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Schema of the managed entity
    pub fn schema(&self) -> &'static EntitySchema {
        self.store.schema()
    }

    /// Insert a record
    ///
    /// Publishes `BeforeCreate` with the input, then `AfterCreate` with the
    /// stored record and its relations.
    pub async fn create(&self, data: Map<String, Value>) -> RepositoryResult<Record> {
        let schema = self.schema();
        self.notifier.publish(LifecycleEvent::BeforeCreate {
            entity: schema.name,
            data: data.clone(),
        });

        let data = self.hash_secrets(data, RepositoryOperation::Create).await?;
        let mut record = self.store.create(&data).await?;
        self.store
            .load_relations(std::slice::from_mut(&mut record), schema.relations)
            .await?;

        tracing::info!(entity = schema.name, id = record.id, "Record created");
        self.notifier.publish(LifecycleEvent::AfterCreate {
            entity: schema.name,
            record: record.clone(),
        });

        Ok(record)
    }

    /// Find a record by id, with its relations
    pub async fn find(&self, id: i64) -> RepositoryResult<Option<Record>> {
        let Some(mut record) = self.store.find_by_id(id).await? else {
            return Ok(None);
        };
        self.store
            .load_relations(std::slice::from_mut(&mut record), self.schema().relations)
            .await?;
        Ok(Some(record))
    }

    /// Whether a record has this id
    pub async fn exists(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.store.find_by_id(id).await?.is_some())
    }

    /// Update a record
    ///
    /// Returns `Ok(None)` if no record has this id; no event is published
    /// in that case.
    pub async fn update(
        &self,
        id: i64,
        data: Map<String, Value>,
    ) -> RepositoryResult<Option<Record>> {
        let schema = self.schema();
        let Some(existing) = self.store.find_by_id(id).await? else {
            return Ok(None);
        };

        self.notifier.publish(LifecycleEvent::BeforeUpdate {
            entity: schema.name,
            data: data.clone(),
            record: existing,
        });

        let data = self.hash_secrets(data, RepositoryOperation::Update).await?;
        let Some(mut record) = self.store.update(id, &data).await? else {
            return Ok(None);
        };
        self.store
            .load_relations(std::slice::from_mut(&mut record), schema.relations)
            .await?;

        tracing::info!(entity = schema.name, id = record.id, "Record updated");
        self.notifier.publish(LifecycleEvent::AfterUpdate {
            entity: schema.name,
            record: record.clone(),
        });

        Ok(Some(record))
    }

    /// Delete a record; `false` if no record has this id
    pub async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            tracing::info!(entity = self.schema().name, id, "Record deleted");
        }
        Ok(deleted)
    }

    /// List one page of records
    ///
    /// Filters are ANDed, the search term matches any searchable field, and
    /// every returned record carries its relations.
    pub async fn list(&self, params: &ListParams) -> RepositoryResult<PageResult<Record>> {
        let schema = self.schema();
        let filter = self.build_filter(params)?;
        let column = schema.sortable_column(&params.sort_column).ok_or_else(|| {
            RepositoryError::invalid_query("sort_column", "The selected sort column is invalid.")
                .with_entity_type(schema.name)
        })?;
        let per_page = params.per_page.max(1);
        let page = params.page.max(1);

        let total = self.store.count(&filter).await?;
        let mut records = self
            .store
            .find_all(
                &filter,
                Some(OrderBy::new(column, params.sort_direction)),
                Some(Pagination::page(page, per_page)),
            )
            .await?;
        self.store
            .load_relations(&mut records, schema.relations)
            .await?;

        Ok(PageResult::new(records, page, per_page, total, &params.path))
    }

    fn build_filter(&self, params: &ListParams) -> RepositoryResult<QueryFilter> {
        let schema = self.schema();
        let mut filter = QueryFilter::new();

        for (key, raw) in &params.filters {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            filter = match key.as_str() {
                START_DATE => filter.and(FilterCondition::gte(
                    CREATED_AT,
                    format_timestamp(&parse_date_bound(key, raw)?),
                )),
                END_DATE => filter.and(FilterCondition::lte(
                    CREATED_AT,
                    format_timestamp(&parse_date_bound(key, raw)?),
                )),
                _ => {
                    let field = schema.filterable_field(key).ok_or_else(|| {
                        RepositoryError::invalid_query(
                            format!("filters.{}", key),
                            format!("The {} filter is not supported.", key),
                        )
                        .with_entity_type(schema.name)
                    })?;
                    filter.and(FilterCondition::eq(field, filter_value(schema, field, raw)?))
                }
            };
        }

        if let Some(term) = params.search.as_deref().map(str::trim) {
            if !term.is_empty() {
                filter = filter.any_of(
                    schema
                        .searchable
                        .iter()
                        .copied()
                        .map(|field| FilterCondition::contains(field, term))
                        .collect(),
                );
            }
        }

        Ok(filter)
    }

    async fn hash_secrets(
        &self,
        mut data: Map<String, Value>,
        operation: RepositoryOperation,
    ) -> RepositoryResult<Map<String, Value>> {
        for column in self.schema().columns.iter().filter(|column| column.hashed) {
            let Some(Value::String(plain)) = data.get(column.name) else {
                continue;
            };
            let plain = plain.clone();
            let hasher = self.hasher.clone();
            let hashed = tokio::task::spawn_blocking(move || hasher.hash(&plain))
                .await
                .map_err(|e| e.to_string())
                .and_then(|result| result.map_err(|e| e.to_string()))
                .map_err(|message| {
                    RepositoryError::new(operation, RepositoryErrorKind::Other, message)
                        .with_entity_type(self.schema().name)
                })?;
            data.insert(column.name.to_string(), Value::String(hashed));
        }
        Ok(data)
    }
}

/// Convert a raw filter value to the storage type of `field`
fn filter_value(
    schema: &EntitySchema,
    field: &'static str,
    raw: &str,
) -> RepositoryResult<FilterValue> {
    let invalid = |expected: &str| {
        RepositoryError::invalid_query(
            format!("filters.{}", field),
            format!("The {} filter must be {}.", field, expected),
        )
        .with_entity_type(schema.name)
    };

    match schema.column(field).map(|column| column.kind) {
        Some(ColumnKind::Integer) => raw
            .parse::<i64>()
            .map(FilterValue::Integer)
            .map_err(|_| invalid("an integer")),
        Some(ColumnKind::Text) | None => Ok(FilterValue::String(raw.to_string())),
    }
}

/// Parse a date filter bound
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` (UTC) and `YYYY-MM-DD`
/// (midnight UTC).
fn parse_date_bound(key: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            RepositoryError::invalid_query(
                format!("filters.{}", key),
                format!("The {} filter is not a valid date.", key),
            )
        })
}
