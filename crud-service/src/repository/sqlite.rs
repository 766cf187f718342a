//! SQLite-backed entity store
//!
//! Statements are assembled with [`sqlx::QueryBuilder`]. Identifiers come
//! from the static [`EntitySchema`]; every value is a bound parameter.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::error::{RepositoryError, RepositoryOperation};
use super::query::{
    FilterCondition, FilterOperator, FilterValue, OrderBy, OrderDirection, Pagination, QueryFilter,
};
use super::store::{EntityStore, RepositoryResult};
use crate::record::{
    as_integer, format_timestamp, parse_timestamp, Record, RelationValue,
};
use crate::schema::{
    Column, ColumnKind, EntitySchema, Relation, RelationKind, CREATED_AT, ID_COLUMN, UPDATED_AT,
};

/// Entity store over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
    schema: &'static EntitySchema,
}

impl SqlStore {
    /// Store for `schema`'s table
    pub fn new(pool: SqlitePool, schema: &'static EntitySchema) -> Self {
        Self { pool, schema }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn related(&self, schema: &'static EntitySchema) -> Self {
        Self::new(self.pool.clone(), schema)
    }

    fn db_error(&self, operation: RepositoryOperation, error: sqlx::Error) -> RepositoryError {
        RepositoryError::from_sqlx(operation, error).with_entity_type(self.schema.name)
    }

    /// `SELECT id, <visible columns>, created_at, updated_at FROM <table>`
    fn select(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb: QueryBuilder<'static, Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(ID_COLUMN);
        for column in self.schema.visible_columns() {
            qb.push(", ").push(column.name);
        }
        qb.push(", ")
            .push(CREATED_AT)
            .push(", ")
            .push(UPDATED_AT)
            .push(" FROM ")
            .push(self.schema.table);
        qb
    }

    /// Declared columns present in `data`, in schema order
    fn writable<'a>(&self, data: &'a Map<String, Value>) -> Vec<(&'static Column, &'a Value)> {
        self.schema
            .columns
            .iter()
            .filter_map(|column| data.get(column.name).map(|value| (column, value)))
            .collect()
    }

    fn decode(&self, row: &SqliteRow, operation: RepositoryOperation) -> RepositoryResult<Record> {
        let id: i64 = row
            .try_get(ID_COLUMN)
            .map_err(|e| self.db_error(operation, e))?;

        let mut fields = Map::new();
        for column in self.schema.visible_columns() {
            let value = match column.kind {
                ColumnKind::Integer => row
                    .try_get::<Option<i64>, _>(column.name)
                    .map(|v| v.map(Value::from)),
                ColumnKind::Text => row
                    .try_get::<Option<String>, _>(column.name)
                    .map(|v| v.map(Value::from)),
            }
            .map_err(|e| self.db_error(operation, e))?;
            fields.insert(column.name.to_string(), value.unwrap_or(Value::Null));
        }

        Ok(Record {
            id,
            fields,
            created_at: self.decode_timestamp(row, CREATED_AT, operation, id)?,
            updated_at: self.decode_timestamp(row, UPDATED_AT, operation, id)?,
            relations: Default::default(),
        })
    }

    fn decode_timestamp(
        &self,
        row: &SqliteRow,
        column: &str,
        operation: RepositoryOperation,
        id: i64,
    ) -> RepositoryResult<chrono::DateTime<Utc>> {
        let raw: String = row
            .try_get(column)
            .map_err(|e| self.db_error(operation, e))?;
        parse_timestamp(&raw).ok_or_else(|| {
            RepositoryError::serialization_error(
                operation,
                format!("invalid timestamp `{}` in column {}", raw, column),
            )
            .with_entity(self.schema.name, id.to_string())
        })
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &QueryFilter) {
    let mut keyword = " WHERE ";
    for condition in &filter.all {
        qb.push(keyword);
        push_condition(qb, condition);
        keyword = " AND ";
    }
    if !filter.any.is_empty() {
        qb.push(keyword).push("(");
        for (i, condition) in filter.any.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_condition(qb, condition);
        }
        qb.push(")");
    }
}

fn push_condition(qb: &mut QueryBuilder<'_, Sqlite>, condition: &FilterCondition) {
    match (condition.operator, &condition.value) {
        (FilterOperator::In, FilterValue::IntegerList(values)) => {
            if values.is_empty() {
                qb.push("1 = 0");
                return;
            }
            qb.push(condition.field).push(" IN (");
            let mut separated = qb.separated(", ");
            for value in values {
                separated.push_bind(*value);
            }
            separated.push_unseparated(")");
        }
        (FilterOperator::Like, value) => {
            qb.push(condition.field).push(" LIKE ");
            push_filter_value(qb, value);
            qb.push(" ESCAPE '\\'");
        }
        (operator, value) => {
            qb.push(condition.field)
                .push(" ")
                .push(operator)
                .push(" ");
            push_filter_value(qb, value);
        }
    }
}

fn push_filter_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::String(s) => {
            qb.push_bind(s.clone());
        }
        FilterValue::Integer(n) => {
            qb.push_bind(*n);
        }
        FilterValue::IntegerList(_) => {
            qb.push("NULL");
        }
    }
}

/// Bind `value` converted to the storage type of `column`
fn push_column_value(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &Column,
    value: &Value,
    operation: RepositoryOperation,
) -> RepositoryResult<()> {
    let mismatch = || {
        RepositoryError::serialization_error(
            operation,
            format!("value {} does not fit column {}", value, column.name),
        )
    };

    match (column.kind, value) {
        (_, Value::Null) => {
            qb.push_bind(None::<String>);
        }
        (ColumnKind::Text, Value::String(s)) => {
            qb.push_bind(s.clone());
        }
        (ColumnKind::Text, other) => {
            qb.push_bind(other.to_string());
        }
        (ColumnKind::Integer, value) => {
            qb.push_bind(as_integer(value).ok_or_else(mismatch)?);
        }
    }
    Ok(())
}

/// Bind a JSON scalar as-is
fn push_json_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                qb.push_bind(i);
            }
            None => {
                qb.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        other => {
            qb.push_bind(other.to_string());
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl EntityStore for SqlStore {
    fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Record>> {
        let operation = RepositoryOperation::FindById;
        let mut qb = self.select();
        qb.push(" WHERE ").push(ID_COLUMN).push(" = ").push_bind(id);

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e))?;

        row.map(|row| self.decode(&row, operation)).transpose()
    }

    async fn find_all(
        &self,
        filter: &QueryFilter,
        order_by: Option<OrderBy>,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<Record>> {
        let operation = RepositoryOperation::FindAll;
        let order_by = order_by.unwrap_or(OrderBy::new(ID_COLUMN, OrderDirection::Ascending));

        let mut qb = self.select();
        push_where(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(order_by.column)
            .push(" ")
            .push(order_by.direction.as_sql());
        if order_by.column != ID_COLUMN {
            qb.push(", ").push(ID_COLUMN).push(" ASC");
        }
        if let Some(pagination) = pagination {
            qb.push(" LIMIT ")
                .push_bind(to_sql_int(pagination.limit))
                .push(" OFFSET ")
                .push_bind(to_sql_int(pagination.offset));
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e))?;

        rows.iter().map(|row| self.decode(row, operation)).collect()
    }

    async fn count(&self, filter: &QueryFilter) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::Count;
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.schema.table);
        push_where(&mut qb, filter);

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e))?;
        let total: i64 = row.try_get(0).map_err(|e| self.db_error(operation, e))?;

        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn create(&self, data: &Map<String, Value>) -> RepositoryResult<Record> {
        let operation = RepositoryOperation::Create;
        let now = format_timestamp(&Utc::now());
        let columns = self.writable(data);

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("INSERT INTO ");
        qb.push(self.schema.table).push(" (");
        for (column, _) in &columns {
            qb.push(column.name).push(", ");
        }
        qb.push(CREATED_AT)
            .push(", ")
            .push(UPDATED_AT)
            .push(") VALUES (");
        for (column, value) in &columns {
            push_column_value(&mut qb, column, value, operation)?;
            qb.push(", ");
        }
        qb.push_bind(now.clone()).push(", ").push_bind(now).push(")");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e))?;
        let id = result.last_insert_rowid();

        tracing::debug!(entity = self.schema.name, id, "Record inserted");

        self.find_by_id(id)
            .await
            .map_err(|e| e.with_operation(operation))?
            .ok_or_else(|| {
                RepositoryError::database_error(operation, "inserted row could not be read back")
                    .with_entity(self.schema.name, id.to_string())
            })
    }

    async fn update(&self, id: i64, data: &Map<String, Value>) -> RepositoryResult<Option<Record>> {
        let operation = RepositoryOperation::Update;
        let columns = self.writable(data);

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE ");
        qb.push(self.schema.table).push(" SET ");
        for (column, value) in &columns {
            qb.push(column.name).push(" = ");
            push_column_value(&mut qb, column, value, operation)?;
            qb.push(", ");
        }
        qb.push(UPDATED_AT)
            .push(" = ")
            .push_bind(format_timestamp(&Utc::now()));
        qb.push(" WHERE ").push(ID_COLUMN).push(" = ").push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e).with_entity(self.schema.name, id.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id)
            .await
            .map_err(|e| e.with_operation(operation))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let operation = RepositoryOperation::Delete;
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("DELETE FROM ");
        qb.push(self.schema.table)
            .push(" WHERE ")
            .push(ID_COLUMN)
            .push(" = ")
            .push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e).with_entity(self.schema.name, id.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn value_exists(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        except_id: Option<i64>,
    ) -> RepositoryResult<bool> {
        let operation = RepositoryOperation::Exists;
        if !is_identifier(table) || !is_identifier(column) {
            return Err(RepositoryError::database_error(
                operation,
                format!("invalid identifier {}.{}", table, column),
            ));
        }
        if value.is_null() {
            return Ok(false);
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM ");
        qb.push(table).push(" WHERE ").push(column).push(" = ");
        push_json_value(&mut qb, value);
        if let Some(except_id) = except_id {
            qb.push(" AND ").push(ID_COLUMN).push(" != ").push_bind(except_id);
        }
        qb.push(")");

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.db_error(operation, e))?;

        let found: i64 = row.try_get(0).map_err(|e| self.db_error(operation, e))?;
        Ok(found != 0)
    }

    async fn load_relations(
        &self,
        records: &mut [Record],
        relations: &'static [Relation],
    ) -> RepositoryResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        for relation in relations {
            let related = self.related(relation.related);
            match relation.kind {
                RelationKind::BelongsTo => {
                    let mut keys: Vec<i64> = records
                        .iter()
                        .filter_map(|record| record.get_i64(relation.foreign_key))
                        .collect();
                    keys.sort_unstable();
                    keys.dedup();

                    let owners: HashMap<i64, Record> = if keys.is_empty() {
                        HashMap::new()
                    } else {
                        let filter =
                            QueryFilter::new().and(FilterCondition::in_integers(ID_COLUMN, keys));
                        related
                            .find_all(&filter, None, None)
                            .await
                            .map_err(|e| e.with_operation(RepositoryOperation::BatchLoad))?
                            .into_iter()
                            .map(|owner| (owner.id, owner))
                            .collect()
                    };

                    for record in records.iter_mut() {
                        let owner = record
                            .get_i64(relation.foreign_key)
                            .and_then(|key| owners.get(&key))
                            .cloned()
                            .map(Box::new);
                        record
                            .relations
                            .insert(relation.name.to_string(), RelationValue::One(owner));
                    }
                }
                RelationKind::HasMany => {
                    let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
                    let filter = QueryFilter::new()
                        .and(FilterCondition::in_integers(relation.foreign_key, ids));
                    let children = related
                        .find_all(&filter, None, None)
                        .await
                        .map_err(|e| e.with_operation(RepositoryOperation::BatchLoad))?;

                    let mut grouped: HashMap<i64, Vec<Record>> = HashMap::new();
                    for child in children {
                        if let Some(owner) = child.get_i64(relation.foreign_key) {
                            grouped.entry(owner).or_default().push(child);
                        }
                    }

                    for record in records.iter_mut() {
                        let children = grouped.remove(&record.id).unwrap_or_default();
                        record
                            .relations
                            .insert(relation.name.to_string(), RelationValue::Many(children));
                    }
                }
            }
        }

        tracing::debug!(
            entity = self.schema.name,
            records = records.len(),
            relations = relations.len(),
            "Relations loaded"
        );

        Ok(())
    }
}
