//! CRUD operations shared by every resource
//!
//! A [`Resource`] declares what differs between resources: its URL segment,
//! schema, rule sets and output shaper. [`CrudService`] implements create,
//! read, update, delete and index once, for any resource over any
//! [`EntityStore`].

use std::marker::PhantomData;

use serde_json::{Map, Value};

use super::envelope::{Envelope, RECORD_UPDATED};
use super::error::{ApiError, ApiOperation};
use super::query::IndexQuery;
use super::shaper::Shaper;
use crate::config::PaginationConfig;
use crate::repository::{EntityStore, GenericRepository, PageResult};
use crate::schema::EntitySchema;
use crate::validation::{RuleParseError, RuleSet};

/// Validation rules as `(field, "rule|rule")` pairs
pub type RuleSpec = &'static [(&'static str, &'static str)];

/// Declaration of one REST resource
pub trait Resource: Send + Sync + 'static {
    /// URL segment, e.g. `user` for `/user` and `/user/{id}`
    const PATH: &'static str;

    /// Schema of the backing entity
    fn schema() -> &'static EntitySchema;

    /// Rules applied to create requests
    fn create_rules() -> RuleSpec;

    /// Rules applied to update requests
    fn update_rules() -> RuleSpec;

    /// Output transform
    fn shaper() -> Shaper {
        Shaper::passthrough()
    }
}

/// The five CRUD operations for resource `R` over store `S`
pub struct CrudService<R, S> {
    repository: GenericRepository<S>,
    create_rules: RuleSet,
    update_rules: RuleSet,
    pagination: PaginationConfig,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource, S: EntityStore> CrudService<R, S> {
    /// Service over `repository`
    ///
    /// Fails if the resource declares a malformed rule.
    pub fn new(repository: GenericRepository<S>) -> Result<Self, RuleParseError> {
        Ok(Self {
            repository,
            create_rules: RuleSet::parse(R::create_rules())?,
            update_rules: RuleSet::parse(R::update_rules())?,
            pagination: PaginationConfig::default(),
            _resource: PhantomData,
        })
    }

    /// Use `pagination` for index defaults and limits
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Underlying repository
    pub fn repository(&self) -> &GenericRepository<S> {
        &self.repository
    }

    /// Validate and insert a record
    pub async fn create(&self, body: Value) -> Result<Envelope<Value>, ApiError> {
        let operation = ApiOperation::Create;
        let input = into_object(body, operation)?;
        self.validate(&self.create_rules, &input, None, operation)
            .await?;

        let record = self
            .repository
            .create(self.create_rules.allowed(&input))
            .await
            .map_err(ApiError::from)?;

        Ok(Envelope::created(R::shaper().one(&record)))
    }

    /// Fetch one record
    pub async fn read(&self, id: i64) -> Result<Envelope<Value>, ApiError> {
        let record = self
            .repository
            .find(id)
            .await?
            .ok_or_else(|| self.not_found(id, ApiOperation::Read))?;

        Ok(Envelope::success(R::shaper().one(&record)))
    }

    /// Validate and apply changes to a record
    ///
    /// A missing record is reported before the input is validated.
    pub async fn update(&self, id: i64, body: Value) -> Result<Envelope<Value>, ApiError> {
        let operation = ApiOperation::Update;
        let input = into_object(body, operation)?;
        if !self.repository.exists(id).await? {
            return Err(self.not_found(id, operation));
        }
        self.validate(&self.update_rules, &input, Some(id), operation)
            .await?;

        let record = self
            .repository
            .update(id, self.update_rules.allowed(&input))
            .await?
            .ok_or_else(|| self.not_found(id, operation))?;

        Ok(Envelope::success(R::shaper().one(&record)).with_message(RECORD_UPDATED))
    }

    /// Delete a record
    pub async fn delete(&self, id: i64) -> Result<Envelope<Value>, ApiError> {
        if self.repository.delete(id).await? {
            Ok(Envelope::deleted())
        } else {
            Err(self.not_found(id, ApiOperation::Delete))
        }
    }

    /// List one page of records
    ///
    /// `path` is the request path, used for the page links.
    pub async fn index(
        &self,
        query: IndexQuery,
        path: impl Into<String>,
    ) -> Result<Envelope<PageResult<Value>>, ApiError> {
        let params = query.into_params(path, &self.pagination)?;
        let page = self.repository.list(&params).await?;

        Ok(Envelope::success(R::shaper().page(page)))
    }

    async fn validate(
        &self,
        rules: &RuleSet,
        input: &Map<String, Value>,
        ignore_id: Option<i64>,
        operation: ApiOperation,
    ) -> Result<(), ApiError> {
        let errors = rules
            .validate(input, self.repository.store(), ignore_id)
            .await
            .map_err(|e| ApiError::from(e).with_operation(operation))?;
        if errors.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            entity = R::schema().name,
            operation = %operation,
            fields = ?errors.fields().collect::<Vec<_>>(),
            "Validation failed"
        );
        Err(ApiError::validation(errors).with_operation(operation))
    }

    fn not_found(&self, id: i64, operation: ApiOperation) -> ApiError {
        ApiError::not_found(R::schema().name, id.to_string()).with_operation(operation)
    }
}

fn into_object(body: Value, operation: ApiOperation) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(
            ApiError::invalid_field("body", "The request body must be a JSON object.")
                .with_operation(operation),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ApiErrorKind;
    use crate::repository::{GenericRepository, LifecycleEvent, ListenerError, Notifier, SqlStore};
    use crate::resources::{Posts, Users};
    use crate::testing;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    async fn users() -> CrudService<Users, SqlStore> {
        let pool = testing::memory_pool().await;
        let repository = GenericRepository::new(SqlStore::new(pool, Users::schema()))
            .with_hasher(testing::cheap_hasher());
        CrudService::new(repository).unwrap()
    }

    async fn count(service: &CrudService<Users, SqlStore>) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(service.repository().store().pool())
            .await
            .unwrap()
    }

    fn ann() -> Value {
        json!({"name": "A", "email": "a@x.com", "password": "secret123"})
    }

    #[tokio::test]
    async fn test_create_returns_201_without_password() {
        let service = users().await;

        let envelope = service.create(ann()).await.unwrap();
        assert_eq!(envelope.status_code(), StatusCode::CREATED);
        assert_eq!(envelope.message, "Record created successfully");
        assert_eq!(envelope.data["name"], "A");
        assert_eq!(envelope.data["email"], "a@x.com");
        assert!(envelope.data.get("password").is_none());

        let id = envelope.data["id"].as_i64().unwrap();
        let read = service.read(id).await.unwrap();
        assert_eq!(read.message, "Operation successful");
        assert_eq!(read.data["email"], "a@x.com");
        assert!(read.data.get("password").is_none());
    }

    #[tokio::test]
    async fn test_create_ignores_unlisted_keys() {
        let service = users().await;
        let mut body = ann();
        body["id"] = json!(999);
        body["is_admin"] = json!(true);

        let envelope = service.create(body).await.unwrap();
        assert_ne!(envelope.data["id"], 999);
        assert!(envelope.data.get("is_admin").is_none());
    }

    #[tokio::test]
    async fn test_failed_validation_persists_nothing() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = events.clone();
        let notifier = Notifier::new().with_listener(move |event: &LifecycleEvent| -> Result<(), ListenerError> {
            seen.lock().unwrap().push(event.kind());
            Ok(())
        });
        let pool = testing::memory_pool().await;
        let existing = testing::insert_user(
            &SqlStore::new(pool.clone(), Users::schema()),
            "B",
            "b@x.com",
        )
        .await;
        let repository = GenericRepository::new(SqlStore::new(pool, Users::schema()))
            .with_notifier(notifier)
            .with_hasher(testing::cheap_hasher());
        let service: CrudService<Users, SqlStore> = CrudService::new(repository).unwrap();

        let error = service
            .create(json!({"name": "A", "email": "nope"}))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::ValidationFailed);
        let errors = error.errors.unwrap();
        assert!(errors.has("email"));
        assert!(errors.has("password"));
        assert_eq!(count(&service).await, 1);

        let error = service
            .update(existing.id, json!({"email": "nope"}))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::ValidationFailed);
        let read = service.read(existing.id).await.unwrap();
        assert_eq!(read.data["email"], "b@x.com");

        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_validation_error() {
        let service = users().await;
        service.create(ann()).await.unwrap();

        let error = service.create(ann()).await.unwrap_err();
        assert_eq!(
            error.errors.unwrap().get("email").unwrap(),
            ["The email has already been taken."]
        );
    }

    #[tokio::test]
    async fn test_non_object_body() {
        let service = users().await;
        let error = service.create(json!(["A"])).await.unwrap_err();
        assert!(error.errors.unwrap().has("body"));
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let service = users().await;
        let created = service.create(ann()).await.unwrap();
        let id = created.data["id"].as_i64().unwrap();

        let updated = service
            .update(id, json!({"name": "B", "email": "a@x.com"}))
            .await
            .unwrap();
        assert_eq!(updated.message, "Record updated successfully");
        assert_eq!(updated.data["name"], "B");
        assert_eq!(updated.data["email"], "a@x.com");
        assert_eq!(updated.data["status"], created.data["status"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found_for_any_payload() {
        let service = users().await;

        for body in [json!({"name": "B"}), json!({"email": "bad"}), json!({})] {
            let error = service.update(42, body).await.unwrap_err();
            assert_eq!(error.kind, ApiErrorKind::NotFound);
            assert_eq!(error.message, "Record not found");
        }
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let service = users().await;
        let id = service.create(ann()).await.unwrap().data["id"]
            .as_i64()
            .unwrap();

        let deleted = service.delete(id).await.unwrap();
        assert_eq!(deleted.data, Value::Null);
        assert_eq!(deleted.message, "Record deleted successfully");

        let error = service.delete(id).await.unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::NotFound);
        assert_eq!(error.operation, ApiOperation::Delete);
        assert_eq!(
            service.read(id).await.unwrap_err().kind,
            ApiErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_index_shapes_each_element() {
        let service = users().await;
        service.create(ann()).await.unwrap();
        service
            .create(json!({"name": "B", "email": "b@x.com", "password": "secret123", "status": "inactive"}))
            .await
            .unwrap();

        let query = IndexQuery::from_pairs([("filters[status]".to_string(), "active".to_string())]);
        let envelope = service.index(query, "/user").await.unwrap();
        assert_eq!(envelope.data.total, 1);
        assert_eq!(envelope.data.data[0]["name"], "A");
        assert!(envelope.data.data[0].get("password").is_none());
        assert!(envelope.data.data[0].get("posts").is_some());
    }

    #[tokio::test]
    async fn test_index_rejects_unknown_filter() {
        let service = users().await;
        let query = IndexQuery::from_pairs([("filters[password]".to_string(), "x".to_string())]);

        let error = service.index(query, "/user").await.unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::ValidationFailed);
        assert!(error.errors.unwrap().has("filters.password"));
    }

    #[tokio::test]
    async fn test_post_requires_existing_author() {
        let pool = testing::memory_pool().await;
        let service: CrudService<Posts, SqlStore> =
            CrudService::new(GenericRepository::new(SqlStore::new(pool, Posts::schema()))).unwrap();

        let error = service
            .create(json!({"user_id": 5, "title": "T", "body": "B"}))
            .await
            .unwrap_err();
        assert_eq!(
            error.errors.unwrap().get("user_id").unwrap(),
            ["The selected user id is invalid."]
        );
    }
}
