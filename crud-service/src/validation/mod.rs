//! Request validation
//!
//! A [`RuleSet`] maps field names to parsed [`Rule`]s. Validation collects
//! every failing message per field into [`ValidationErrors`]; database rules
//! (`unique`, `exists`) only run for fields that passed the other rules.
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_service::validation::RuleSet;
//!
//! let rules = RuleSet::parse(&[
//!     ("name", "required|string|max:255"),
//!     ("email", "required|email|unique:users,email"),
//! ])?;
//! let errors = rules.validate(&input, &store, None).await?;
//! if !errors.is_empty() {
//!     // 422 with `errors`
//! }
//! ```

mod rules;

pub use rules::{parse_rules, Rule, RuleParseError};

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{as_boolean, as_integer};
use crate::repository::{EntityStore, RepositoryResult};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Failing messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// No errors
    pub fn new() -> Self {
        Self::default()
    }

    /// Single error for `field`
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failing message for `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages for `field`
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` has any message
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Fields with at least one message
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether validation passed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Rules for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    /// Field name
    pub field: String,
    /// Rules in declaration order
    pub rules: Vec<Rule>,
}

impl FieldRules {
    fn has(&self, rule: &Rule) -> bool {
        self.rules.contains(rule)
    }
}

/// Validation rules for a request body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl RuleSet {
    /// Parse `(field, "rule|rule")` pairs
    pub fn parse(definitions: &[(&str, &str)]) -> Result<Self, RuleParseError> {
        let fields = definitions
            .iter()
            .map(|(field, rules)| {
                Ok(FieldRules {
                    field: (*field).to_string(),
                    rules: parse_rules(rules)?,
                })
            })
            .collect::<Result<_, RuleParseError>>()?;
        Ok(Self { fields })
    }

    /// Field names that carry rules
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.field.as_str())
    }

    /// Rules for `field`
    pub fn rules_for(&self, field: &str) -> Option<&[Rule]> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.rules.as_slice())
    }

    /// Keep only the keys of `data` that carry rules
    pub fn allowed(&self, data: &Map<String, Value>) -> Map<String, Value> {
        data.iter()
            .filter(|(key, _)| self.rules_for(key).is_some())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Validate `data`
    ///
    /// `unique` rules on `store`'s own table ignore the row `ignore_id`, so a
    /// record can keep its own value on update. Returns the collected errors;
    /// an empty set means `data` is valid. Fails only if a database rule
    /// cannot be evaluated.
    pub async fn validate<S: EntityStore>(
        &self,
        data: &Map<String, Value>,
        store: &S,
        ignore_id: Option<i64>,
    ) -> RepositoryResult<ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for field_rules in &self.fields {
            let field = field_rules.field.as_str();
            let value = data.get(field);
            if value.is_none() && field_rules.has(&Rule::Sometimes) {
                continue;
            }

            let attribute = field.replace('_', " ");
            if is_empty(value) {
                if field_rules.has(&Rule::Required) {
                    errors.add(field, format!("The {} field is required.", attribute));
                    continue;
                }
                if value.is_none() || field_rules.has(&Rule::Nullable) {
                    continue;
                }
            }
            let Some(value) = value else {
                continue;
            };

            let numeric = field_rules.has(&Rule::Integer);
            for rule in &field_rules.rules {
                if let Some(message) = check(rule, value, &attribute, numeric) {
                    errors.add(field, message);
                }
            }
            if errors.has(field) || value.is_null() {
                continue;
            }

            for rule in field_rules.rules.iter().filter(|r| r.is_database_rule()) {
                match rule {
                    Rule::Unique { table, column } => {
                        let except = if table == store.schema().table {
                            ignore_id
                        } else {
                            None
                        };
                        if store.value_exists(table, column, value, except).await? {
                            errors.add(field, format!("The {} has already been taken.", attribute));
                        }
                    }
                    Rule::Exists { table, column } => {
                        if !store.value_exists(table, column, value, None).await? {
                            errors.add(field, format!("The selected {} is invalid.", attribute));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(errors)
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

enum Size {
    Numeric(i64),
    Characters(usize),
    Items(usize),
}

fn size(value: &Value, numeric: bool) -> Option<Size> {
    if numeric {
        if let Some(n) = as_integer(value) {
            return Some(Size::Numeric(n));
        }
    }
    match value {
        Value::Null => None,
        Value::String(s) => Some(Size::Characters(s.chars().count())),
        Value::Array(items) => Some(Size::Items(items.len())),
        Value::Object(map) => Some(Size::Items(map.len())),
        other => Some(Size::Characters(other.to_string().chars().count())),
    }
}

/// Message for a failing non-database rule
fn check(rule: &Rule, value: &Value, attribute: &str, numeric: bool) -> Option<String> {
    let fails = match rule {
        Rule::String => !value.is_string(),
        Rule::Integer => value.is_boolean() || as_integer(value).is_none(),
        Rule::Boolean => as_boolean(value).is_none(),
        Rule::Email => !value.as_str().is_some_and(|s| EMAIL_REGEX.is_match(s)),
        Rule::Min(min) => {
            return match size(value, numeric)? {
                Size::Numeric(n) if n < to_i64(*min) => {
                    Some(format!("The {} field must be at least {}.", attribute, min))
                }
                Size::Characters(n) if (n as u64) < *min => Some(format!(
                    "The {} field must be at least {} characters.",
                    attribute, min
                )),
                Size::Items(n) if (n as u64) < *min => Some(format!(
                    "The {} field must have at least {} items.",
                    attribute, min
                )),
                _ => None,
            };
        }
        Rule::Max(max) => {
            return match size(value, numeric)? {
                Size::Numeric(n) if n > to_i64(*max) => Some(format!(
                    "The {} field must not be greater than {}.",
                    attribute, max
                )),
                Size::Characters(n) if (n as u64) > *max => Some(format!(
                    "The {} field must not be greater than {} characters.",
                    attribute, max
                )),
                Size::Items(n) if (n as u64) > *max => Some(format!(
                    "The {} field must not have more than {} items.",
                    attribute, max
                )),
                _ => None,
            };
        }
        Rule::In(allowed) => {
            let candidate = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Some(format!("The selected {} is invalid.", attribute)),
            };
            if allowed.contains(&candidate) {
                return None;
            }
            return Some(format!("The selected {} is invalid.", attribute));
        }
        Rule::Required | Rule::Sometimes | Rule::Nullable | Rule::Unique { .. } | Rule::Exists { .. } => {
            false
        }
    };

    if !fails {
        return None;
    }
    let message = match rule {
        Rule::String => format!("The {} field must be a string.", attribute),
        Rule::Integer => format!("The {} field must be an integer.", attribute),
        Rule::Boolean => format!("The {} field must be true or false.", attribute),
        _ => format!("The {} field must be a valid email address.", attribute),
    };
    Some(message)
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqlStore;
    use crate::resources::{posts::POSTS, users::USERS};
    use crate::testing;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn user_rules() -> RuleSet {
        RuleSet::parse(&[
            ("name", "required|string|max:10"),
            ("email", "required|email|unique:users,email"),
            ("password", "required|string|min:8"),
            ("role_id", "sometimes|nullable|integer|min:1"),
            ("status", "sometimes|required|in:active,inactive"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_input_has_no_errors() {
        let store = SqlStore::new(testing::memory_pool().await, &USERS);
        let errors = user_rules()
            .validate(
                &data(json!({
                    "name": "Ann",
                    "email": "ann@example.com",
                    "password": "long-enough",
                    "role_id": null
                })),
                &store,
                None,
            )
            .await
            .unwrap();
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[tokio::test]
    async fn test_messages_per_field() {
        let store = SqlStore::new(testing::memory_pool().await, &USERS);
        let errors = user_rules()
            .validate(
                &data(json!({
                    "name": "A name that is far too long",
                    "email": "not-an-email",
                    "password": "short",
                    "role_id": "zero",
                    "status": "banned"
                })),
                &store,
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            errors.get("name").unwrap(),
            ["The name field must not be greater than 10 characters."]
        );
        assert_eq!(
            errors.get("email").unwrap(),
            ["The email field must be a valid email address."]
        );
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field must be at least 8 characters."]
        );
        assert_eq!(
            errors.get("role_id").unwrap(),
            ["The role id field must be an integer."]
        );
        assert_eq!(errors.get("status").unwrap(), ["The selected status is invalid."]);
    }

    #[tokio::test]
    async fn test_required_and_sometimes() {
        let store = SqlStore::new(testing::memory_pool().await, &USERS);
        let rules = user_rules();

        let errors = rules.validate(&Map::new(), &store, None).await.unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("name").unwrap(), ["The name field is required."]);
        assert!(!errors.has("role_id"));
        assert!(!errors.has("status"));

        let errors = rules
            .validate(&data(json!({"status": ""})), &store, None)
            .await
            .unwrap();
        assert_eq!(errors.get("status").unwrap(), ["The status field is required."]);
    }

    #[tokio::test]
    async fn test_numeric_min_uses_value() {
        let store = SqlStore::new(testing::memory_pool().await, &USERS);
        let rules = RuleSet::parse(&[("role_id", "integer|min:1")]).unwrap();

        let errors = rules
            .validate(&data(json!({"role_id": 0})), &store, None)
            .await
            .unwrap();
        assert_eq!(
            errors.get("role_id").unwrap(),
            ["The role id field must be at least 1."]
        );

        let errors = rules
            .validate(&data(json!({"role_id": "12"})), &store, None)
            .await
            .unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_unique_ignores_own_row() {
        let store = SqlStore::new(testing::memory_pool().await, &USERS);
        let ann = testing::insert_user(&store, "Ann", "ann@example.com").await;
        let rules = RuleSet::parse(&[("email", "sometimes|required|email|unique:users,email")])
            .unwrap();
        let input = data(json!({"email": "ann@example.com"}));

        let errors = rules.validate(&input, &store, None).await.unwrap();
        assert_eq!(
            errors.get("email").unwrap(),
            ["The email has already been taken."]
        );

        let errors = rules.validate(&input, &store, Some(ann.id)).await.unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_exists_checks_other_table() {
        let pool = testing::memory_pool().await;
        let users = SqlStore::new(pool.clone(), &USERS);
        let posts = SqlStore::new(pool, &POSTS);
        let ann = testing::insert_user(&users, "Ann", "ann@example.com").await;
        let rules = RuleSet::parse(&[("user_id", "required|integer|exists:users,id")]).unwrap();

        let errors = rules
            .validate(&data(json!({"user_id": ann.id})), &posts, None)
            .await
            .unwrap();
        assert!(errors.is_empty());

        let errors = rules
            .validate(&data(json!({"user_id": ann.id + 1})), &posts, None)
            .await
            .unwrap();
        assert_eq!(
            errors.get("user_id").unwrap(),
            ["The selected user id is invalid."]
        );
    }

    #[test]
    fn test_allowed_drops_unknown_keys() {
        let allowed = user_rules().allowed(&data(json!({
            "name": "Ann",
            "is_admin": true,
            "id": 7
        })));
        assert_eq!(allowed, data(json!({"name": "Ann"})));
    }

    #[test]
    fn test_errors_serialize_as_map() {
        let errors = ValidationErrors::single("email", "The email field is required.");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"email": ["The email field is required."]})
        );
    }
}
