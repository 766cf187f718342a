//! User resource

use serde_json::{json, Map, Value};

use super::posts::POSTS;
use crate::handlers::{Resource, RuleSpec, Shaper};
use crate::record::Record;
use crate::schema::{Column, EntitySchema, Relation};

/// `users` table
pub static USERS: EntitySchema = EntitySchema {
    name: "User",
    table: "users",
    columns: &[
        Column::text("name"),
        Column::text("email"),
        Column::text("password").secret(),
        Column::text("status"),
        Column::integer("role_id"),
    ],
    filterable: &["status", "role_id"],
    searchable: &["name", "email"],
    relations: &[Relation::has_many("posts", &POSTS, "user_id")],
};

/// `/user`
#[derive(Debug, Clone, Copy)]
pub struct Users;

impl Resource for Users {
    const PATH: &'static str = "user";

    fn schema() -> &'static EntitySchema {
        &USERS
    }

    fn create_rules() -> RuleSpec {
        &[
            ("name", "required|string|max:255"),
            ("email", "required|email|max:255|unique:users,email"),
            ("password", "required|string|min:8"),
            ("status", "sometimes|required|in:active,inactive"),
            ("role_id", "sometimes|nullable|integer|min:1"),
        ]
    }

    fn update_rules() -> RuleSpec {
        &[
            ("name", "sometimes|required|string|max:255"),
            ("email", "sometimes|required|email|max:255|unique:users,email"),
            ("password", "sometimes|required|string|min:8"),
            ("status", "sometimes|required|in:active,inactive"),
            ("role_id", "sometimes|nullable|integer|min:1"),
        ]
    }

    fn shaper() -> Shaper {
        Shaper::new(shape_user)
    }
}

/// Public fields of a user, plus its posts when loaded
fn shape_user(record: &Record) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), json!(record.id));
    for field in ["name", "email", "status", "role_id"] {
        out.insert(
            field.to_string(),
            record.get(field).cloned().unwrap_or(Value::Null),
        );
    }
    if let Some(posts) = record.relation("posts") {
        out.insert(
            "posts".to_string(),
            serde_json::to_value(posts).unwrap_or(Value::Null),
        );
    }
    out.insert("created_at".to_string(), json!(record.created_at));
    out.insert("updated_at".to_string(), json!(record.updated_at));
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RelationValue;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_shape_user_lists_public_fields() {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!("Ann"));
        fields.insert("email".to_string(), json!("ann@example.com"));
        fields.insert("status".to_string(), json!("active"));
        fields.insert("internal_note".to_string(), json!("x"));
        let mut record = Record {
            id: 3,
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            relations: BTreeMap::new(),
        };

        let shaped = shape_user(&record);
        assert_eq!(shaped["id"], 3);
        assert_eq!(shaped["name"], "Ann");
        assert_eq!(shaped["role_id"], Value::Null);
        assert!(shaped.get("internal_note").is_none());
        assert!(shaped.get("posts").is_none());

        record
            .relations
            .insert("posts".to_string(), RelationValue::Many(vec![]));
        assert_eq!(shape_user(&record)["posts"], json!([]));
    }

    #[test]
    fn test_rules_parse() {
        assert!(crate::validation::RuleSet::parse(Users::create_rules()).is_ok());
        assert!(crate::validation::RuleSet::parse(Users::update_rules()).is_ok());
    }
}
