//! Post resource

use serde_json::{json, Value};

use super::comments::COMMENTS;
use super::users::USERS;
use crate::handlers::{Resource, RuleSpec, Shaper};
use crate::record::{Record, RelationValue};
use crate::schema::{Column, EntitySchema, Relation};

/// `posts` table
pub static POSTS: EntitySchema = EntitySchema {
    name: "Post",
    table: "posts",
    columns: &[
        Column::integer("user_id"),
        Column::text("title"),
        Column::text("body"),
        Column::text("status"),
    ],
    filterable: &["status", "user_id"],
    searchable: &["title", "body"],
    relations: &[
        Relation::belongs_to("author", &USERS, "user_id"),
        Relation::has_many("comments", &COMMENTS, "post_id"),
    ],
};

/// `/post`
#[derive(Debug, Clone, Copy)]
pub struct Posts;

impl Resource for Posts {
    const PATH: &'static str = "post";

    fn schema() -> &'static EntitySchema {
        &POSTS
    }

    fn create_rules() -> RuleSpec {
        &[
            ("user_id", "required|integer|exists:users,id"),
            ("title", "required|string|max:255"),
            ("body", "required|string"),
            ("status", "sometimes|required|in:draft,published"),
        ]
    }

    fn update_rules() -> RuleSpec {
        &[
            ("title", "sometimes|required|string|max:255"),
            ("body", "sometimes|required|string"),
            ("status", "sometimes|required|in:draft,published"),
        ]
    }

    fn shaper() -> Shaper {
        Shaper::new(shape_post)
    }
}

/// The stored post with `comments_count` when comments are loaded
fn shape_post(record: &Record) -> Value {
    let mut value = record.to_json();
    let count = record.relation("comments").map(RelationValue::len);
    if let (Some(count), Value::Object(map)) = (count, &mut value) {
        map.insert("comments_count".to_string(), json!(count));
    }
    value
}
