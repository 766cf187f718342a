//! Comment resource

use super::posts::POSTS;
use super::users::USERS;
use crate::handlers::{Resource, RuleSpec};
use crate::schema::{Column, EntitySchema, Relation};

/// `comments` table
pub static COMMENTS: EntitySchema = EntitySchema {
    name: "Comment",
    table: "comments",
    columns: &[
        Column::integer("post_id"),
        Column::integer("user_id"),
        Column::text("body"),
    ],
    filterable: &["post_id", "user_id"],
    searchable: &["body"],
    relations: &[
        Relation::belongs_to("author", &USERS, "user_id"),
        Relation::belongs_to("post", &POSTS, "post_id"),
    ],
};

/// `/comment`
#[derive(Debug, Clone, Copy)]
pub struct Comments;

impl Resource for Comments {
    const PATH: &'static str = "comment";

    fn schema() -> &'static EntitySchema {
        &COMMENTS
    }

    fn create_rules() -> RuleSpec {
        &[
            ("post_id", "required|integer|exists:posts,id"),
            ("user_id", "required|integer|exists:users,id"),
            ("body", "required|string|max:2000"),
        ]
    }

    fn update_rules() -> RuleSpec {
        &[("body", "sometimes|required|string|max:2000")]
    }
}
