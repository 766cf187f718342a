//! Resources served by the service
//!
//! Each resource pairs an [`EntitySchema`](crate::schema::EntitySchema)
//! static with a [`Resource`](crate::handlers::Resource) declaration.

pub mod comments;
pub mod posts;
pub mod users;

pub use comments::Comments;
pub use posts::Posts;
pub use users::Users;

use crate::schema::EntitySchema;

/// Schemas of every served resource
pub static SCHEMAS: [&EntitySchema; 3] = [&users::USERS, &posts::POSTS, &comments::COMMENTS];
