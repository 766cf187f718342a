//! Shared fixtures for unit tests

use serde_json::{json, Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::PasswordConfig;
use crate::password::PasswordHasher;
use crate::record::Record;
use crate::repository::{EntityStore, SqlStore};

/// Tables of the service
pub(crate) const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Fresh in-memory database with every table created
///
/// A single connection that never expires keeps the in-memory database alive
/// for the whole test.
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .expect("schema applies");
    pool
}

/// Argon2 hasher with minimal cost
pub(crate) fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::new(&PasswordConfig {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    })
    .expect("valid argon2 parameters")
}

/// Insert a user directly through the store
pub(crate) async fn insert_user(store: &SqlStore, name: &str, email: &str) -> Record {
    let data: Map<String, Value> = json!({
        "name": name,
        "email": email,
        "password": "not-a-real-hash",
        "status": "active",
    })
    .as_object()
    .cloned()
    .expect("object literal");
    store.create(&data).await.expect("user inserted")
}
