//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::handlers::{CrudService, Resource};
use crate::password::PasswordHasher;
use crate::repository::{GenericRepository, Notifier, SqlStore};
use crate::validation::RuleParseError;

/// State shared by the router: configuration, the connection pool and the
/// collaborators every repository is built with
#[derive(Clone, Debug)]
pub struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    notifier: Notifier,
    hasher: PasswordHasher,
}

impl AppState {
    /// State over `pool` with no lifecycle listeners and default hashing
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            pool,
            notifier: Notifier::new(),
            hasher: PasswordHasher::default(),
        }
    }

    /// Publish lifecycle events through `notifier`
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

    /// Service configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// CRUD service for resource `R`
    ///
    /// Fails if `R` declares a malformed validation rule.
    pub fn crud_service<R: Resource>(&self) -> Result<CrudService<R, SqlStore>, RuleParseError> {
        let repository = GenericRepository::new(SqlStore::new(self.pool.clone(), R::schema()))
            .with_notifier(self.notifier.clone())
            .with_hasher(self.hasher.clone());

        Ok(CrudService::new(repository)?.with_pagination(self.config.pagination))
    }
}
