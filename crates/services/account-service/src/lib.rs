//! Account Service Library
//!
//! Account lifecycle (create, read, update, deactivate, list) and
//! password authentication over a pluggable repository and cache.
//! The `account-service` binary wraps it with administrative commands.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::info;

use common::{AppResult, CacheBackend};
use domain::{Account, AccountId};

use crate::cache::{account_key, Cache, MemoryCache, RedisCache};
use crate::config::AccountServiceConfig;
use crate::infra::Database;
use crate::repository::{AccountRepository, AccountStore};
use crate::service::{AccountManager, AccountService};

/// Redis namespace for this service's keys
const REDIS_NAMESPACE: &str = "account-service";

/// Wired-up account service together with its collaborators.
///
/// The repository and cache are exposed for administrative operations
/// that bypass the service's lifecycle rules.
#[derive(Clone)]
pub struct AccountRuntime {
    pub service: Arc<dyn AccountService>,
    pub repository: Arc<dyn AccountRepository>,
    pub cache: Arc<dyn Cache<Account>>,
}

impl AccountRuntime {
    /// Compose a runtime from already constructed parts.
    pub fn assemble(
        repository: Arc<dyn AccountRepository>,
        cache: Arc<dyn Cache<Account>>,
        config: &AccountServiceConfig,
    ) -> Self {
        let service = AccountManager::new(repository.clone(), cache.clone())
            .with_cache_ttl(config.cache_ttl());

        Self {
            service: Arc::new(service),
            repository,
            cache,
        }
    }

    /// Connect storage (applying pending migrations) and the configured cache.
    pub async fn connect(
        config: &AccountServiceConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::connect(&config.database).await?;
        let repository: Arc<dyn AccountRepository> =
            Arc::new(AccountStore::new(db.get_connection()));

        let cache: Arc<dyn Cache<Account>> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Redis => {
                Arc::new(RedisCache::connect(&config.cache.url, REDIS_NAMESPACE).await?)
            }
        };
        info!(backend = ?config.cache.backend, "Account cache ready");

        Ok(Self::assemble(repository, cache, config))
    }

    /// Hard delete an account and drop its cached copy.
    ///
    /// Administrative only; the service itself never removes records.
    pub async fn purge(
        &self,
        id: AccountId,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> AppResult<()> {
        self.repository.delete(id, cancel).await?;
        self.cache.delete(&account_key(id)).await?;
        info!(account_id = %id, "Account purged");
        Ok(())
    }
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(
    config: &AccountServiceConfig,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
