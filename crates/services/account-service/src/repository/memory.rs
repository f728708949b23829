//! In-process account storage.
//!
//! Enforces the same contract as the `accounts` table: identifiers come from
//! a sequence, and username and email are unique across every stored row,
//! active or not.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::account_repository::{
    AccountRepository, OP_CREATE, OP_DELETE, OP_GET_BY_EMAIL, OP_GET_BY_ID, OP_GET_BY_USERNAME,
    OP_LIST, OP_UPDATE,
};
use crate::cancel::run_cancellable;
use common::{AppError, AppResult, OptionExt};
use domain::{Account, AccountId, Field};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: HashMap<AccountId, Account>,
}

impl Table {
    /// Unique-constraint check, skipping the row being written
    fn check_unique(&self, username: &str, email: &str, skip: Option<AccountId>) -> AppResult<()> {
        for row in self.rows.values().filter(|row| Some(row.id) != skip) {
            if row.username == username {
                return Err(AppError::already_exists(Field::Username));
            }
            if row.email == email {
                return Err(AppError::already_exists(Field::Email));
            }
        }
        Ok(())
    }

    fn find_by(&self, predicate: impl Fn(&Account) -> bool) -> AppResult<Account> {
        self.rows.values().find(|row| predicate(row)).cloned().ok_or_not_found()
    }
}

/// Account storage held in memory; contents are lost with the process.
#[derive(Default)]
pub struct MemoryAccountStore {
    table: RwLock<Table>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, active or not
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountStore {
    async fn create(
        &self,
        account: domain::NewAccount,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        run_cancellable(cancel, OP_CREATE, async {
            let mut table = self.table.write().await;
            table.check_unique(&account.username, &account.email, None)?;

            table.last_id += 1;
            let stored = account.into_account(AccountId(table.last_id));
            table.rows.insert(stored.id, stored.clone());

            Ok(stored)
        })
        .await
    }

    async fn get_by_id(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<Account> {
        run_cancellable(cancel, OP_GET_BY_ID, async {
            self.table.read().await.rows.get(&id).cloned().ok_or_not_found()
        })
        .await
    }

    async fn get_by_username(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        run_cancellable(cancel, OP_GET_BY_USERNAME, async {
            self.table.read().await.find_by(|row| row.username == username)
        })
        .await
    }

    async fn get_by_email(&self, email: &str, cancel: &CancellationToken) -> AppResult<Account> {
        run_cancellable(cancel, OP_GET_BY_EMAIL, async {
            self.table.read().await.find_by(|row| row.email == email)
        })
        .await
    }

    async fn update(&self, account: &Account, cancel: &CancellationToken) -> AppResult<()> {
        run_cancellable(cancel, OP_UPDATE, async {
            let mut table = self.table.write().await;
            if !table.rows.contains_key(&account.id) {
                return Err(AppError::NotFound);
            }
            table.check_unique(&account.username, &account.email, Some(account.id))?;

            let row = table.rows.get_mut(&account.id).ok_or(AppError::NotFound)?;
            row.username = account.username.clone();
            row.email = account.email.clone();
            row.updated_at = account.updated_at;
            row.active = account.active;

            Ok(())
        })
        .await
    }

    async fn delete(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<()> {
        run_cancellable(cancel, OP_DELETE, async {
            self.table
                .write()
                .await
                .rows
                .remove(&id)
                .map(|_| ())
                .ok_or_not_found()
        })
        .await
    }

    async fn list(
        &self,
        offset: u64,
        limit: u64,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Account>> {
        run_cancellable(cancel, OP_LIST, async {
            let table = self.table.read().await;
            let mut active: Vec<&Account> = table.rows.values().filter(|row| row.active).collect();
            active.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });

            let offset = usize::try_from(offset).unwrap_or(usize::MAX);
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);

            Ok(active.into_iter().skip(offset).take(limit).cloned().collect())
        })
        .await
    }
}
