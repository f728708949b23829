//! Account repository trait and its SeaORM implementation.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use tokio_util::sync::CancellationToken;

use super::entities::account::{self, ActiveModel, Entity as AccountEntity};
use crate::cancel::run_cancellable;
use common::{AppError, AppResult, OptionExt};
use domain::{Account, AccountId, Field, NewAccount};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

pub(crate) const OP_CREATE: &str = "create account";
pub(crate) const OP_GET_BY_ID: &str = "fetch account by id";
pub(crate) const OP_GET_BY_USERNAME: &str = "fetch account by username";
pub(crate) const OP_GET_BY_EMAIL: &str = "fetch account by email";
pub(crate) const OP_UPDATE: &str = "update account";
pub(crate) const OP_DELETE: &str = "delete account";
pub(crate) const OP_LIST: &str = "list accounts";

/// Account repository trait for dependency injection.
///
/// Every call takes a cancellation token; a cancelled call fails with
/// [`AppError::Cancelled`] and leaves storage untouched. Username and email
/// uniqueness is enforced by the backend, which reports violations as
/// [`AppError::AlreadyExists`].
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account; the backend assigns the identifier
    async fn create(&self, account: NewAccount, cancel: &CancellationToken) -> AppResult<Account>;

    /// Find account by ID (active or not)
    async fn get_by_id(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<Account>;

    /// Find account by exact username (active or not)
    async fn get_by_username(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account>;

    /// Find account by exact email (active or not)
    async fn get_by_email(&self, email: &str, cancel: &CancellationToken) -> AppResult<Account>;

    /// Replace username, email, updated timestamp and active flag
    async fn update(&self, account: &Account, cancel: &CancellationToken) -> AppResult<()>;

    /// Permanently remove the account (hard delete)
    async fn delete(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<()>;

    /// Active accounts, newest first
    async fn list(
        &self,
        offset: u64,
        limit: u64,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Account>>;
}

/// Concrete implementation of AccountRepository over SeaORM
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        operation: &'static str,
        column: account::Column,
        value: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        run_cancellable(cancel, operation, async {
            let model = AccountEntity::find()
                .filter(column.eq(value))
                .one(&self.db)
                .await
                .map_err(|e| AppError::persistence(operation, e))?;

            model.map(Account::from).ok_or_not_found()
        })
        .await
    }
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn create(&self, account: NewAccount, cancel: &CancellationToken) -> AppResult<Account> {
        run_cancellable(cancel, OP_CREATE, async {
            let active_model = ActiveModel {
                username: Set(account.username),
                email: Set(account.email),
                password_hash: Set(account.credential.hash().to_string()),
                password_salt: Set(account.credential.salt().to_string()),
                created_at: Set(account.created_at),
                updated_at: Set(account.updated_at),
                is_active: Set(account.active),
                ..Default::default()
            };

            let model = active_model
                .insert(&self.db)
                .await
                .map_err(|e| write_error(OP_CREATE, e))?;

            Ok(Account::from(model))
        })
        .await
    }

    async fn get_by_id(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<Account> {
        run_cancellable(cancel, OP_GET_BY_ID, async {
            let model = AccountEntity::find_by_id(id.value())
                .one(&self.db)
                .await
                .map_err(|e| AppError::persistence(OP_GET_BY_ID, e))?;

            model.map(Account::from).ok_or_not_found()
        })
        .await
    }

    async fn get_by_username(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        self.find_one(OP_GET_BY_USERNAME, account::Column::Username, username, cancel)
            .await
    }

    async fn get_by_email(&self, email: &str, cancel: &CancellationToken) -> AppResult<Account> {
        self.find_one(OP_GET_BY_EMAIL, account::Column::Email, email, cancel)
            .await
    }

    async fn update(&self, account: &Account, cancel: &CancellationToken) -> AppResult<()> {
        run_cancellable(cancel, OP_UPDATE, async {
            // Credential and creation time are left NotSet, so they are never written
            let active = ActiveModel {
                id: Unchanged(account.id.value()),
                username: Set(account.username.clone()),
                email: Set(account.email.clone()),
                updated_at: Set(account.updated_at),
                is_active: Set(account.active),
                ..Default::default()
            };

            active
                .update(&self.db)
                .await
                .map_err(|e| write_error(OP_UPDATE, e))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<()> {
        run_cancellable(cancel, OP_DELETE, async {
            let result = AccountEntity::delete_by_id(id.value())
                .exec(&self.db)
                .await
                .map_err(|e| AppError::persistence(OP_DELETE, e))?;

            if result.rows_affected == 0 {
                return Err(AppError::NotFound);
            }

            Ok(())
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
            let models = AccountEntity::find()
                .filter(account::Column::IsActive.eq(true))
                .order_by_desc(account::Column::CreatedAt)
                .order_by_desc(account::Column::Id)
                .offset(offset)
                .limit(limit)
                .all(&self.db)
                .await
                .map_err(|e| AppError::persistence(OP_LIST, e))?;

            Ok(models.into_iter().map(Account::from).collect())
        })
        .await
    }
}

/// Map a failed write, surfacing unique-constraint violations as conflicts.
fn write_error(operation: &'static str, err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return AppError::already_exists(violated_field(&detail));
    }

    match err {
        DbErr::RecordNotUpdated => AppError::NotFound,
        other => AppError::persistence(operation, other),
    }
}

/// Constraint names carry the column (`accounts_email_key`).
fn violated_field(detail: &str) -> Field {
    if detail.contains("email") {
        Field::Email
    } else {
        Field::Username
    }
}
