//! Account service - account lifecycle and authentication.
//!
//! Orchestrates the repository (source of truth), the account cache and
//! password hashing. Reads go through the cache; writes go to the
//! repository and then invalidate the cached entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::{AppError, AppResult};
use domain::{
    validate_email, validate_username, Account, AccountId, Credential, Field, NewAccount,
    PasswordHasher, FIRST_PAGE,
};

use crate::cache::{account_key, Cache};
use crate::repository::AccountRepository;

/// How long a cached account stays valid unless configured otherwise
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Account service trait for dependency injection.
///
/// Accounts move from active to inactive and never back.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new active account
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account>;

    /// Get account by ID, active or not
    async fn get_account(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<Account>;

    /// Change username and/or email of an active account
    async fn update_account(
        &self,
        account: Account,
        cancel: &CancellationToken,
    ) -> AppResult<Account>;

    /// Soft delete: the account stays stored but can no longer log in
    async fn deactivate_account(&self, id: AccountId, cancel: &CancellationToken)
        -> AppResult<()>;

    /// Check a username/password pair
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account>;

    /// Active accounts, newest first; `page` starts at 1
    async fn list_accounts(
        &self,
        page: u64,
        page_size: u64,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Account>>;
}

/// Concrete implementation of AccountService.
pub struct AccountManager {
    repo: Arc<dyn AccountRepository>,
    cache: Arc<dyn Cache<Account>>,
    hasher: PasswordHasher,
    cache_ttl: Duration,
}

impl AccountManager {
    /// Create new account service instance
    pub fn new(repo: Arc<dyn AccountRepository>, cache: Arc<dyn Cache<Account>>) -> Self {
        Self {
            repo,
            cache,
            hasher: PasswordHasher::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Override the cache time-to-live
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_password(&self, password: &str) -> AppResult<Credential> {
        let hasher = self.hasher;
        let password = password.to_owned();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || span.in_scope(|| hasher.hash(&password)))
            .await
            .map_err(AppError::hashing)?
            .map_err(AppError::from)
    }

    async fn verify_password(&self, password: &str, credential: Credential) -> AppResult<bool> {
        let hasher = self.hasher;
        let password = password.to_owned();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || span.in_scope(|| hasher.verify(&password, &credential)))
            .await
            .map_err(AppError::hashing)
    }

    /// Cache read; a failing cache counts as a miss.
    async fn cached(&self, id: AccountId) -> Option<Account> {
        match self.cache.get(&account_key(id)).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(account_id = %id, error = %e, "Cache read failed, using repository");
                None
            }
        }
    }

    /// Cache fill; the repository already holds the data, so failure is only logged.
    async fn remember(&self, account: &Account) {
        let key = account_key(account.id);
        if let Err(e) = self.cache.set(&key, account.clone(), self.cache_ttl).await {
            tracing::warn!(account_id = %account.id, error = %e, "Cache write failed");
        }
    }

    /// Invalidation must succeed, or readers would keep seeing the old state.
    async fn forget(&self, id: AccountId) -> AppResult<()> {
        self.cache.delete(&account_key(id)).await
    }

    /// Fail if an active account already holds this username/email.
    fn ensure_unclaimed(field: Field, lookup: AppResult<Account>) -> AppResult<()> {
        match lookup {
            Ok(existing) if existing.is_active() => Err(AppError::already_exists(field)),
            Ok(_) | Err(AppError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AccountService for AccountManager {
    #[tracing::instrument(skip(self, email, password, cancel))]
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        // Not atomic with the insert below; the backend's unique
        // constraints reject whichever concurrent create loses.
        Self::ensure_unclaimed(Field::Username, self.repo.get_by_username(username, cancel).await)?;
        Self::ensure_unclaimed(Field::Email, self.repo.get_by_email(email, cancel).await)?;

        validate_username(username)?;
        validate_email(email)?;

        let credential = self.hash_password(password).await?;
        let new_account = NewAccount::new(username.to_string(), email.to_string(), credential);
        let account = self.repo.create(new_account, cancel).await?;

        self.remember(&account).await;
        tracing::info!(account_id = %account.id, "Account created");

        Ok(account)
    }

    #[tracing::instrument(skip(self, cancel))]
    async fn get_account(&self, id: AccountId, cancel: &CancellationToken) -> AppResult<Account> {
        if let Some(account) = self.cached(id).await {
            tracing::debug!("Cache hit");
            return Ok(account);
        }

        tracing::debug!("Cache miss");
        let account = self.repo.get_by_id(id, cancel).await?;
        self.remember(&account).await;

        Ok(account)
    }

    #[tracing::instrument(skip_all, fields(account_id = %account.id))]
    async fn update_account(
        &self,
        account: Account,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        validate_username(&account.username)?;
        validate_email(&account.email)?;

        let mut stored = self.repo.get_by_id(account.id, cancel).await?;
        if !stored.is_active() {
            return Err(AppError::UserInactive);
        }

        if account.username != stored.username {
            let holder = self.repo.get_by_username(&account.username, cancel).await;
            Self::ensure_unclaimed(Field::Username, holder)?;
        }
        if account.email != stored.email {
            let holder = self.repo.get_by_email(&account.email, cancel).await;
            Self::ensure_unclaimed(Field::Email, holder)?;
        }

        // Only username and email are editable; flag and credential stay as stored
        stored.username = account.username;
        stored.email = account.email;
        stored.touch();

        self.repo.update(&stored, cancel).await?;
        self.forget(stored.id).await?;
        tracing::info!("Account updated");

        Ok(stored)
    }

    #[tracing::instrument(skip(self, cancel))]
    async fn deactivate_account(
        &self,
        id: AccountId,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let mut account = self.repo.get_by_id(id, cancel).await?;

        if account.is_active() {
            account.deactivate();
            self.repo.update(&account, cancel).await?;
            tracing::info!("Account deactivated");
        } else {
            tracing::debug!("Account already inactive");
        }

        self.forget(id).await
    }

    #[tracing::instrument(skip(self, password, cancel))]
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Account> {
        let account = match self.repo.get_by_username(username, cancel).await {
            Ok(account) => account,
            Err(AppError::NotFound) => {
                // Same work as a wrong password, so response time does not
                // reveal whether the username exists
                self.verify_password(password, Credential::unmatchable()).await?;
                tracing::debug!("Authentication rejected");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !account.is_active() {
            return Err(AppError::UserInactive);
        }

        if !self.verify_password(password, account.credential.clone()).await? {
            tracing::debug!("Authentication rejected");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(account_id = %account.id, "Account authenticated");
        Ok(account)
    }

    #[tracing::instrument(skip(self, cancel))]
    async fn list_accounts(
        &self,
        page: u64,
        page_size: u64,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Account>> {
        if page < FIRST_PAGE {
            return Err(AppError::validation(Field::Page, "must be at least 1"));
        }
        if page_size == 0 {
            return Err(AppError::validation(Field::PageSize, "must be at least 1"));
        }

        let offset = (page - 1).saturating_mul(page_size);

        self.repo.list(offset, page_size, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::cache::MemoryCache;
    use crate::repository::MockAccountRepository;

    fn test_account(id: i64, username: &str, credential: Credential) -> Account {
        Account {
            id: AccountId(id),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            credential,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            active: true,
        }
    }

    fn placeholder(id: i64, username: &str) -> Account {
        test_account(id, username, Credential::from_parts("hash", "salt"))
    }

    fn service(repo: MockAccountRepository) -> (AccountManager, Arc<MemoryCache<Account>>) {
        let cache = Arc::new(MemoryCache::<Account>::new());
        (AccountManager::new(Arc::new(repo), cache.clone()), cache)
    }

    /// Cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl Cache<Account> for BrokenCache {
        async fn get(&self, _key: &str) -> AppResult<Option<Account>> {
            Err(AppError::cache("connection refused"))
        }

        async fn set(&self, _key: &str, _value: Account, _ttl: Duration) -> AppResult<()> {
            Err(AppError::cache("connection refused"))
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            Err(AppError::cache("connection refused"))
        }
    }

    fn unclaimed_repo() -> MockAccountRepository {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|_, _| Err(AppError::NotFound));
        repo.expect_get_by_email()
            .returning(|_, _| Err(AppError::NotFound));
        repo
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_writing() {
        let mut repo = unclaimed_repo();
        repo.expect_create().never();

        let (service, _) = service(repo);
        let cancel = CancellationToken::new();

        let err = service
            .create_account("al", "alice@x.com", "pw123456", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Field::Username, .. }));

        let err = service
            .create_account("alice", "alice-at-x", "pw123456", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Field::Email, .. }));
    }

    #[tokio::test]
    async fn test_create_reports_taken_username_before_bad_email() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|name, _| Ok(placeholder(1, name)));

        let (service, _) = service(repo);
        let result = service
            .create_account("alice", "not-an-email", "pw123456", &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::already_exists(Field::Username)));
    }

    #[tokio::test]
    async fn test_create_accepts_any_password() {
        let mut repo = unclaimed_repo();
        repo.expect_create()
            .times(1)
            .returning(|new_account, _| Ok(new_account.into_account(AccountId(2))));

        let (service, _) = service(repo);
        let account = service
            .create_account("bob", "bob@x.com", "pw", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(account.id, AccountId(2));
        assert!(account.active);
    }

    #[tokio::test]
    async fn test_create_rejects_active_username_holder() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|name, _| Ok(placeholder(1, name)));

        let (service, _) = service(repo);
        let result = service
            .create_account("alice", "alice@x.com", "pw123456", &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::already_exists(Field::Username)));
    }

    #[tokio::test]
    async fn test_create_rejects_active_email_holder() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|_, _| Err(AppError::NotFound));
        repo.expect_get_by_email()
            .returning(|_, _| Ok(placeholder(1, "someone")));

        let (service, _) = service(repo);
        let result = service
            .create_account("alice", "alice@x.com", "pw123456", &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::already_exists(Field::Email)));
    }

    #[tokio::test]
    async fn test_create_surfaces_backend_uniqueness_violation() {
        // Inactive holder passes the pre-check; the backend constraint still rejects
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username().returning(|name, _| {
            let mut old = placeholder(1, name);
            old.active = false;
            Ok(old)
        });
        repo.expect_get_by_email()
            .returning(|_, _| Err(AppError::NotFound));
        repo.expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::already_exists(Field::Username)));

        let (service, cache) = service(repo);
        let result = service
            .create_account("alice", "alice@x.com", "pw123456", &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::already_exists(Field::Username)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_create_hashes_and_caches() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|_, _| Err(AppError::NotFound));
        repo.expect_get_by_email()
            .returning(|_, _| Err(AppError::NotFound));
        repo.expect_create()
            .withf(|new_account, _| {
                new_account.active
                    && PasswordHasher::new().verify("pw123456", &new_account.credential)
            })
            .returning(|new_account, _| Ok(new_account.into_account(AccountId(7))));

        let (service, cache) = service(repo);
        let account = service
            .create_account("alice", "alice@x.com", "pw123456", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(account.id, AccountId(7));
        assert_eq!(cache.get("account:7").await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn test_get_account_reads_through_cache() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .with(eq(AccountId(3)), always())
            .times(1)
            .returning(|id, _| Ok(placeholder(id.value(), "carol")));

        let (service, cache) = service(repo);
        let cancel = CancellationToken::new();

        let first = service.get_account(AccountId(3), &cancel).await.unwrap();
        let second = service.get_account(AccountId(3), &cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_account_not_found_is_not_cached() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|_, _| Err(AppError::NotFound));

        let (service, cache) = service(repo);
        let result = service.get_account(AccountId(9), &CancellationToken::new()).await;

        assert_eq!(result, Err(AppError::NotFound));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_broken_cache_read_falls_back_to_repository() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .times(1)
            .returning(|id, _| Ok(placeholder(id.value(), "dave")));

        let service = AccountManager::new(Arc::new(repo), Arc::new(BrokenCache));
        let account = service
            .get_account(AccountId(4), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(account.username, "dave");
    }

    #[tokio::test]
    async fn test_failed_invalidation_is_reported() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|id, _| Ok(placeholder(id.value(), "erin")));
        repo.expect_update().times(1).returning(|_, _| Ok(()));

        let service = AccountManager::new(Arc::new(repo), Arc::new(BrokenCache));
        let result = service
            .deactivate_account(AccountId(5), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::cache("connection refused")));
    }

    #[tokio::test]
    async fn test_update_invalidates_instead_of_repopulating() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|id, _| Ok(placeholder(id.value(), "frank")));
        repo.expect_get_by_username()
            .with(eq("franky"), always())
            .returning(|_, _| Err(AppError::NotFound));
        repo.expect_update()
            .withf(|account, _| account.username == "franky" && account.active)
            .times(1)
            .returning(|_, _| Ok(()));

        let (service, cache) = service(repo);
        cache
            .set("account:6", placeholder(6, "frank"), DEFAULT_CACHE_TTL)
            .await
            .unwrap();

        let mut edit = placeholder(6, "frank");
        edit.username = "franky".to_string();
        // Attempted reactivation/flag changes are ignored
        edit.active = false;
        let updated = service
            .update_account(edit, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(updated.username, "franky");
        assert!(updated.active);
        assert_eq!(cache.get("account:6").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_rejects_inactive_account() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id().returning(|id, _| {
            let mut account = placeholder(id.value(), "gina");
            account.active = false;
            Ok(account)
        });

        let (service, _) = service(repo);
        let result = service
            .update_account(placeholder(8, "gina"), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::UserInactive));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|id, _| Ok(placeholder(id.value(), "hank")));
        repo.expect_get_by_email()
            .returning(|_, _| Ok(placeholder(99, "other")));

        let (service, _) = service(repo);
        let mut edit = placeholder(2, "hank");
        edit.email = "other@example.com".to_string();

        let result = service.update_account(edit, &CancellationToken::new()).await;
        assert_eq!(result, Err(AppError::already_exists(Field::Email)));
    }

    #[tokio::test]
    async fn test_deactivate_never_hard_deletes() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|id, _| Ok(placeholder(id.value(), "ivan")));
        repo.expect_update()
            .withf(|account, _| !account.active)
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_delete().never();

        let (service, _) = service(repo);
        service
            .deactivate_account(AccountId(1), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deactivate_missing_account() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|_, _| Err(AppError::NotFound));

        let (service, _) = service(repo);
        let result = service
            .deactivate_account(AccountId(1), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::NotFound));
    }

    #[tokio::test]
    async fn test_authenticate_hides_missing_account() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|_, _| Err(AppError::NotFound));

        let (service, _) = service(repo);
        let result = service
            .authenticate("ghost", "pw123456", &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_authenticate_propagates_storage_failure() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(|_, _| Err(AppError::persistence("fetch account by username", "timeout")));

        let (service, _) = service(repo);
        let result = service
            .authenticate("alice", "pw123456", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(AppError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_account() {
        let credential = PasswordHasher::new().hash("pw123456").unwrap();
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username().returning(move |name, _| {
            let mut account = test_account(1, name, credential.clone());
            account.active = false;
            Ok(account)
        });

        let (service, _) = service(repo);
        let result = service
            .authenticate("alice", "pw123456", &CancellationToken::new())
            .await;

        assert_eq!(result, Err(AppError::UserInactive));
    }

    #[tokio::test]
    async fn test_authenticate_checks_password() {
        let credential = PasswordHasher::new().hash("pw123456").unwrap();
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_username()
            .returning(move |name, _| Ok(test_account(11, name, credential.clone())));

        let (service, _) = service(repo);
        let cancel = CancellationToken::new();

        let ok = service.authenticate("alice", "pw123456", &cancel).await.unwrap();
        assert_eq!(ok.id, AccountId(11));

        let wrong = service.authenticate("alice", "pw1234567", &cancel).await;
        assert_eq!(wrong, Err(AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_list_accounts_offsets() {
        let mut repo = MockAccountRepository::new();
        repo.expect_list()
            .with(eq(20), eq(10), always())
            .times(1)
            .returning(|_, _, _| Ok(vec![placeholder(1, "jane")]));
        repo.expect_list()
            .with(eq(150), eq(150), always())
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let (service, _) = service(repo);
        let cancel = CancellationToken::new();

        assert_eq!(service.list_accounts(3, 10, &cancel).await.unwrap().len(), 1);
        // Large pages are neither clamped nor shifted
        assert!(service.list_accounts(2, 150, &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_accounts_rejects_bad_paging() {
        let (service, _) = service(MockAccountRepository::new());
        let cancel = CancellationToken::new();

        let err = service.list_accounts(0, 10, &cancel).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Field::Page, .. }));

        let err = service.list_accounts(1, 0, &cancel).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Field::PageSize, .. }));
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_from_repository() {
        let mut repo = MockAccountRepository::new();
        repo.expect_get_by_id()
            .returning(|_, _| Err(AppError::cancelled("fetch account by id")));

        let (service, cache) = service(repo);
        let result = service.get_account(AccountId(1), &CancellationToken::new()).await;

        assert_eq!(result, Err(AppError::cancelled("fetch account by id")));
        assert!(cache.is_empty());
    }
}
