//! Account domain entity and related types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_USERNAME_LENGTH, MIN_EMAIL_LENGTH, MIN_USERNAME_LENGTH};
use crate::error::{DomainError, DomainResult, Field};
use crate::password::Credential;

/// Storage-assigned account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        AccountId(id)
    }
}

/// Account domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

impl Account {
    /// Check if the account can still authenticate
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Refresh the last-modified timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Soft delete the account
    pub fn deactivate(&mut self) {
        self.active = false;
        self.touch();
    }
}

/// Account that has not been persisted yet (no identifier)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

impl NewAccount {
    /// Build a new, active account from already validated input.
    pub fn new(username: String, email: String, credential: Credential) -> Self {
        let now = Utc::now();
        Self {
            username,
            email,
            credential,
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    /// Attach the identifier the storage assigned
    pub fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            username: self.username,
            email: self.email,
            credential: self.credential,
            created_at: self.created_at,
            updated_at: self.updated_at,
            active: self.active,
        }
    }
}

/// Account view that is safe to hand out (no credential)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
            active: account.active,
        }
    }
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            created_at: account.created_at,
            updated_at: account.updated_at,
            active: account.active,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Username must be 3 to 50 characters long.
pub fn validate_username(username: &str) -> DomainResult<()> {
    let length = username.chars().count();
    if length < MIN_USERNAME_LENGTH {
        return Err(DomainError::validation(
            Field::Username,
            format!("must be at least {} characters", MIN_USERNAME_LENGTH),
        ));
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(DomainError::validation(
            Field::Username,
            format!("must be at most {} characters", MAX_USERNAME_LENGTH),
        ));
    }
    Ok(())
}

/// Minimal shape check: long enough and contains both `@` and `.`.
pub fn validate_email(email: &str) -> DomainResult<()> {
    if email.chars().count() < MIN_EMAIL_LENGTH {
        return Err(DomainError::validation(Field::Email, "invalid email address"));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(DomainError::validation(Field::Email, "invalid email format"));
    }
    Ok(())
}
