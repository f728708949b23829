//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! the account entity, its validation rules, and password credentials.

pub mod account;
pub mod constants;
pub mod error;
pub mod password;

pub use account::{
    validate_email, validate_username, Account, AccountId, AccountResponse, NewAccount,
};
pub use constants::*;
pub use error::{DomainError, DomainResult, Field};
pub use password::{Credential, PasswordHasher};
