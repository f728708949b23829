//! Service layer - business logic.

mod account_service;

pub use account_service::{AccountManager, AccountService, DEFAULT_CACHE_TTL};
