//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Minimum username length in characters
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length in characters
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Minimum email length in characters
pub const MIN_EMAIL_LENGTH: usize = 5;

// =============================================================================
// Password hashing (Argon2id)
// =============================================================================

/// Salt length in bytes
pub const SALT_LENGTH: usize = 16;

/// Derived digest length in bytes
pub const HASH_LENGTH: usize = 32;

/// Argon2 time cost (iterations)
pub const ARGON2_TIME_COST: u32 = 1;

/// Argon2 memory cost in KiB (64 MiB)
pub const ARGON2_MEMORY_COST_KIB: u32 = 64 * 1024;

/// Argon2 degree of parallelism (lanes)
pub const ARGON2_PARALLELISM: u32 = 4;

// =============================================================================
// Pagination
// =============================================================================

/// Default number of accounts per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// First page number (pages are 1-indexed)
pub const FIRST_PAGE: u64 = 1;
