//! Infrastructure layer - database and schema.

mod db;
pub mod migrations;

pub use db::Database;
pub use migrations::Migrator;
