//! Account database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::{Account, AccountId, Credential};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    /// Soft delete flag (false = deactivated)
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Account {
            id: AccountId(model.id),
            username: model.username,
            email: model.email,
            credential: Credential::from_parts(model.password_hash, model.password_salt),
            created_at: model.created_at,
            updated_at: model.updated_at,
            active: model.is_active,
        }
    }
}
