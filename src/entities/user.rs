//! User entity - Ward office staff accounts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access level of a staff account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Can manage staff accounts and close periods, plus everything office staff can do
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Day-to-day ledger and patient work
    #[sea_orm(string_value = "office")]
    Office,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Office => f.write_str("office"),
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name typed at the login screen
    #[sea_orm(unique)]
    pub login_id: String,
    /// Contact address
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id PHC string; never the plain password
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name used in audit entries
    pub name: String,
    /// Access level
    pub role: UserRole,
    /// Deactivated users cannot log in
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the account was last modified
    pub updated_at: DateTimeUtc,
}

/// `User` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
