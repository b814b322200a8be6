//! Ward entity - Reference list of hospital wards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ward database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wards")]
pub struct Model {
    /// Unique identifier for the ward
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g. "3F East")
    #[sea_orm(unique)]
    pub name: String,
    /// Soft delete flag - inactive wards are hidden from pick lists
    pub is_active: bool,
    /// When the ward was created
    pub created_at: DateTimeUtc,
    /// When the ward was last modified
    pub updated_at: DateTimeUtc,
}

/// `Ward` has no relationships with other entities; patients store the ward by name
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
