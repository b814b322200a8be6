//! Product entity - Catalog of shop items used for itemized withdrawals.
//!
//! The default price is copied onto a transaction item when it is bought, so
//! later price changes never rewrite history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business key (e.g. "D-001")
    #[sea_orm(unique)]
    pub code: String,
    /// Name of the product (e.g. "Green tea 500ml")
    pub name: String,
    /// Grouping for the catalog (e.g. "drinks", "daily goods")
    pub category: String,
    /// Suggested unit price in minor units
    pub default_price: i64,
    /// Soft delete flag - if false, product is hidden but history is preserved
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears on many transaction items
    #[sea_orm(has_many = "super::transaction_item::Entity")]
    TransactionItems,
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
