//! Transaction item entity - One product line of an itemized withdrawal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_items")]
pub struct Model {
    /// Unique identifier for the item row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent transaction
    pub transaction_id: i64,
    /// Catalog product that was bought
    pub product_id: i64,
    /// Price per unit at the time of purchase, in minor units
    pub unit_price: i64,
    /// Number of units
    pub quantity: i32,
    /// `unit_price * quantity`
    pub subtotal: i64,
}

/// Defines relationships between `TransactionItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one transaction
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id",
        on_delete = "Cascade"
    )]
    Transaction,
    /// Each item refers to one catalog product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
