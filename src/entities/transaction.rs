//! Transaction entity - A single deposit into or withdrawal from a patient's allowance.
//!
//! Amounts are always positive integers in minor currency units; the direction is
//! carried by `transaction_type`. Itemized withdrawals break down into
//! `transaction_items` rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money handed to the office for the patient
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Money spent on behalf of the patient
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
}

impl TransactionType {
    /// Lowercase wire name, matching the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Applies the direction to a positive amount: deposits add, withdrawals subtract.
    #[must_use]
    pub const fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Deposit => amount,
            Self::Withdrawal => -amount,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Patient this transaction belongs to
    pub patient_id: i64,
    /// Deposit or withdrawal
    pub transaction_type: TransactionType,
    /// Positive amount in minor currency units
    pub amount: i64,
    /// Human-readable description (e.g. "Shop - drinks")
    pub description: String,
    /// When the money moved; drives month membership and running balances
    pub date: DateTime,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one patient
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id"
    )]
    Patient,
    /// An itemized withdrawal has many item rows
    #[sea_orm(has_many = "super::transaction_item::Entity")]
    Items,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
