//! Billing contact entity - Record of the office contacting a patient's family
//! about money (requests for a top-up, receipts sent, ...).
//!
//! Purely informational: nothing here touches the ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Billing contact database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_contacts")]
pub struct Model {
    /// Unique identifier for the contact record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Patient the contact is about
    pub patient_id: i64,
    /// Day the contact took place
    pub contact_date: Date,
    /// How the contact was made (phone, letter, ...)
    pub method: String,
    /// Who was contacted
    pub recipient: String,
    /// Amount discussed, in minor units (zero when not applicable)
    pub amount: i64,
    /// What was said or sent
    pub content: String,
    /// Follow-up state (e.g. "pending", "done")
    pub status: String,
    /// When the record was created
    pub created_at: DateTimeUtc,
    /// When the record was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `BillingContact` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contact belongs to one patient
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id"
    )]
    Patient,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
