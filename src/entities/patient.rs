//! Patient entity - An inpatient whose personal allowance the ward office holds.
//!
//! Patients are identified to staff by `patient_code`. They are never physically
//! deleted: discharge or logical deletion only flips `is_active` to false, so the
//! transaction history stays reachable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Patient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    /// Unique identifier for the patient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business key shown on forms and reports (e.g. `"P-001"`)
    #[sea_orm(unique)]
    pub patient_code: String,
    /// Full name
    pub name: String,
    /// Phonetic reading of the name, used for search and sorting on paper forms
    pub name_kana: String,
    /// Ward the patient is currently staying in
    pub ward_name: String,
    /// Room number within the ward
    pub room_number: String,
    /// Date of admission, if recorded
    pub admitted_at: Option<Date>,
    /// Date of discharge; present only for discharged patients
    pub discharged_at: Option<Date>,
    /// Free-form office note
    pub note: String,
    /// False once discharged or logically deleted
    pub is_active: bool,
    /// When the patient was registered
    pub created_at: DateTimeUtc,
    /// When the patient was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Patient and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One patient has many ledger transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// One patient has many billing contact records
    #[sea_orm(has_many = "super::billing_contact::Entity")]
    BillingContacts,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::billing_contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillingContacts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
