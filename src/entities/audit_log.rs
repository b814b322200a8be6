//! Audit log entity - Append-only trail of administrative actions.
//!
//! Rows are inserted by `core::audit::record_audit` and never updated or deleted.
//! `entity_id` points at the affected record but carries no foreign key: the log
//! is a parallel stream that outlives whatever it describes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of change being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// A record was created
    #[sea_orm(string_value = "CREATE")]
    Create,
    /// A record was modified
    #[sea_orm(string_value = "UPDATE")]
    Update,
    /// A record was removed or deactivated
    #[sea_orm(string_value = "DELETE")]
    Delete,
}

/// Kind of record an audit entry is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AuditEntity {
    /// `patients` row
    #[sea_orm(string_value = "Patient")]
    Patient,
    /// `transactions` row
    #[sea_orm(string_value = "Transaction")]
    Transaction,
    /// `wards` row
    #[sea_orm(string_value = "Ward")]
    Ward,
    /// `products` row
    #[sea_orm(string_value = "Product")]
    Product,
    /// `users` row
    #[sea_orm(string_value = "User")]
    User,
    /// `billing_contacts` row
    #[sea_orm(string_value = "BillingContact")]
    BillingContact,
    /// `closing_periods` row
    #[sea_orm(string_value = "ClosingPeriod")]
    ClosingPeriod,
}

/// Audit log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Id of the acting user
    pub user_id: i64,
    /// Display name of the acting user at the time of the action
    pub user_name: String,
    /// What kind of change happened
    pub action: AuditAction,
    /// What kind of record changed
    pub entity: AuditEntity,
    /// Id of the record that changed
    pub entity_id: i64,
    /// One-line human-readable description
    pub summary: String,
    /// Optional JSON text with the submitted values; informational only
    #[sea_orm(column_type = "Text", nullable)]
    pub detail: Option<String>,
    /// Server-assigned creation time
    pub created_at: DateTimeUtc,
}

/// `AuditLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
