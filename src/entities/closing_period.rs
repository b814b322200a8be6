//! Closing period entity - A year-month the office has finalized.
//!
//! At most one row per (year, month); the unique index is created alongside the
//! table in `config::database::create_tables`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closing period database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "closing_periods")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Calendar year
    pub year: i32,
    /// Calendar month, 1-12
    pub month: u32,
    /// User id of the staff member who closed the month
    pub closed_by: i64,
    /// When the month was closed
    pub closed_at: DateTimeUtc,
}

/// `ClosingPeriod` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
