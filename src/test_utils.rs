//! Shared test utilities for the ward ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.
#![allow(clippy::expect_used)]

use crate::{
    core::{
        auth::Actor,
        patient::{self, NewPatient},
        product::{self, ProductInput},
        transaction::{self, NewTransaction},
    },
    entities::{self, transaction::TransactionType, user::UserRole},
    errors::Result,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// An administrator (id 1).
pub fn admin_actor() -> Actor {
    Actor::new(1, "Test Admin", UserRole::Admin)
}

/// An office clerk (id 2).
pub fn office_actor() -> Actor {
    Actor::new(2, "Test Clerk", UserRole::Office)
}

/// Noon on the given day, so the value sits well inside its month.
pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("valid test date")
}

/// Registers a test patient with sensible defaults.
///
/// # Defaults
/// * `name`: `"Patient <code>"`
/// * `ward_name`: `"3F East"`, `room_number`: `"301"`
/// * registered by [`office_actor`]
pub async fn create_test_patient(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::patient::Model> {
    patient::register_patient(
        db,
        &office_actor(),
        NewPatient {
            patient_code: code.to_string(),
            name: format!("Patient {code}"),
            name_kana: format!("Kana {code}"),
            ward_name: "3F East".to_string(),
            room_number: "301".to_string(),
            admitted_at: NaiveDate::from_ymd_opt(2025, 12, 1),
            note: String::new(),
        },
    )
    .await
}

/// Adds a catalog product in the `"drinks"` category.
pub async fn create_test_product(
    db: &DatabaseConnection,
    code: &str,
    default_price: i64,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        &admin_actor(),
        ProductInput {
            code: code.to_string(),
            name: format!("Product {code}"),
            category: "drinks".to_string(),
            default_price,
        },
    )
    .await
}

/// Records an un-itemized transaction as [`office_actor`].
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    patient_id: i64,
    transaction_type: TransactionType,
    amount: i64,
    date: NaiveDateTime,
) -> Result<entities::transaction::Model> {
    transaction::create_transaction(
        db,
        &office_actor(),
        NewTransaction {
            patient_id,
            transaction_type,
            amount,
            description: "Test transaction".to_string(),
            date,
            items: Vec::new(),
        },
    )
    .await
}

/// Sets up a complete test environment with one patient (`"P-001"`).
/// Returns (db, patient) for common test scenarios.
pub async fn setup_with_patient() -> Result<(DatabaseConnection, entities::patient::Model)> {
    let db = setup_test_db().await?;
    let patient = create_test_patient(&db, "P-001").await?;
    Ok((db, patient))
}
