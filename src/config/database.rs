//! Database configuration module for the ward ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Statements use `IF NOT EXISTS` so start-up
//! can run against an existing database file.

use crate::entities::{
    AuditLog, BillingContact, ClosingPeriod, Patient, Product, Transaction, TransactionItem,
    User, Ward, closing_period,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/ward_ledger.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// The returned handle is the single store client for the process; it is created once
/// at start-up and passed by reference to every operation.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if database_url == DEFAULT_DATABASE_URL {
        std::fs::create_dir_all("data")?;
    }
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables from the entity definitions, parents before children.
///
/// Also creates the unique (year, month) index on `closing_periods`, which the entity
/// derive cannot express.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Ward).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Patient).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, TransactionItem).await?;
    create_table(db, &schema, BillingContact).await?;
    create_table(db, &schema, ClosingPeriod).await?;
    create_table(db, &schema, AuditLog).await?;

    let period_index = Index::create()
        .name("idx_closing_periods_year_month")
        .table(ClosingPeriod)
        .col(closing_period::Column::Year)
        .col(closing_period::Column::Month)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&period_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}
