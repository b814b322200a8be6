//! Reference data loading from config.toml
//!
//! Wards and the shop product catalog can be listed in a TOML file. On start-up the
//! entries that are not yet in the database are inserted; existing rows (matched by
//! ward name or product code) are left alone so edits made through the application win.

use crate::entities::{Product, Ward, product, ward};
use crate::errors::{Error, Result};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct ReferenceData {
    /// Wards to seed
    #[serde(default)]
    pub wards: Vec<WardConfig>,
    /// Catalog products to seed
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Configuration for a single ward
#[derive(Debug, Deserialize, Clone)]
pub struct WardConfig {
    /// Ward display name
    pub name: String,
}

/// Configuration for a single catalog product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Unique product code
    pub code: String,
    /// Product name
    pub name: String,
    /// Catalog category
    #[serde(default)]
    pub category: String,
    /// Default unit price in minor units
    pub default_price: i64,
}

/// Counts of rows inserted by [`seed_reference_data`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// Wards inserted
    pub wards_inserted: usize,
    /// Products inserted
    pub products_inserted: usize,
}

/// Loads reference data from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReferenceData> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads reference data from `WARD_LEDGER_CONFIG`, or `./config.toml` when unset.
///
/// A missing default file is not an error: the application runs with an empty
/// catalog and wards can be added later.
pub fn load_default_config() -> Result<ReferenceData> {
    if let Ok(path) = std::env::var("WARD_LEDGER_CONFIG") {
        return load_config(path);
    }
    let default_path = Path::new("config.toml");
    if default_path.exists() {
        load_config(default_path)
    } else {
        debug!("No config.toml found; starting without reference data.");
        Ok(ReferenceData::default())
    }
}

/// Inserts every configured ward and product that is not already present.
pub async fn seed_reference_data(
    db: &DatabaseConnection,
    data: &ReferenceData,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let now = chrono::Utc::now();

    for ward_config in &data.wards {
        let existing = Ward::find()
            .filter(ward::Column::Name.eq(ward_config.name.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }
        ward::ActiveModel {
            name: Set(ward_config.name.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        summary.wards_inserted += 1;
    }

    for product_config in &data.products {
        if product_config.default_price < 0 {
            return Err(Error::InvalidAmount {
                amount: product_config.default_price,
            });
        }
        let existing = Product::find()
            .filter(product::Column::Code.eq(product_config.code.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }
        product::ActiveModel {
            code: Set(product_config.code.clone()),
            name: Set(product_config.name.clone()),
            category: Set(product_config.category.clone()),
            default_price: Set(product_config.default_price),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        summary.products_inserted += 1;
    }

    info!(
        "Seeded reference data: {} wards, {} products inserted",
        summary.wards_inserted, summary.products_inserted
    );
    Ok(summary)
}
