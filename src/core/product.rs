//! Product catalog business logic - Handles the shop items used in itemized withdrawals.
//!
//! Products are reference data maintained by administrators. A product's default price
//! only pre-fills a withdrawal item; the item row stores its own unit price, so editing
//! or retiring a product never changes past transactions.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize},
        required_text,
    },
    entities::{
        Product,
        audit_log::{AuditAction, AuditEntity},
        product,
        user::UserRole,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Values for a catalog product, used for both creation and updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInput {
    /// Unique product code
    pub code: String,
    /// Display name
    pub name: String,
    /// Catalog category
    pub category: String,
    /// Default unit price in minor units
    pub default_price: i64,
}

struct ValidProduct {
    code: String,
    name: String,
    category: String,
    default_price: i64,
}

fn validate(input: &ProductInput) -> Result<ValidProduct> {
    let code = required_text("code", &input.code)?;
    let name = required_text("name", &input.name)?;
    if input.default_price < 0 {
        return Err(Error::InvalidAmount {
            amount: input.default_price,
        });
    }
    Ok(ValidProduct {
        code,
        name,
        category: input.category.trim().to_string(),
        default_price: input.default_price,
    })
}

async fn ensure_code_free<C>(db: &C, code: &str, except_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Product::find().filter(product::Column::Code.eq(code));
    if let Some(id) = except_id {
        query = query.filter(product::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::DuplicateKey {
            entity: "Product",
            field: "code",
            value: code.to_string(),
        });
    }
    Ok(())
}

/// Adds a product to the catalog.
///
/// The code and name are trimmed and must not be empty; the price must not be negative.
///
/// # Errors
/// Returns an error if:
/// - The actor is not an administrator
/// - The code or name is empty, or the price is negative
/// - Another product already uses the code
/// - The database insert fails
#[instrument(skip(db, actor, input), fields(actor_id = actor.id, code = %input.code))]
pub async fn create_product(
    db: &DatabaseConnection,
    actor: &Actor,
    input: ProductInput,
) -> Result<product::Model> {
    authorize(actor, UserRole::Admin)?;
    let valid = validate(&input)?;
    let detail = serde_json::to_value(&input)?;

    let txn = db.begin().await?;
    ensure_code_free(&txn, &valid.code, None).await?;
    let now = chrono::Utc::now();
    let created = product::ActiveModel {
        code: Set(valid.code),
        name: Set(valid.name),
        category: Set(valid.category),
        default_price: Set(valid.default_price),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!("Created product {} ({})", created.name, created.code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::Product,
                created.id,
                format!("Created product {} ({})", created.name, created.code),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(created)
}

/// Replaces a product's code, name, category and default price.
///
/// # Errors
/// Returns an error if:
/// - The actor is not an administrator
/// - The input fails the same checks as [`create_product`]
/// - The product does not exist
/// - Another product already uses the new code
#[instrument(skip(db, actor, input), fields(actor_id = actor.id))]
pub async fn update_product(
    db: &DatabaseConnection,
    actor: &Actor,
    product_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    authorize(actor, UserRole::Admin)?;
    let valid = validate(&input)?;
    let detail = serde_json::to_value(&input)?;

    let txn = db.begin().await?;
    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?
        .into();
    ensure_code_free(&txn, &valid.code, Some(product_id)).await?;

    product.code = Set(valid.code);
    product.name = Set(valid.name);
    product.category = Set(valid.category);
    product.default_price = Set(valid.default_price);
    product.updated_at = Set(chrono::Utc::now());
    let updated = product.update(&txn).await?;
    txn.commit().await?;

    info!("Updated product {}", updated.code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::Product,
                updated.id,
                format!("Updated product {} ({})", updated.name, updated.code),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(updated)
}

/// Retires a product from the catalog while preserving the item rows that reference it.
///
/// # Errors
/// Returns an error if the actor is not an administrator or the product does not exist.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn deactivate_product(
    db: &DatabaseConnection,
    actor: &Actor,
    product_id: i64,
) -> Result<product::Model> {
    authorize(actor, UserRole::Admin)?;

    let txn = db.begin().await?;
    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?
        .into();
    product.is_active = Set(false);
    product.updated_at = Set(chrono::Utc::now());
    let updated = product.update(&txn).await?;
    txn.commit().await?;

    info!("Deactivated product {}", updated.code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditEntity::Product,
                updated.id,
                format!("Deactivated product {} ({})", updated.name, updated.code),
            ),
        )
        .await,
    );
    Ok(updated)
}

/// Retrieves catalog products ordered by code.
///
/// With `active_only` retired products are left out, which is what withdrawal forms want.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_products(db: &DatabaseConnection, active_only: bool) -> Result<Vec<product::Model>> {
    let mut query = Product::find();
    if active_only {
        query = query.filter(product::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(product::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn input(code: &str, name: &str, price: i64) -> ProductInput {
        ProductInput {
            code: code.to_string(),
            name: name.to_string(),
            category: "drinks".to_string(),
            default_price: price,
        }
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        // Validation fails before the store is touched
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let admin = admin_actor();

        let result = create_product(&db, &admin, input("", "Tea", 160)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_product(&db, &admin, input("D-01", "   ", 160)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_product(&db, &admin, input("D-01", "Tea", -1)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -1 }
        ));

        let result = create_product(&db, &office_actor(), input("D-01", "Tea", 160)).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_product(&db, &admin_actor(), input(" D-01 ", "Green tea", 160)).await?;

        assert_eq!(product.code, "D-01");
        assert_eq!(product.name, "Green tea");
        assert_eq!(product.category, "drinks");
        assert_eq!(product.default_price, 160);
        assert!(product.is_active);

        let result = create_product(&db, &admin_actor(), input("D-01", "Other", 1)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicateKey { field: "code", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();
        let product = create_product(&db, &admin, input("D-01", "Green tea", 160)).await?;

        let updated = update_product(&db, &admin, product.id, input("D-01", "Barley tea", 150)).await?;
        assert_eq!(updated.name, "Barley tea");
        assert_eq!(updated.default_price, 150);

        let retrieved = Product::find_by_id(product.id).one(&db).await?.unwrap();
        assert_eq!(retrieved, updated);

        let result = update_product(&db, &admin, 999, input("X", "X", 1)).await;
        assert!(result.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_product_hides_from_active_list() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();
        let tea = create_product(&db, &admin, input("D-02", "Tea", 160)).await?;
        create_product(&db, &admin, input("D-01", "Water", 100)).await?;

        let retired = deactivate_product(&db, &admin, tea.id).await?;
        assert!(!retired.is_active);

        let active: Vec<String> = list_products(&db, true)
            .await?
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(active, vec!["D-01"]);
        let all: Vec<String> = list_products(&db, false)
            .await?
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(all, vec!["D-01", "D-02"]);
        Ok(())
    }
}
