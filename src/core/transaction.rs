//! Transaction business logic - deposits into and withdrawals from patient allowances.
//!
//! Every mutation checks the actor's role, validates the submitted values, refuses dates
//! in a closed month, and writes the transaction together with its item rows inside one
//! store transaction. The audit entry is written after the commit.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize},
        closing::ensure_period_open,
        period::YearMonth,
    },
    entities::{
        Patient, Product, Transaction, TransactionItem,
        audit_log::{AuditAction, AuditEntity},
        patient, product,
        transaction::{self, TransactionType},
        transaction_item,
        user::UserRole,
    },
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Select, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, instrument};

/// One product line submitted with an itemized withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTransactionItem {
    /// Catalog product id
    pub product_id: i64,
    /// Price per unit in minor units
    pub unit_price: i64,
    /// Number of units, at least 1
    pub quantity: i32,
}

/// Values for a new ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTransaction {
    /// Owning patient
    pub patient_id: i64,
    /// Deposit or withdrawal
    pub transaction_type: TransactionType,
    /// Positive amount in minor units
    pub amount: i64,
    /// Free-text description
    pub description: String,
    /// When the money moved
    pub date: NaiveDateTime,
    /// Product breakdown; withdrawals only
    pub items: Vec<NewTransactionItem>,
}

/// Replacement values for an existing transaction.
///
/// `items: None` keeps the stored items; `Some(vec![])` removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionUpdate {
    /// Deposit or withdrawal
    pub transaction_type: TransactionType,
    /// Positive amount in minor units
    pub amount: i64,
    /// Free-text description
    pub description: String,
    /// When the money moved
    pub date: NaiveDateTime,
    /// Replacement product breakdown
    pub items: Option<Vec<NewTransactionItem>>,
}

/// Optional filters for transaction listings and the running ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only this patient's transactions
    pub patient_id: Option<i64>,
    /// Only transactions dated inside this month
    pub period: Option<YearMonth>,
    /// Only deposits or only withdrawals
    pub transaction_type: Option<TransactionType>,
}

impl TransactionFilter {
    /// Applies the filter to a transaction query.
    pub(crate) fn apply(self, mut query: Select<Transaction>) -> Select<Transaction> {
        if let Some(patient_id) = self.patient_id {
            query = query.filter(transaction::Column::PatientId.eq(patient_id));
        }
        if let Some(period) = self.period {
            query = query.filter(transaction::Column::Date.between(period.start(), period.end()));
        }
        if let Some(tx_type) = self.transaction_type {
            query = query.filter(transaction::Column::TransactionType.eq(tx_type));
        }
        query
    }
}

/// Item line with its computed subtotal.
struct PricedItem {
    product_id: i64,
    unit_price: i64,
    quantity: i32,
    subtotal: i64,
}

/// Largest amount a single transaction may carry, in minor units.
///
/// Sums of up to nine million such amounts still fit in an `i64`, so balance and
/// report reductions cannot overflow.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 || amount > MAX_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Computes subtotals and checks that they add up to `amount`.
fn price_items(
    transaction_type: TransactionType,
    amount: i64,
    items: &[NewTransactionItem],
) -> Result<Vec<PricedItem>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    if transaction_type != TransactionType::Withdrawal {
        return Err(Error::validation("Only withdrawals can be itemized"));
    }

    let mut priced = Vec::with_capacity(items.len());
    let mut items_total: i64 = 0;
    for item in items {
        if item.quantity <= 0 {
            return Err(Error::validation(format!(
                "Item quantity must be at least 1, got {}",
                item.quantity
            )));
        }
        if item.unit_price < 0 {
            return Err(Error::validation(format!(
                "Item unit price cannot be negative, got {}",
                item.unit_price
            )));
        }
        let subtotal = item
            .unit_price
            .checked_mul(i64::from(item.quantity))
            .ok_or_else(|| Error::validation("Item subtotal is too large"))?;
        items_total = items_total
            .checked_add(subtotal)
            .ok_or_else(|| Error::validation("Item total is too large"))?;
        priced.push(PricedItem {
            product_id: item.product_id,
            unit_price: item.unit_price,
            quantity: item.quantity,
            subtotal,
        });
    }

    if items_total != amount {
        return Err(Error::ItemTotalMismatch {
            amount,
            items_total,
        });
    }
    Ok(priced)
}

async fn find_patient<C>(db: &C, patient_id: i64) -> Result<patient::Model>
where
    C: ConnectionTrait,
{
    Patient::find_by_id(patient_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Patient", patient_id))
}

async fn ensure_products_exist<C>(db: &C, items: &[PricedItem]) -> Result<()>
where
    C: ConnectionTrait,
{
    let wanted: HashSet<i64> = items.iter().map(|item| item.product_id).collect();
    if wanted.is_empty() {
        return Ok(());
    }
    let found: HashSet<i64> = Product::find()
        .filter(product::Column::Id.is_in(wanted.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    match wanted.iter().copied().filter(|id| !found.contains(id)).min() {
        Some(missing) => Err(Error::not_found("Product", missing)),
        None => Ok(()),
    }
}

async fn insert_items<C>(db: &C, transaction_id: i64, items: &[PricedItem]) -> Result<()>
where
    C: ConnectionTrait,
{
    for item in items {
        transaction_item::ActiveModel {
            transaction_id: Set(transaction_id),
            product_id: Set(item.product_id),
            unit_price: Set(item.unit_price),
            quantity: Set(item.quantity),
            subtotal: Set(item.subtotal),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn delete_items<C>(db: &C, transaction_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    TransactionItem::delete_many()
        .filter(transaction_item::Column::TransactionId.eq(transaction_id))
        .exec(db)
        .await?;
    Ok(())
}

fn describe(tx: &transaction::Model, patient: &patient::Model) -> String {
    format!(
        "{} of {} for {} ({})",
        tx.transaction_type, tx.amount, patient.name, patient.patient_code
    )
}

/// Records a deposit or withdrawal for a patient.
///
/// Itemized withdrawals must list existing products whose subtotals sum to `amount`.
///
/// # Errors
/// Validation errors for a non-positive amount, bad items or a closed month;
/// [`Error::NotFound`] for an unknown patient or product.
#[instrument(skip(db, actor, new), fields(actor_id = actor.id, patient_id = new.patient_id))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewTransaction,
) -> Result<transaction::Model> {
    authorize(actor, UserRole::Office)?;
    validate_amount(new.amount)?;
    let items = price_items(new.transaction_type, new.amount, &new.items)?;
    let detail = serde_json::to_value(&new)?;

    let txn = db.begin().await?;
    let patient = find_patient(&txn, new.patient_id).await?;
    ensure_period_open(&txn, new.date).await?;
    ensure_products_exist(&txn, &items).await?;

    let now = chrono::Utc::now();
    let created = transaction::ActiveModel {
        patient_id: Set(new.patient_id),
        transaction_type: Set(new.transaction_type),
        amount: Set(new.amount),
        description: Set(new.description.clone()),
        date: Set(new.date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    insert_items(&txn, created.id, &items).await?;
    txn.commit().await?;

    info!(
        "Recorded {} of {} for patient {}",
        created.transaction_type, created.amount, patient.patient_code
    );
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::Transaction,
                created.id,
                format!("Recorded {}", describe(&created, &patient)),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(created)
}

/// Replaces the values of an existing transaction.
///
/// Both the stored date and the new date must fall in open months. When `items` is
/// `None` the stored items are kept and must still add up to the new amount.
#[instrument(skip(db, actor, update), fields(actor_id = actor.id))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    actor: &Actor,
    transaction_id: i64,
    update: TransactionUpdate,
) -> Result<transaction::Model> {
    authorize(actor, UserRole::Office)?;
    validate_amount(update.amount)?;
    let replacement = match &update.items {
        Some(items) => Some(price_items(update.transaction_type, update.amount, items)?),
        None => None,
    };
    let detail = serde_json::to_value(&update)?;

    let txn = db.begin().await?;
    let existing = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Transaction", transaction_id))?;
    ensure_period_open(&txn, existing.date).await?;
    ensure_period_open(&txn, update.date).await?;

    match &replacement {
        Some(items) => ensure_products_exist(&txn, items).await?,
        None => {
            let kept = TransactionItem::find()
                .filter(transaction_item::Column::TransactionId.eq(transaction_id))
                .all(&txn)
                .await?;
            if !kept.is_empty() {
                if update.transaction_type != TransactionType::Withdrawal {
                    return Err(Error::validation("Only withdrawals can be itemized"));
                }
                let items_total: i64 = kept.iter().map(|item| item.subtotal).sum();
                if items_total != update.amount {
                    return Err(Error::ItemTotalMismatch {
                        amount: update.amount,
                        items_total,
                    });
                }
            }
        }
    }
    let patient = find_patient(&txn, existing.patient_id).await?;

    let mut active: transaction::ActiveModel = existing.into();
    active.transaction_type = Set(update.transaction_type);
    active.amount = Set(update.amount);
    active.description = Set(update.description.clone());
    active.date = Set(update.date);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    if let Some(items) = &replacement {
        delete_items(&txn, transaction_id).await?;
        insert_items(&txn, transaction_id, items).await?;
    }
    txn.commit().await?;

    info!("Updated transaction {transaction_id}");
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::Transaction,
                transaction_id,
                format!("Updated {}", describe(&updated, &patient)),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(updated)
}

/// Deletes a transaction and its items.
///
/// # Errors
/// [`Error::NotFound`] for an unknown id, [`Error::PeriodClosed`] when its month is closed.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    actor: &Actor,
    transaction_id: i64,
) -> Result<()> {
    authorize(actor, UserRole::Office)?;

    let txn = db.begin().await?;
    let existing = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Transaction", transaction_id))?;
    ensure_period_open(&txn, existing.date).await?;
    let patient = find_patient(&txn, existing.patient_id).await?;

    let summary = format!("Deleted {}", describe(&existing, &patient));
    let detail = json!({
        "patient_id": existing.patient_id,
        "transaction_type": existing.transaction_type,
        "amount": existing.amount,
        "description": existing.description,
        "date": existing.date,
    });

    delete_items(&txn, transaction_id).await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    info!("Deleted transaction {transaction_id}");
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditEntity::Transaction,
                transaction_id,
                summary,
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(())
}

/// Looks up a transaction by id.
pub async fn get_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Item rows of a transaction in insertion order.
pub async fn get_transaction_items(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Vec<transaction_item::Model>> {
    TransactionItem::find()
        .filter(transaction_item::Column::TransactionId.eq(transaction_id))
        .order_by_asc(transaction_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Transactions matching `filter`, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    filter: TransactionFilter,
) -> Result<Vec<transaction::Model>> {
    filter
        .apply(Transaction::find())
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
