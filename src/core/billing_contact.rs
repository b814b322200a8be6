//! Billing contact records - notes of calls or letters to a patient's family about charges.
//!
//! These are informational only and never touch the ledger.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize},
        required_text,
    },
    entities::{
        BillingContact, Patient,
        audit_log::{AuditAction, AuditEntity},
        billing_contact,
        user::UserRole,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

/// Values for a new billing contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBillingContact {
    /// Patient the contact concerns
    pub patient_id: i64,
    /// Day the contact was made
    pub contact_date: NaiveDate,
    /// How, e.g. "phone" or "letter"
    pub method: String,
    /// Who was contacted
    pub recipient: String,
    /// Amount requested in minor units
    pub amount: i64,
    /// What was said
    pub content: String,
    /// Follow-up state, e.g. "pending"
    pub status: String,
}

/// Records a contact with a patient's family.
#[instrument(skip(db, actor, new), fields(actor_id = actor.id, patient_id = new.patient_id))]
pub async fn record_billing_contact(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewBillingContact,
) -> Result<billing_contact::Model> {
    authorize(actor, UserRole::Office)?;
    let method = required_text("method", &new.method)?;
    let status = required_text("status", &new.status)?;
    if new.amount < 0 {
        return Err(Error::InvalidAmount { amount: new.amount });
    }
    let detail = serde_json::to_value(&new)?;

    let txn = db.begin().await?;
    let patient = Patient::find_by_id(new.patient_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Patient", new.patient_id))?;
    let now = chrono::Utc::now();
    let created = billing_contact::ActiveModel {
        patient_id: Set(new.patient_id),
        contact_date: Set(new.contact_date),
        method: Set(method),
        recipient: Set(new.recipient.trim().to_string()),
        amount: Set(new.amount),
        content: Set(new.content),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!("Recorded billing contact for patient {}", patient.patient_code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::BillingContact,
                created.id,
                format!(
                    "Recorded {} contact for {} ({})",
                    created.method, patient.name, patient.patient_code
                ),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(created)
}

/// Moves a billing contact to a new follow-up status.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn update_billing_contact_status(
    db: &DatabaseConnection,
    actor: &Actor,
    contact_id: i64,
    status: &str,
) -> Result<billing_contact::Model> {
    authorize(actor, UserRole::Office)?;
    let status = required_text("status", status)?;

    let txn = db.begin().await?;
    let existing = BillingContact::find_by_id(contact_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("BillingContact", contact_id))?;
    let old_status = existing.status.clone();
    let mut active: billing_contact::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::BillingContact,
                updated.id,
                format!("Billing contact status {old_status} -> {}", updated.status),
            )
            .with_detail(json!({ "old_status": old_status, "status": updated.status })),
        )
        .await,
    );
    Ok(updated)
}

/// A patient's billing contacts, newest first.
pub async fn list_billing_contacts(
    db: &DatabaseConnection,
    patient_id: i64,
) -> Result<Vec<billing_contact::Model>> {
    BillingContact::find()
        .filter(billing_contact::Column::PatientId.eq(patient_id))
        .order_by_desc(billing_contact::Column::ContactDate)
        .order_by_desc(billing_contact::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn contact(patient_id: i64, day: u32) -> NewBillingContact {
        NewBillingContact {
            patient_id,
            contact_date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            method: "phone".to_string(),
            recipient: "Daughter".to_string(),
            amount: 12000,
            content: "January hospital charges".to_string(),
            status: "pending".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_and_list_contacts() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let clerk = office_actor();
        record_billing_contact(&db, &clerk, contact(patient.id, 5)).await?;
        record_billing_contact(&db, &clerk, contact(patient.id, 20)).await?;

        let contacts = list_billing_contacts(&db, patient.id).await?;
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].contact_date.to_string(), "2026-01-20");
        assert!(list_billing_contacts(&db, patient.id + 1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_contact_validation() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let mut bad = contact(patient.id, 5);
        bad.amount = -1;
        let result = record_billing_contact(&db, &office_actor(), bad).await;
        assert!(result.unwrap_err().is_validation());

        let result = record_billing_contact(&db, &office_actor(), contact(404, 5)).await;
        assert!(result.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_status() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let created = record_billing_contact(&db, &office_actor(), contact(patient.id, 5)).await?;

        let updated =
            update_billing_contact_status(&db, &office_actor(), created.id, "paid").await?;
        assert_eq!(updated.status, "paid");

        let result = update_billing_contact_status(&db, &office_actor(), created.id, " ").await;
        assert!(result.unwrap_err().is_validation());
        Ok(())
    }
}
