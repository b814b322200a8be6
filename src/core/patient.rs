//! Patient registry - registration, edits, discharge and logical deletion.
//!
//! Patients are never removed from the store. Discharge and deletion both clear
//! `is_active`, which hides the patient from the month-end report while keeping the
//! transaction history intact.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize},
        required_text,
    },
    entities::{
        Patient,
        audit_log::{AuditAction, AuditEntity},
        patient,
        user::UserRole,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

/// Values for registering a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPatient {
    /// Unique business code
    pub patient_code: String,
    /// Full name
    pub name: String,
    /// Phonetic reading of the name
    pub name_kana: String,
    /// Ward name
    pub ward_name: String,
    /// Room number
    pub room_number: String,
    /// Admission date
    pub admitted_at: Option<NaiveDate>,
    /// Office note
    pub note: String,
}

/// Replacement values for an existing patient.
///
/// A present `discharged_at` marks the patient as discharged (inactive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientUpdate {
    /// Unique business code
    pub patient_code: String,
    /// Full name
    pub name: String,
    /// Phonetic reading of the name
    pub name_kana: String,
    /// Ward name
    pub ward_name: String,
    /// Room number
    pub room_number: String,
    /// Admission date
    pub admitted_at: Option<NaiveDate>,
    /// Discharge date
    pub discharged_at: Option<NaiveDate>,
    /// Office note
    pub note: String,
}

async fn ensure_code_free<C>(db: &C, code: &str, except_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Patient::find().filter(patient::Column::PatientCode.eq(code));
    if let Some(id) = except_id {
        query = query.filter(patient::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::DuplicateKey {
            entity: "Patient",
            field: "patient_code",
            value: code.to_string(),
        });
    }
    Ok(())
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

/// Registers a new inpatient.
///
/// # Errors
/// Validation errors for an empty code, name or kana and for a code already in use.
#[instrument(skip(db, actor, new), fields(actor_id = actor.id, patient_code = %new.patient_code))]
pub async fn register_patient(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewPatient,
) -> Result<patient::Model> {
    authorize(actor, UserRole::Office)?;
    let code = required_text("patient_code", &new.patient_code)?;
    let name = required_text("name", &new.name)?;
    let name_kana = required_text("name_kana", &new.name_kana)?;
    let detail = serde_json::to_value(&new)?;

    let txn = db.begin().await?;
    ensure_code_free(&txn, &code, None).await?;
    let now = chrono::Utc::now();
    let created = patient::ActiveModel {
        patient_code: Set(code),
        name: Set(name),
        name_kana: Set(name_kana),
        ward_name: Set(new.ward_name.trim().to_string()),
        room_number: Set(new.room_number.trim().to_string()),
        admitted_at: Set(new.admitted_at),
        discharged_at: Set(None),
        note: Set(new.note),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!("Registered patient {}", created.patient_code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::Patient,
                created.id,
                format!("Registered patient {} ({})", created.name, created.patient_code),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(created)
}

/// Replaces a patient's details.
#[instrument(skip(db, actor, update), fields(actor_id = actor.id))]
pub async fn update_patient(
    db: &DatabaseConnection,
    actor: &Actor,
    patient_id: i64,
    update: PatientUpdate,
) -> Result<patient::Model> {
    authorize(actor, UserRole::Office)?;
    let code = required_text("patient_code", &update.patient_code)?;
    let name = required_text("name", &update.name)?;
    let name_kana = required_text("name_kana", &update.name_kana)?;
    let detail = serde_json::to_value(&update)?;

    let txn = db.begin().await?;
    let existing = find_patient(&txn, patient_id).await?;
    ensure_code_free(&txn, &code, Some(patient_id)).await?;

    let mut active: patient::ActiveModel = existing.into();
    active.patient_code = Set(code);
    active.name = Set(name);
    active.name_kana = Set(name_kana);
    active.ward_name = Set(update.ward_name.trim().to_string());
    active.room_number = Set(update.room_number.trim().to_string());
    active.admitted_at = Set(update.admitted_at);
    active.discharged_at = Set(update.discharged_at);
    active.is_active = Set(update.discharged_at.is_none());
    active.note = Set(update.note);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Updated patient {}", updated.patient_code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::Patient,
                updated.id,
                format!("Updated patient {} ({})", updated.name, updated.patient_code),
            )
            .with_detail(detail),
        )
        .await,
    );
    Ok(updated)
}

/// Flips a patient between inpatient and discharged.
///
/// Discharging records `on` as the discharge date; readmitting clears it.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn toggle_patient_status(
    db: &DatabaseConnection,
    actor: &Actor,
    patient_id: i64,
    on: NaiveDate,
) -> Result<patient::Model> {
    authorize(actor, UserRole::Office)?;

    let txn = db.begin().await?;
    let existing = find_patient(&txn, patient_id).await?;
    let discharging = existing.is_active;

    let mut active: patient::ActiveModel = existing.into();
    active.is_active = Set(!discharging);
    active.discharged_at = Set(discharging.then_some(on));
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    let verb = if discharging { "Discharged" } else { "Readmitted" };
    info!("{verb} patient {}", updated.patient_code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::Patient,
                updated.id,
                format!("{verb} patient {} ({})", updated.name, updated.patient_code),
            )
            .with_detail(json!({ "is_active": updated.is_active, "discharged_at": updated.discharged_at })),
        )
        .await,
    );
    Ok(updated)
}

/// Logically deletes a patient.
///
/// The row and its transactions stay in the store; the patient just stops being active.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn deactivate_patient(
    db: &DatabaseConnection,
    actor: &Actor,
    patient_id: i64,
) -> Result<patient::Model> {
    authorize(actor, UserRole::Office)?;

    let txn = db.begin().await?;
    let existing = find_patient(&txn, patient_id).await?;
    let mut active: patient::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Deactivated patient {}", updated.patient_code);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditEntity::Patient,
                updated.id,
                format!("Deleted patient {} ({})", updated.name, updated.patient_code),
            ),
        )
        .await,
    );
    Ok(updated)
}

/// Looks up a patient by id.
pub async fn get_patient(db: &DatabaseConnection, patient_id: i64) -> Result<Option<patient::Model>> {
    Patient::find_by_id(patient_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists patients ordered by code.
///
/// `search` matches a substring of the name, kana or code.
pub async fn list_patients(
    db: &DatabaseConnection,
    active_only: bool,
    search: Option<&str>,
) -> Result<Vec<patient::Model>> {
    let mut query = Patient::find();
    if active_only {
        query = query.filter(patient::Column::IsActive.eq(true));
    }
    if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(patient::Column::Name.contains(term))
                .add(patient::Column::NameKana.contains(term))
                .add(patient::Column::PatientCode.contains(term)),
        );
    }
    query
        .order_by_asc(patient::Column::PatientCode)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::audit::{AuditFilter, list_audit};
    use crate::test_utils::*;

    fn new_patient(code: &str, name: &str, kana: &str) -> NewPatient {
        NewPatient {
            patient_code: code.to_string(),
            name: name.to_string(),
            name_kana: kana.to_string(),
            ward_name: "3F East".to_string(),
            room_number: "301".to_string(),
            admitted_at: NaiveDate::from_ymd_opt(2025, 11, 3),
            note: String::new(),
        }
    }

    fn update_from(p: &patient::Model) -> PatientUpdate {
        PatientUpdate {
            patient_code: p.patient_code.clone(),
            name: p.name.clone(),
            name_kana: p.name_kana.clone(),
            ward_name: p.ward_name.clone(),
            room_number: p.room_number.clone(),
            admitted_at: p.admitted_at,
            discharged_at: p.discharged_at,
            note: p.note.clone(),
        }
    }

    #[tokio::test]
    async fn test_register_patient() -> Result<()> {
        let db = setup_test_db().await?;
        let created = register_patient(
            &db,
            &office_actor(),
            new_patient(" P-010 ", "Hanako Sato", "Sato Hanako"),
        )
        .await?;
        assert_eq!(created.patient_code, "P-010");
        assert!(created.is_active);
        assert!(created.discharged_at.is_none());

        let audit = list_audit(
            &db,
            AuditFilter {
                entity: Some(AuditEntity::Patient),
                actor_id: None,
            },
            None,
            0,
        )
        .await?;
        assert_eq!(audit.total, 1);
        assert_eq!(audit.entries[0].action, AuditAction::Create);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_patient_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = register_patient(&db, &office_actor(), new_patient("P-1", "  ", "x")).await;
        assert!(result.unwrap_err().is_validation());

        register_patient(&db, &office_actor(), new_patient("P-1", "A", "a")).await?;
        let result = register_patient(&db, &office_actor(), new_patient("P-1", "B", "b")).await;
        assert!(matches!(
            result,
            Err(Error::DuplicateKey {
                field: "patient_code",
                ..
            })
        ));
        assert_eq!(Patient::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_patient_with_discharge_date_deactivates() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let mut update = update_from(&patient);
        update.room_number = "402".to_string();
        update.discharged_at = NaiveDate::from_ymd_opt(2026, 2, 10);

        let updated = update_patient(&db, &office_actor(), patient.id, update).await?;
        assert_eq!(updated.room_number, "402");
        assert!(!updated.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_patient_duplicate_code_excludes_self() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let other = create_test_patient(&db, "P-002").await?;

        update_patient(&db, &office_actor(), patient.id, update_from(&patient)).await?;

        let mut update = update_from(&other);
        update.patient_code = patient.patient_code.clone();
        let result = update_patient(&db, &office_actor(), other.id, update).await;
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_patient_status() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let day = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();

        let discharged = toggle_patient_status(&db, &office_actor(), patient.id, day).await?;
        assert!(!discharged.is_active);
        assert_eq!(discharged.discharged_at, Some(day));

        let readmitted = toggle_patient_status(&db, &office_actor(), patient.id, day).await?;
        assert!(readmitted.is_active);
        assert!(readmitted.discharged_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_keeps_row() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        deactivate_patient(&db, &office_actor(), patient.id).await?;

        let stored = get_patient(&db, patient.id).await?.unwrap();
        assert!(!stored.is_active);
        assert!(list_patients(&db, true, None).await?.is_empty());
        assert_eq!(list_patients(&db, false, None).await?.len(), 1);

        let result = deactivate_patient(&db, &office_actor(), 999).await;
        assert!(result.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_patients_search() -> Result<()> {
        let db = setup_test_db().await?;
        let clerk = office_actor();
        register_patient(&db, &clerk, new_patient("P-002", "Taro Yamada", "Yamada Taro")).await?;
        register_patient(&db, &clerk, new_patient("P-001", "Jiro Suzuki", "Suzuki Jiro")).await?;
        register_patient(&db, &clerk, new_patient("Q-100", "Ken Yamamoto", "Yamamoto Ken")).await?;

        let codes = |patients: Vec<patient::Model>| -> Vec<String> {
            patients.into_iter().map(|p| p.patient_code).collect()
        };
        assert_eq!(
            codes(list_patients(&db, false, Some("Yama")).await?),
            vec!["P-002", "Q-100"]
        );
        assert_eq!(codes(list_patients(&db, false, Some("P-")).await?), vec!["P-001", "P-002"]);
        assert_eq!(codes(list_patients(&db, false, Some("  ")).await?).len(), 3);
        Ok(())
    }
}
