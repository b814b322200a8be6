//! Ward reference data.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize},
        required_text,
    },
    entities::{
        Ward,
        audit_log::{AuditAction, AuditEntity},
        user::UserRole,
        ward,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::{info, instrument};

async fn ensure_name_free<C>(db: &C, name: &str, except_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Ward::find().filter(ward::Column::Name.eq(name));
    if let Some(id) = except_id {
        query = query.filter(ward::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::DuplicateKey {
            entity: "Ward",
            field: "name",
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Adds a ward. Requires the admin role.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn create_ward(db: &DatabaseConnection, actor: &Actor, name: &str) -> Result<ward::Model> {
    authorize(actor, UserRole::Admin)?;
    let name = required_text("name", name)?;

    let txn = db.begin().await?;
    ensure_name_free(&txn, &name, None).await?;
    let now = chrono::Utc::now();
    let created = ward::ActiveModel {
        name: Set(name),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!("Created ward {}", created.name);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::Ward,
                created.id,
                format!("Created ward {}", created.name),
            )
            .with_detail(json!({ "name": created.name })),
        )
        .await,
    );
    Ok(created)
}

/// Renames a ward; the new name must not belong to another ward.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn rename_ward(
    db: &DatabaseConnection,
    actor: &Actor,
    ward_id: i64,
    name: &str,
) -> Result<ward::Model> {
    authorize(actor, UserRole::Admin)?;
    let name = required_text("name", name)?;

    let txn = db.begin().await?;
    let existing = Ward::find_by_id(ward_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Ward", ward_id))?;
    ensure_name_free(&txn, &name, Some(ward_id)).await?;
    let old_name = existing.name.clone();

    let mut active: ward::ActiveModel = existing.into();
    active.name = Set(name);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Renamed ward {old_name} to {}", updated.name);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::Ward,
                updated.id,
                format!("Renamed ward {old_name} to {}", updated.name),
            )
            .with_detail(json!({ "old_name": old_name, "name": updated.name })),
        )
        .await,
    );
    Ok(updated)
}

/// Retires a ward. The row is kept so existing patient records still read correctly.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn deactivate_ward(
    db: &DatabaseConnection,
    actor: &Actor,
    ward_id: i64,
) -> Result<ward::Model> {
    authorize(actor, UserRole::Admin)?;

    let txn = db.begin().await?;
    let existing = Ward::find_by_id(ward_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Ward", ward_id))?;
    let mut active: ward::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Deactivated ward {}", updated.name);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditEntity::Ward,
                updated.id,
                format!("Deactivated ward {}", updated.name),
            ),
        )
        .await,
    );
    Ok(updated)
}

/// Wards ordered by name.
pub async fn list_wards(db: &DatabaseConnection, active_only: bool) -> Result<Vec<ward::Model>> {
    let mut query = Ward::find();
    if active_only {
        query = query.filter(ward::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(ward::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}
