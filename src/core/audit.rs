//! Audit trail writer and reader.
//!
//! Writing is best-effort. Business operations commit their own changes first, then
//! hand the result of [`record_audit`] to [`discard_audit_failure`], which logs a
//! failed write and lets the operation return normally. Audit gaps are therefore
//! possible; rolled-back or failed business operations because of the audit log are not.

use crate::{
    core::auth::Actor,
    entities::{
        AuditLog,
        audit_log::{self, AuditAction, AuditEntity},
    },
    errors::{AuditError, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{debug, warn};

/// Page size used by [`list_audit`] when the caller does not pass one.
pub const DEFAULT_AUDIT_PAGE_SIZE: u64 = 100;

/// Outcome of a single audit write.
pub type AuditResult = std::result::Result<audit_log::Model, AuditError>;

/// One audit entry waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Acting user id
    pub actor_id: i64,
    /// Acting user display name
    pub actor_name: String,
    /// What kind of change
    pub action: AuditAction,
    /// What kind of record
    pub entity: AuditEntity,
    /// Which record
    pub entity_id: i64,
    /// One-line description for the log viewer
    pub summary: String,
    /// Submitted values, stored as JSON text
    pub detail: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Starts an entry for `actor` without a detail payload.
    #[must_use]
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: i64,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            action,
            entity,
            entity_id,
            summary: summary.into(),
            detail: None,
        }
    }

    /// Attaches a structured detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Appends one entry to the audit log with a server-assigned timestamp.
///
/// Callers inside a business operation should not `?` this result; pass it to
/// [`discard_audit_failure`] once the business change is committed.
pub async fn record_audit<C>(db: &C, entry: AuditEntry) -> AuditResult
where
    C: ConnectionTrait,
{
    let AuditEntry {
        actor_id,
        actor_name,
        action,
        entity,
        entity_id,
        summary,
        detail,
    } = entry;

    let model = audit_log::ActiveModel {
        user_id: Set(actor_id),
        user_name: Set(actor_name),
        action: Set(action),
        entity: Set(entity),
        entity_id: Set(entity_id),
        summary: Set(summary),
        detail: Set(detail.map(|value| value.to_string())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    model
        .insert(db)
        .await
        .map_err(|source| AuditError::Store {
            action,
            entity,
            entity_id,
            source,
        })
}

/// Logs a failed audit write and drops it.
///
/// Returns the written entry on success so tests and callers that care can inspect it.
pub fn discard_audit_failure(result: AuditResult) -> Option<audit_log::Model> {
    match result {
        Ok(entry) => {
            debug!(
                audit_id = entry.id,
                entity_id = entry.entity_id,
                "Audit entry recorded"
            );
            Some(entry)
        }
        Err(e) => {
            warn!(error = %e, "Audit log write failed; the business change is kept");
            None
        }
    }
}

/// Optional filters for [`list_audit`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AuditFilter {
    /// Only entries about this kind of record
    pub entity: Option<AuditEntity>,
    /// Only entries by this user
    pub actor_id: Option<i64>,
}

/// One page of audit entries plus the unpaged match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPage {
    /// Entries, newest first
    pub entries: Vec<audit_log::Model>,
    /// Number of entries matching the filter across all pages
    pub total: u64,
}

/// Lists audit entries newest first.
///
/// `limit` defaults to [`DEFAULT_AUDIT_PAGE_SIZE`]. Entries created in the same instant
/// are ordered by id, newest first.
pub async fn list_audit(
    db: &DatabaseConnection,
    filter: AuditFilter,
    limit: Option<u64>,
    offset: u64,
) -> Result<AuditPage> {
    let mut query = AuditLog::find();
    if let Some(entity) = filter.entity {
        query = query.filter(audit_log::Column::Entity.eq(entity));
    }
    if let Some(actor_id) = filter.actor_id {
        query = query.filter(audit_log::Column::UserId.eq(actor_id));
    }

    let total = query.clone().count(db).await?;
    let entries = query
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .limit(limit.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE))
        .offset(offset)
        .all(db)
        .await?;

    Ok(AuditPage { entries, total })
}
