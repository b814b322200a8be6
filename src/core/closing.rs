//! Closing period registry.
//!
//! Closing a month freezes it for reporting: transaction mutations dated inside a
//! closed month are rejected by [`ensure_period_open`]. Closing is idempotent and a
//! second close of the same month keeps the original record.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize},
        period::YearMonth,
    },
    entities::{
        ClosingPeriod,
        audit_log::{AuditAction, AuditEntity},
        closing_period,
        user::UserRole,
    },
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};
use serde_json::json;
use tracing::{info, instrument};

/// Inserts the closing row unless the month already has one.
///
/// Returns whether this call created the row. A concurrent close of the same month
/// loses on the unique (year, month) index and sees `false`.
async fn insert_if_absent<C>(db: &C, period: YearMonth, closed_by: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let row = closing_period::ActiveModel {
        year: Set(period.year()),
        month: Set(period.month()),
        closed_by: Set(closed_by),
        closed_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let inserted = ClosingPeriod::insert(row)
        .on_conflict(
            OnConflict::columns([closing_period::Column::Year, closing_period::Column::Month])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

async fn find_period<C>(db: &C, period: YearMonth) -> Result<Option<closing_period::Model>>
where
    C: ConnectionTrait,
{
    ClosingPeriod::find()
        .filter(closing_period::Column::Year.eq(period.year()))
        .filter(closing_period::Column::Month.eq(period.month()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Marks `year`/`month` as closed by `actor`.
///
/// Re-closing an already closed month is a no-op that returns the existing record;
/// `closed_by` and `closed_at` are not overwritten and no audit entry is written.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn close_period(
    db: &DatabaseConnection,
    actor: &Actor,
    year: i32,
    month: u32,
) -> Result<closing_period::Model> {
    authorize(actor, UserRole::Admin)?;
    let period = YearMonth::new(year, month)?;

    let inserted = insert_if_absent(db, period, actor.id).await?;
    let closed = find_period(db, period)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "ClosingPeriod",
            id: period.to_string(),
        })?;
    if !inserted {
        info!("Period {period} already closed by user {}", closed.closed_by);
        return Ok(closed);
    }

    info!("Closed period {period}");
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::ClosingPeriod,
                closed.id,
                format!("Closed period {period}"),
            )
            .with_detail(json!({ "year": year, "month": month })),
        )
        .await,
    );
    Ok(closed)
}

/// Whether `period` has been closed.
pub async fn is_period_closed<C>(db: &C, period: YearMonth) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(find_period(db, period).await?.is_some())
}

/// Rejects a change dated `at` when its month is closed.
///
/// # Errors
/// Returns [`Error::PeriodClosed`] for a closed month.
pub async fn ensure_period_open<C>(db: &C, at: NaiveDateTime) -> Result<()>
where
    C: ConnectionTrait,
{
    let period = YearMonth::containing(at.date())?;
    if is_period_closed(db, period).await? {
        return Err(Error::PeriodClosed {
            year: period.year(),
            month: period.month(),
        });
    }
    Ok(())
}

/// All closed months, most recent first.
pub async fn list_closed_periods(db: &DatabaseConnection) -> Result<Vec<closing_period::Model>> {
    ClosingPeriod::find()
        .order_by_desc(closing_period::Column::Year)
        .order_by_desc(closing_period::Column::Month)
        .all(db)
        .await
        .map_err(Into::into)
}
