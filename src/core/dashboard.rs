//! Dashboard figures for the office's landing screen.

use crate::{
    core::{
        balance::{MonthlyTotals, monthly_totals},
        period::YearMonth,
    },
    entities::{Patient, Transaction, patient, transaction},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};

/// Number of transactions shown in [`DashboardSummary::recent_transactions`].
pub const RECENT_TRANSACTION_COUNT: u64 = 10;

/// A recent transaction with the patient it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentTransaction {
    /// The transaction
    pub transaction: transaction::Model,
    /// Owning patient's code, empty if the patient row is missing
    pub patient_code: String,
    /// Owning patient's name, empty if the patient row is missing
    pub patient_name: String,
}

/// Headline figures for one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    /// Month the period figures cover
    pub period: YearMonth,
    /// Patients currently admitted
    pub active_patients: u64,
    /// All registered patients
    pub total_patients: u64,
    /// Signed sum of every transaction ever recorded
    pub total_balance: i64,
    /// Deposits and withdrawals inside `period`
    pub month_totals: MonthlyTotals,
    /// Number of transactions inside `period`
    pub month_transaction_count: usize,
    /// Latest transactions by date, newest first
    pub recent_transactions: Vec<RecentTransaction>,
}

/// Collects the dashboard figures for `period`.
pub async fn dashboard_summary(db: &DatabaseConnection, period: YearMonth) -> Result<DashboardSummary> {
    let active_patients = Patient::find()
        .filter(patient::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let total_patients = Patient::find().count(db).await?;

    let all = Transaction::find().all(db).await?;
    let total_balance = all
        .iter()
        .map(|tx| tx.transaction_type.signed(tx.amount))
        .sum();
    let month_totals = monthly_totals(&all, period);
    let month_transaction_count = all.iter().filter(|tx| period.contains(tx.date)).count();

    let recent_transactions = Transaction::find()
        .find_also_related(Patient)
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .limit(RECENT_TRANSACTION_COUNT)
        .all(db)
        .await?
        .into_iter()
        .map(|(tx, owner)| {
            let (patient_code, patient_name) =
                owner.map_or_else(Default::default, |p| (p.patient_code, p.name));
            RecentTransaction {
                transaction: tx,
                patient_code,
                patient_name,
            }
        })
        .collect();

    Ok(DashboardSummary {
        period,
        active_patients,
        total_patients,
        total_balance,
        month_totals,
        month_transaction_count,
        recent_transactions,
    })
}
