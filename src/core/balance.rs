//! Balance aggregation - running balances and month-bounded totals.
//!
//! A patient's balance is the signed sum of their transactions: deposits add,
//! withdrawals subtract. Nothing is stored; every figure is recomputed from the
//! ledger, so a corrected or deleted transaction is reflected immediately.

use crate::{
    core::period::{YearMonth, end_of_day},
    entities::{Patient, Transaction, patient, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::HashMap;
use tracing::debug;

/// Deposit and withdrawal totals for one month.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyTotals {
    /// Sum of deposit amounts
    pub deposit: i64,
    /// Sum of withdrawal amounts
    pub withdrawal: i64,
}

impl MonthlyTotals {
    /// Net movement over the month.
    #[must_use]
    pub const fn net(&self) -> i64 {
        self.deposit - self.withdrawal
    }
}

/// Balance of `transactions` as of `as_of` (inclusive).
///
/// Order does not matter; transactions dated after `as_of` are ignored.
#[must_use]
pub fn balance_as_of(transactions: &[transaction::Model], as_of: NaiveDateTime) -> i64 {
    transactions
        .iter()
        .filter(|tx| tx.date <= as_of)
        .map(|tx| tx.transaction_type.signed(tx.amount))
        .sum()
}

/// Deposit/withdrawal totals of the transactions falling inside `period`.
#[must_use]
pub fn monthly_totals(transactions: &[transaction::Model], period: YearMonth) -> MonthlyTotals {
    transactions
        .iter()
        .filter(|tx| period.contains(tx.date))
        .fold(MonthlyTotals::default(), |mut totals, tx| {
            match tx.transaction_type {
                transaction::TransactionType::Deposit => totals.deposit += tx.amount,
                transaction::TransactionType::Withdrawal => totals.withdrawal += tx.amount,
            }
            totals
        })
}

async fn require_patient(db: &DatabaseConnection, patient_id: i64) -> Result<patient::Model> {
    Patient::find_by_id(patient_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Patient", patient_id))
}

/// Computes a patient's balance as of the instant `as_of` (inclusive).
///
/// Only transactions dated at or before that exact time count, so midnight of a day
/// excludes the rest of that day. Use [`compute_balance_on`] for a calendar date.
/// Returns 0 for a patient without transactions.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown patient id.
pub async fn compute_balance(
    db: &DatabaseConnection,
    patient_id: i64,
    as_of: NaiveDateTime,
) -> Result<i64> {
    require_patient(db, patient_id).await?;
    let transactions = Transaction::find()
        .filter(transaction::Column::PatientId.eq(patient_id))
        .filter(transaction::Column::Date.lte(as_of))
        .all(db)
        .await?;
    Ok(balance_as_of(&transactions, as_of))
}

/// Computes a patient's balance at the end of `date`, including all of that day.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown patient id.
pub async fn compute_balance_on(
    db: &DatabaseConnection,
    patient_id: i64,
    date: NaiveDate,
) -> Result<i64> {
    compute_balance(db, patient_id, end_of_day(date)?).await
}

/// Computes a patient's deposit and withdrawal totals for `year`/`month`.
///
/// # Errors
/// Returns [`Error::InvalidPeriod`] for a bad month and [`Error::NotFound`] for an
/// unknown patient id.
pub async fn compute_monthly_totals(
    db: &DatabaseConnection,
    patient_id: i64,
    year: i32,
    month: u32,
) -> Result<MonthlyTotals> {
    let period = YearMonth::new(year, month)?;
    require_patient(db, patient_id).await?;
    let transactions = Transaction::find()
        .filter(transaction::Column::PatientId.eq(patient_id))
        .filter(transaction::Column::Date.between(period.start(), period.end()))
        .all(db)
        .await?;
    Ok(monthly_totals(&transactions, period))
}

/// One patient's line in the month-end balance report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientBalance {
    /// Patient id
    pub patient_id: i64,
    /// Patient business code
    pub patient_code: String,
    /// Patient name
    pub name: String,
    /// Ward name
    pub ward_name: String,
    /// Room number
    pub room_number: String,
    /// Balance as of the end of the month
    pub balance: i64,
    /// Deposits during the month
    pub month_deposit: i64,
    /// Withdrawals during the month
    pub month_withdrawal: i64,
}

/// Portfolio-wide sums of the report's per-patient columns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BalanceTotals {
    /// Sum of month-end balances
    pub balance: i64,
    /// Sum of month deposits
    pub deposit: i64,
    /// Sum of month withdrawals
    pub withdrawal: i64,
}

/// Month-end balance report over all active patients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    /// Reported month
    pub period: YearMonth,
    /// One line per active patient, ordered by patient code
    pub patients: Vec<PatientBalance>,
    /// Column sums
    pub totals: BalanceTotals,
}

/// Builds the month-end report for every active patient.
///
/// Patients are ordered by code ascending and appear even without transactions.
/// Transactions for all patients are loaded in one query.
pub async fn build_balance_report(
    db: &DatabaseConnection,
    year: i32,
    month: u32,
) -> Result<BalanceReport> {
    let period = YearMonth::new(year, month)?;

    let patients = Patient::find()
        .filter(patient::Column::IsActive.eq(true))
        .order_by_asc(patient::Column::PatientCode)
        .all(db)
        .await?;
    let patient_ids: Vec<i64> = patients.iter().map(|p| p.id).collect();

    let mut by_patient: HashMap<i64, Vec<transaction::Model>> = HashMap::new();
    if !patient_ids.is_empty() {
        let transactions = Transaction::find()
            .filter(transaction::Column::PatientId.is_in(patient_ids))
            .filter(transaction::Column::Date.lte(period.end()))
            .all(db)
            .await?;
        for tx in transactions {
            by_patient.entry(tx.patient_id).or_default().push(tx);
        }
    }

    let mut totals = BalanceTotals::default();
    let lines: Vec<PatientBalance> = patients
        .into_iter()
        .map(|p| {
            let transactions = by_patient.get(&p.id).map_or(&[][..], Vec::as_slice);
            let balance = balance_as_of(transactions, period.end());
            let month = monthly_totals(transactions, period);
            totals.balance += balance;
            totals.deposit += month.deposit;
            totals.withdrawal += month.withdrawal;
            PatientBalance {
                patient_id: p.id,
                patient_code: p.patient_code,
                name: p.name,
                ward_name: p.ward_name,
                room_number: p.room_number,
                balance,
                month_deposit: month.deposit,
                month_withdrawal: month.withdrawal,
            }
        })
        .collect();

    debug!("Built balance report for {period} over {} patients", lines.len());
    Ok(BalanceReport {
        period,
        patients: lines,
        totals,
    })
}

/// Renders a report as a fixed-width text table.
#[must_use]
pub fn format_balance_report(report: &BalanceReport) -> String {
    use std::fmt::Write;

    let mut out = format!(
        "Month-end balances - {} (as of {})\n",
        report.period,
        report.period.end().format("%Y-%m-%d %H:%M:%S%.3f")
    );
    // write! is infallible when writing to String
    let _ = writeln!(
        out,
        "{:<10} {:<20} {:<12} {:>6} {:>12} {:>12} {:>12}",
        "Code", "Name", "Ward", "Room", "Deposit", "Withdrawal", "Balance"
    );
    for line in &report.patients {
        let _ = writeln!(
            out,
            "{:<10} {:<20} {:<12} {:>6} {:>12} {:>12} {:>12}",
            line.patient_code,
            line.name,
            line.ward_name,
            line.room_number,
            line.month_deposit,
            line.month_withdrawal,
            line.balance
        );
    }
    let _ = writeln!(
        out,
        "{:<10} {:<20} {:<12} {:>6} {:>12} {:>12} {:>12}",
        "Total",
        format!("{} patients", report.patients.len()),
        "",
        "",
        report.totals.deposit,
        report.totals.withdrawal,
        report.totals.balance
    );
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::transaction::TransactionType;
    use crate::test_utils::*;

    fn tx(id: i64, tx_type: TransactionType, amount: i64, date: NaiveDateTime) -> transaction::Model {
        let now = chrono::Utc::now();
        transaction::Model {
            id,
            patient_id: 1,
            transaction_type: tx_type,
            amount,
            description: String::new(),
            date,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_ledger() -> Vec<transaction::Model> {
        vec![
            tx(1, TransactionType::Deposit, 30000, at(2026, 1, 5)),
            tx(2, TransactionType::Withdrawal, 480, at(2026, 1, 10)),
            tx(3, TransactionType::Withdrawal, 700, at(2026, 1, 15)),
            tx(4, TransactionType::Deposit, 10000, at(2026, 2, 1)),
        ]
    }

    #[test]
    fn test_balance_as_of_sample() {
        let ledger = sample_ledger();
        let jan_end = YearMonth::new(2026, 1).unwrap().end();
        assert_eq!(balance_as_of(&ledger, jan_end), 28820);
        assert_eq!(balance_as_of(&ledger, at(2026, 2, 1)), 38820);
        assert_eq!(balance_as_of(&ledger, at(2025, 12, 31)), 0);
        assert_eq!(balance_as_of(&[], jan_end), 0);
    }

    #[test]
    fn test_monthly_totals_sample() {
        let ledger = sample_ledger();
        let jan = monthly_totals(&ledger, YearMonth::new(2026, 1).unwrap());
        assert_eq!(
            jan,
            MonthlyTotals {
                deposit: 30000,
                withdrawal: 1180
            }
        );
        assert_eq!(jan.net(), 28820);

        let feb = monthly_totals(&ledger, YearMonth::new(2026, 2).unwrap());
        assert_eq!(
            feb,
            MonthlyTotals {
                deposit: 10000,
                withdrawal: 0
            }
        );
    }

    #[test]
    fn test_monthly_totals_boundaries() {
        let jan = YearMonth::new(2026, 1).unwrap();
        let ledger = vec![
            tx(1, TransactionType::Deposit, 100, jan.end()),
            tx(2, TransactionType::Deposit, 1000, jan.next().unwrap().start()),
            tx(3, TransactionType::Withdrawal, 10, jan.start()),
        ];
        let totals = monthly_totals(&ledger, jan);
        assert_eq!(totals.deposit, 100);
        assert_eq!(totals.withdrawal, 10);
    }

    #[tokio::test]
    async fn test_compute_balance_and_totals_from_store() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        create_test_transaction(&db, patient.id, TransactionType::Deposit, 30000, at(2026, 1, 5))
            .await?;
        create_test_transaction(&db, patient.id, TransactionType::Withdrawal, 480, at(2026, 1, 10))
            .await?;
        create_test_transaction(&db, patient.id, TransactionType::Withdrawal, 700, at(2026, 1, 15))
            .await?;
        create_test_transaction(&db, patient.id, TransactionType::Deposit, 10000, at(2026, 2, 1))
            .await?;

        assert_eq!(compute_balance(&db, patient.id, at(2026, 1, 31)).await?, 28820);
        assert_eq!(
            compute_monthly_totals(&db, patient.id, 2026, 1).await?,
            MonthlyTotals {
                deposit: 30000,
                withdrawal: 1180
            }
        );
        assert_eq!(
            compute_monthly_totals(&db, patient.id, 2026, 2).await?,
            MonthlyTotals {
                deposit: 10000,
                withdrawal: 0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_month_end_instant_is_included() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let jan = YearMonth::new(2026, 1)?;
        create_test_transaction(&db, patient.id, TransactionType::Deposit, 500, jan.end()).await?;
        create_test_transaction(
            &db,
            patient.id,
            TransactionType::Deposit,
            700,
            jan.next()?.start(),
        )
        .await?;

        let totals = compute_monthly_totals(&db, patient.id, 2026, 1).await?;
        assert_eq!(totals.deposit, 500);
        assert_eq!(compute_balance(&db, patient.id, jan.end()).await?, 500);
        Ok(())
    }

    #[tokio::test]
    async fn test_compute_balance_on_date_includes_whole_day() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        create_test_transaction(&db, patient.id, TransactionType::Deposit, 900, at(2026, 1, 15))
            .await?;
        let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let midnight = day.and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(compute_balance(&db, patient.id, midnight).await?, 0);
        assert_eq!(compute_balance_on(&db, patient.id, day).await?, 900);
        assert_eq!(
            compute_balance_on(&db, patient.id, day.pred_opt().unwrap()).await?,
            0
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_compute_balance_without_transactions_is_zero() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        assert_eq!(compute_balance(&db, patient.id, at(2030, 1, 1)).await?, 0);
        assert_eq!(
            compute_monthly_totals(&db, patient.id, 2026, 1).await?,
            MonthlyTotals::default()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_compute_balance_unknown_patient() -> Result<()> {
        let db = setup_test_db().await?;
        let result = compute_balance(&db, 404, at(2026, 1, 1)).await;
        assert!(result.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_compute_monthly_totals_invalid_month() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let result = compute_monthly_totals(&db, patient.id, 2026, 0).await;
        assert!(matches!(result, Err(Error::InvalidPeriod { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_report_orders_and_sums() -> Result<()> {
        let db = setup_test_db().await?;
        let second = create_test_patient(&db, "P-002").await?;
        let first = create_test_patient(&db, "P-001").await?;
        let idle = create_test_patient(&db, "P-003").await?;
        let discharged = create_test_patient(&db, "P-000").await?;
        crate::core::patient::deactivate_patient(&db, &office_actor(), discharged.id).await?;

        create_test_transaction(&db, first.id, TransactionType::Deposit, 30000, at(2026, 1, 5))
            .await?;
        create_test_transaction(&db, first.id, TransactionType::Withdrawal, 1180, at(2026, 1, 15))
            .await?;
        create_test_transaction(&db, first.id, TransactionType::Deposit, 10000, at(2026, 2, 1))
            .await?;
        create_test_transaction(&db, second.id, TransactionType::Deposit, 5000, at(2025, 12, 20))
            .await?;
        create_test_transaction(&db, second.id, TransactionType::Withdrawal, 300, at(2026, 1, 31))
            .await?;
        create_test_transaction(&db, discharged.id, TransactionType::Deposit, 999, at(2026, 1, 2))
            .await?;

        let report = build_balance_report(&db, 2026, 1).await?;
        let codes: Vec<&str> = report
            .patients
            .iter()
            .map(|p| p.patient_code.as_str())
            .collect();
        assert_eq!(codes, vec!["P-001", "P-002", "P-003"]);

        assert_eq!(report.patients[0].balance, 28820);
        assert_eq!(report.patients[0].month_deposit, 30000);
        assert_eq!(report.patients[0].month_withdrawal, 1180);
        assert_eq!(report.patients[1].balance, 4700);
        assert_eq!(report.patients[1].month_deposit, 0);
        assert_eq!(report.patients[1].month_withdrawal, 300);
        assert_eq!(report.patients[2].patient_id, idle.id);
        assert_eq!(report.patients[2].balance, 0);

        let sum_balance: i64 = report.patients.iter().map(|p| p.balance).sum();
        let sum_deposit: i64 = report.patients.iter().map(|p| p.month_deposit).sum();
        let sum_withdrawal: i64 = report.patients.iter().map(|p| p.month_withdrawal).sum();
        assert_eq!(report.totals.balance, sum_balance);
        assert_eq!(report.totals.deposit, sum_deposit);
        assert_eq!(report.totals.withdrawal, sum_withdrawal);
        assert_eq!(report.totals.balance, 33520);
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_report_empty_ward() -> Result<()> {
        let db = setup_test_db().await?;
        let report = build_balance_report(&db, 2026, 2).await?;
        assert!(report.patients.is_empty());
        assert_eq!(report.totals, BalanceTotals::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_format_balance_report() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        create_test_transaction(&db, patient.id, TransactionType::Deposit, 1200, at(2026, 1, 3))
            .await?;
        let report = build_balance_report(&db, 2026, 1).await?;
        let text = format_balance_report(&report);
        assert!(text.starts_with("Month-end balances - 2026-01 (as of 2026-01-31 23:59:59.999)"));
        assert!(text.contains(&patient.patient_code));
        assert!(text.contains("1 patients"));
        Ok(())
    }
}
