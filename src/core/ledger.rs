//! Running ledger - transactions in date order with a cumulative balance column.

use crate::{
    core::transaction::TransactionFilter,
    entities::{Transaction, transaction},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// The transaction on this line
    pub transaction: transaction::Model,
    /// Balance after applying this transaction
    pub balance: i64,
}

/// A date-ordered ledger with its closing balance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunningLedger {
    /// Lines, oldest first
    pub rows: Vec<LedgerRow>,
    /// Balance after the last line; 0 for an empty ledger
    pub final_balance: i64,
}

impl RunningLedger {
    /// Balance at the last line dated at or before `as_of`, or 0 when there is none.
    #[must_use]
    pub fn balance_at(&self, as_of: chrono::NaiveDateTime) -> i64 {
        self.rows
            .iter()
            .take_while(|row| row.transaction.date <= as_of)
            .last()
            .map_or(0, |row| row.balance)
    }
}

/// Builds a running ledger from transactions in any order.
///
/// Input is sorted by date, then id, before the scan so the result does not depend on
/// the order the caller supplies. The balance starts at 0.
#[must_use]
pub fn build_running_ledger(mut transactions: Vec<transaction::Model>) -> RunningLedger {
    transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

    let mut balance = 0;
    let rows = transactions
        .into_iter()
        .map(|tx| {
            balance += tx.transaction_type.signed(tx.amount);
            LedgerRow {
                transaction: tx,
                balance,
            }
        })
        .collect();

    RunningLedger {
        rows,
        final_balance: balance,
    }
}

/// Loads the transactions matching `filter` and builds their running ledger.
pub async fn get_ledger(db: &DatabaseConnection, filter: TransactionFilter) -> Result<RunningLedger> {
    let transactions = filter
        .apply(Transaction::find())
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;
    Ok(build_running_ledger(transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{balance::compute_balance, period::YearMonth};
    use crate::entities::transaction::TransactionType;
    use crate::test_utils::*;

    fn tx(id: i64, tx_type: TransactionType, amount: i64, day: u32) -> transaction::Model {
        let now = chrono::Utc::now();
        transaction::Model {
            id,
            patient_id: 1,
            transaction_type: tx_type,
            amount,
            description: format!("tx {id}"),
            date: at(2026, 1, day),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<transaction::Model> {
        vec![
            tx(1, TransactionType::Deposit, 30000, 5),
            tx(2, TransactionType::Withdrawal, 480, 10),
            tx(3, TransactionType::Withdrawal, 700, 15),
            tx(4, TransactionType::Deposit, 250, 15),
        ]
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = build_running_ledger(Vec::new());
        assert!(ledger.rows.is_empty());
        assert_eq!(ledger.final_balance, 0);
        assert_eq!(ledger.balance_at(at(2026, 1, 1)), 0);
    }

    #[test]
    fn test_running_balance_column() {
        let ledger = build_running_ledger(sample());
        let balances: Vec<i64> = ledger.rows.iter().map(|r| r.balance).collect();
        assert_eq!(balances, vec![30000, 29520, 28820, 29070]);
        assert_eq!(ledger.final_balance, 29070);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let sorted = build_running_ledger(sample());

        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(build_running_ledger(reversed), sorted);

        let mut rotated = sample();
        rotated.rotate_left(2);
        assert_eq!(build_running_ledger(rotated), sorted);
    }

    #[test]
    fn test_same_day_ties_break_by_id() {
        let ledger = build_running_ledger(vec![
            tx(9, TransactionType::Withdrawal, 100, 3),
            tx(2, TransactionType::Deposit, 500, 3),
        ]);
        let ids: Vec<i64> = ledger.rows.iter().map(|r| r.transaction.id).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(ledger.rows[1].balance, 400);
    }

    #[test]
    fn test_balance_at() {
        let ledger = build_running_ledger(sample());
        assert_eq!(ledger.balance_at(at(2026, 1, 4)), 0);
        assert_eq!(ledger.balance_at(at(2026, 1, 12)), 29520);
        assert_eq!(ledger.balance_at(at(2026, 1, 31)), 29070);
    }

    #[tokio::test]
    async fn test_ledger_agrees_with_compute_balance() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        for (tx_type, amount, date) in [
            (TransactionType::Deposit, 30000, at(2026, 1, 5)),
            (TransactionType::Withdrawal, 480, at(2026, 1, 10)),
            (TransactionType::Withdrawal, 700, at(2026, 1, 15)),
            (TransactionType::Deposit, 10000, at(2026, 2, 1)),
        ] {
            create_test_transaction(&db, patient.id, tx_type, amount, date).await?;
        }

        let ledger = get_ledger(
            &db,
            TransactionFilter {
                patient_id: Some(patient.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ledger.rows.len(), 4);
        for as_of in [at(2026, 1, 1), at(2026, 1, 12), at(2026, 1, 31), at(2026, 2, 28)] {
            assert_eq!(
                ledger.balance_at(as_of),
                compute_balance(&db, patient.id, as_of).await?
            );
        }
        assert_eq!(ledger.final_balance, 38820);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_scoped_to_month() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        create_test_transaction(&db, patient.id, TransactionType::Deposit, 500, at(2026, 1, 5))
            .await?;
        create_test_transaction(&db, patient.id, TransactionType::Withdrawal, 200, at(2026, 2, 3))
            .await?;

        let february = get_ledger(
            &db,
            TransactionFilter {
                patient_id: Some(patient.id),
                period: Some(YearMonth::new(2026, 2)?),
                transaction_type: None,
            },
        )
        .await?;
        assert_eq!(february.rows.len(), 1);
        assert_eq!(february.final_balance, -200);
        Ok(())
    }
}
