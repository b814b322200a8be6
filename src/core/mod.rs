/// Audit trail writer and reader
pub mod audit;
/// Roles, authorization checks and password hashing
pub mod auth;
/// Balances, monthly totals and the month-end report
pub mod balance;
/// Billing contact records
pub mod billing_contact;
/// Closing period registry
pub mod closing;
/// Dashboard figures
pub mod dashboard;
/// Running ledger with cumulative balances
pub mod ledger;
/// Patient registry
pub mod patient;
/// Calendar month arithmetic
pub mod period;
/// Shop product catalog
pub mod product;
/// Deposits, withdrawals and their items
pub mod transaction;
/// Staff accounts
pub mod user;
/// Ward reference data
pub mod ward;

use crate::errors::{Error, Result};

/// Trims a required text field, rejecting it when nothing is left.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
