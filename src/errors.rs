//! Unified error types for the ward ledger.
//!
//! Business failures fall into three groups the callers can tell apart:
//! validation (the mutation did not happen because the input was rejected),
//! not-found (an id did not resolve) and infrastructure (the store or the
//! environment failed). Audit-write failures have their own type,
//! [`AuditError`], which is never converted into [`Error`].

use crate::entities::{
    audit_log::{AuditAction, AuditEntity},
    user::UserRole,
};
use thiserror::Error;

/// Errors returned by ward ledger operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure outside the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Amount must be a positive number of minor units, at most `MAX_AMOUNT`
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Year/month pair does not name a calendar month
    #[error("Invalid period: {year}-{month:02}")]
    InvalidPeriod {
        /// Requested year
        year: i32,
        /// Requested month
        month: u32,
    },

    /// Generic input rejection (missing required field, bad combination, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A unique business key is already taken
    #[error("{entity} with {field} '{value}' already exists")]
    DuplicateKey {
        /// Entity kind, e.g. `"Patient"`
        entity: &'static str,
        /// Offending field, e.g. `"patient_code"`
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Item subtotals do not add up to the transaction amount
    #[error("Item subtotals sum to {items_total} but transaction amount is {amount}")]
    ItemTotalMismatch {
        /// Parent transaction amount
        amount: i64,
        /// Sum of item subtotals
        items_total: i64,
    },

    /// The month a transaction falls in has been closed
    #[error("Period {year}-{month:02} is closed")]
    PeriodClosed {
        /// Closed year
        year: i32,
        /// Closed month
        month: u32,
    },

    /// An id did not resolve to a record
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"Transaction"`
        entity: &'static str,
        /// The id or key that was looked up
        id: String,
    },

    /// The acting user does not hold the required role
    #[error("Permission denied: requires {required}, actor is {actual}")]
    Forbidden {
        /// Role the operation needs
        required: UserRole,
        /// Role the actor has
        actual: UserRole,
    },

    /// Password hashing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Underlying reason
        message: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] keyed by a numeric id.
    #[must_use]
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`Error::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// True when the input was rejected and nothing was written.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::InvalidPeriod { .. }
                | Self::Validation { .. }
                | Self::DuplicateKey { .. }
                | Self::ItemTotalMismatch { .. }
                | Self::PeriodClosed { .. }
        )
    }

    /// True when a referenced record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for store and environment failures that callers should surface as-is.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Io(_)
                | Self::Config { .. }
                | Self::Serialization(_)
                | Self::PasswordHash { .. }
        )
    }
}

/// Failure to append an audit entry.
///
/// Kept apart from [`Error`] so an audit failure cannot be `?`-propagated out
/// of a business operation by accident.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit insert failed at the store
    #[error("Failed to record {action:?} of {entity:?} {entity_id}: {source}")]
    Store {
        /// Action the entry described
        action: AuditAction,
        /// Entity kind the entry described
        entity: AuditEntity,
        /// Entity id the entry described
        entity_id: i64,
        /// Store error
        #[source]
        source: sea_orm::DbErr,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
