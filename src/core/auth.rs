//! Authorization and password handling.
//!
//! Every mutating operation calls [`authorize`] before touching the store. Roles are
//! ordered: an admin can do anything office staff can.

use crate::entities::user::{self, UserRole};
use crate::errors::{Error, Result};
use argon2::{
    Argon2, PasswordHash,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::warn;

/// The staff member performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// User id, recorded in audit entries
    pub id: i64,
    /// Display name, recorded in audit entries
    pub name: String,
    /// Access level checked by [`authorize`]
    pub role: UserRole,
}

impl Actor {
    /// Creates an actor directly, e.g. for a system task.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Whether `actual` is at least as privileged as `required`.
#[must_use]
pub const fn role_satisfies(actual: UserRole, required: UserRole) -> bool {
    matches!(
        (actual, required),
        (UserRole::Admin, _) | (UserRole::Office, UserRole::Office)
    )
}

/// Checks that `actor` holds `required`.
///
/// # Errors
/// Returns [`Error::Forbidden`] when the actor's role is insufficient.
pub fn authorize(actor: &Actor, required: UserRole) -> Result<()> {
    if role_satisfies(actor.role, required) {
        Ok(())
    } else {
        warn!(
            actor_id = actor.id,
            actor_role = %actor.role,
            required_role = %required,
            "Permission denied"
        );
        Err(Error::Forbidden {
            required,
            actual: actor.role,
        })
    }
}

/// Hashes a password using Argon2id, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Verifies a password against a stored PHC string.
///
/// A malformed stored hash counts as a mismatch, not an error.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
