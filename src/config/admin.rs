//! Initial administrator account from environment variables.
//!
//! On a fresh database nobody can log in to create accounts, so the binary reads
//! `INITIAL_ADMIN_LOGIN_ID`, `INITIAL_ADMIN_EMAIL`, `INITIAL_ADMIN_NAME` and
//! `INITIAL_ADMIN_PASSWORD` from the `.env` file and creates the first admin.

use crate::core::user::NewUser;
use crate::entities::user::UserRole;

/// Builds the initial administrator from the environment.
///
/// Returns `None` unless the login id, email and password are all set. The display
/// name falls back to the login id.
#[must_use]
pub fn initial_admin_from_env() -> Option<NewUser> {
    initial_admin_from(|key| std::env::var(key).ok())
}

fn initial_admin_from(lookup: impl Fn(&str) -> Option<String>) -> Option<NewUser> {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let login_id = non_empty("INITIAL_ADMIN_LOGIN_ID")?;
    let email = non_empty("INITIAL_ADMIN_EMAIL")?;
    let password = non_empty("INITIAL_ADMIN_PASSWORD")?;
    let name = non_empty("INITIAL_ADMIN_NAME").unwrap_or_else(|| login_id.clone());

    Some(NewUser {
        login_id,
        email,
        password,
        name,
        role: Some(UserRole::Admin),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_initial_admin_complete() {
        let admin = initial_admin_from(lookup_in(&[
            ("INITIAL_ADMIN_LOGIN_ID", "admin"),
            ("INITIAL_ADMIN_EMAIL", "admin@ward.test"),
            ("INITIAL_ADMIN_PASSWORD", "change-me"),
            ("INITIAL_ADMIN_NAME", "Head Nurse"),
        ]))
        .unwrap();
        assert_eq!(admin.login_id, "admin");
        assert_eq!(admin.name, "Head Nurse");
        assert_eq!(admin.role, Some(UserRole::Admin));
    }

    #[test]
    fn test_initial_admin_name_defaults_to_login_id() {
        let admin = initial_admin_from(lookup_in(&[
            ("INITIAL_ADMIN_LOGIN_ID", "admin"),
            ("INITIAL_ADMIN_EMAIL", "admin@ward.test"),
            ("INITIAL_ADMIN_PASSWORD", "change-me"),
        ]))
        .unwrap();
        assert_eq!(admin.name, "admin");
    }

    #[test]
    fn test_initial_admin_requires_password() {
        let admin = initial_admin_from(lookup_in(&[
            ("INITIAL_ADMIN_LOGIN_ID", "admin"),
            ("INITIAL_ADMIN_EMAIL", "admin@ward.test"),
            ("INITIAL_ADMIN_PASSWORD", " "),
        ]));
        assert!(admin.is_none());
    }
}
