//! Staff accounts - login, administration and first-run bootstrap.
//!
//! All account management is restricted to administrators. Passwords are stored as
//! Argon2id PHC strings and never appear in audit details.

use crate::{
    core::{
        audit::{AuditEntry, discard_audit_failure, record_audit},
        auth::{Actor, authorize, hash_password, verify_password},
        required_text,
    },
    entities::{
        User,
        audit_log::{AuditAction, AuditEntity},
        user::{self, UserRole},
    },
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::{info, instrument, warn};

/// Values for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login id
    pub login_id: String,
    /// Unique email address
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    /// Display name
    pub name: String,
    /// Access level; office when omitted
    pub role: Option<UserRole>,
}

/// Partial account update; `None` leaves a field unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    /// New login id
    pub login_id: Option<String>,
    /// New email address
    pub email: Option<String>,
    /// New display name
    pub name: Option<String>,
    /// New access level
    pub role: Option<UserRole>,
    /// New password, rehashed
    pub password: Option<String>,
    /// Reactivate or deactivate
    pub is_active: Option<bool>,
}

/// Rejects a login id or email already held by another account.
async fn ensure_unique<C>(
    db: &C,
    login_id: Option<&str>,
    email: Option<&str>,
    except_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if login_id.is_none() && email.is_none() {
        return Ok(());
    }
    let mut any = Condition::any();
    if let Some(login_id) = login_id {
        any = any.add(user::Column::LoginId.eq(login_id));
    }
    if let Some(email) = email {
        any = any.add(user::Column::Email.eq(email));
    }

    let mut query = User::find().filter(any);
    if let Some(id) = except_id {
        query = query.filter(user::Column::Id.ne(id));
    }
    let Some(existing) = query.one(db).await? else {
        return Ok(());
    };

    Err(match login_id {
        Some(login_id) if existing.login_id == login_id => Error::DuplicateKey {
            entity: "User",
            field: "login_id",
            value: login_id.to_string(),
        },
        _ => Error::DuplicateKey {
            entity: "User",
            field: "email",
            value: existing.email,
        },
    })
}

async fn insert_user<C>(db: &C, new: &NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let login_id = required_text("login_id", &new.login_id)?;
    let email = required_text("email", &new.email)?;
    let name = required_text("name", &new.name)?;
    if new.password.is_empty() {
        return Err(Error::validation("password is required"));
    }
    ensure_unique(db, Some(&login_id), Some(&email), None).await?;

    let now = chrono::Utc::now();
    user::ActiveModel {
        login_id: Set(login_id),
        email: Set(email),
        password_hash: Set(hash_password(&new.password)?),
        name: Set(name),
        role: Set(new.role.unwrap_or(UserRole::Office)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Checks a login id and password.
///
/// Unknown ids, inactive accounts and wrong passwords all yield `None`.
#[instrument(skip(db, password))]
pub async fn authenticate(
    db: &DatabaseConnection,
    login_id: &str,
    password: &str,
) -> Result<Option<Actor>> {
    let Some(found) = User::find()
        .filter(user::Column::LoginId.eq(login_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    if !found.is_active || !verify_password(password, &found.password_hash) {
        warn!("Login rejected");
        return Ok(None);
    }
    Ok(Some(Actor::from(&found)))
}

/// Creates an account. Requires the admin role.
#[instrument(skip(db, actor, new), fields(actor_id = actor.id, login_id = %new.login_id))]
pub async fn create_user(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewUser,
) -> Result<user::Model> {
    authorize(actor, UserRole::Admin)?;

    let txn = db.begin().await?;
    let created = insert_user(&txn, &new).await?;
    txn.commit().await?;

    info!("Created user {}", created.login_id);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Create,
                AuditEntity::User,
                created.id,
                format!("Created user {} ({})", created.name, created.login_id),
            )
            .with_detail(json!({
                "login_id": created.login_id,
                "email": created.email,
                "name": created.name,
                "role": created.role,
            })),
        )
        .await,
    );
    Ok(created)
}

/// Applies a partial update to an account. Requires the admin role.
#[instrument(skip(db, actor, update), fields(actor_id = actor.id))]
pub async fn update_user(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    update: UserUpdate,
) -> Result<user::Model> {
    authorize(actor, UserRole::Admin)?;
    let login_id = update
        .login_id
        .as_deref()
        .map(|v| required_text("login_id", v))
        .transpose()?;
    let email = update
        .email
        .as_deref()
        .map(|v| required_text("email", v))
        .transpose()?;
    let name = update
        .name
        .as_deref()
        .map(|v| required_text("name", v))
        .transpose()?;
    let password_hash = match update.password.as_deref() {
        Some("") | None => None,
        Some(password) => Some(hash_password(password)?),
    };

    let txn = db.begin().await?;
    let existing = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;
    ensure_unique(&txn, login_id.as_deref(), email.as_deref(), Some(user_id)).await?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(login_id) = login_id {
        active.login_id = Set(login_id);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(role) = update.role {
        active.role = Set(role);
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(hash) = password_hash {
        active.password_hash = Set(hash);
    }
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Updated user {}", updated.login_id);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Update,
                AuditEntity::User,
                updated.id,
                format!("Updated user {} ({})", updated.name, updated.login_id),
            )
            .with_detail(json!({
                "login_id": update.login_id,
                "email": update.email,
                "name": update.name,
                "role": update.role,
                "is_active": update.is_active,
                "password_changed": update.password.is_some_and(|p| !p.is_empty()),
            })),
        )
        .await,
    );
    Ok(updated)
}

/// Deactivates an account. Administrators cannot deactivate themselves.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn deactivate_user(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
) -> Result<user::Model> {
    authorize(actor, UserRole::Admin)?;
    if actor.id == user_id {
        return Err(Error::validation("You cannot deactivate your own account"));
    }

    let txn = db.begin().await?;
    let existing = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;
    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Deactivated user {}", updated.login_id);
    discard_audit_failure(
        record_audit(
            db,
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditEntity::User,
                updated.id,
                format!("Deactivated user {} ({})", updated.name, updated.login_id),
            ),
        )
        .await,
    );
    Ok(updated)
}

/// All accounts in creation order. Requires the admin role.
pub async fn list_users(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<user::Model>> {
    authorize(actor, UserRole::Admin)?;
    User::find()
        .order_by_asc(user::Column::CreatedAt)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates the first administrator when the account table is empty.
///
/// Returns `None` when any account already exists.
pub async fn bootstrap_admin(db: &DatabaseConnection, admin: NewUser) -> Result<Option<user::Model>> {
    let txn = db.begin().await?;
    if User::find().count(&txn).await? > 0 {
        txn.commit().await?;
        return Ok(None);
    }
    let created = insert_user(
        &txn,
        &NewUser {
            role: Some(UserRole::Admin),
            ..admin
        },
    )
    .await?;
    txn.commit().await?;

    info!("Created initial administrator {}", created.login_id);
    Ok(Some(created))
}
