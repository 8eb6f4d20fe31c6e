//! Database models

use crate::utils::{parse_datetime_or_now, parse_optional_datetime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// Account model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    /// Unique login email, compared case-sensitively
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// New account (for insertion)
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
}

/// Partial account update
///
/// Each `None` field leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
}

impl AccountPatch {
    /// Patch that only replaces the password hash
    pub fn password_hash(hash: impl Into<String>) -> Self {
        Self {
            password_hash: Some(hash.into()),
            ..Default::default()
        }
    }

    /// Patch that only touches the last-login timestamp
    pub fn last_login(at: DateTime<Utc>) -> Self {
        Self {
            last_login: Some(at),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge the set fields onto an account
    pub fn apply(&self, account: &mut Account) {
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            account.password_hash = hash.clone();
        }
        if let Some(active) = self.is_active {
            account.is_active = active;
        }
        if let Some(admin) = self.is_admin {
            account.is_admin = admin;
        }
        if let Some(at) = self.last_login {
            account.last_login = Some(at);
        }
    }
}

/// Revoked session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevokedToken {
    pub id: i64,
    #[serde(skip_serializing)]
    pub token: String,
    pub account_id: i64,
    /// Natural expiry of the token; the entry is dead after this instant
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}

/// New revoked token (for insertion)
#[derive(Debug, Clone)]
pub struct NewRevokedToken {
    pub token: String,
    pub account_id: i64,
    pub expires_at: DateTime<Utc>,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for Account {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            is_active: row.try_get("is_active")?,
            is_admin: row.try_get("is_admin")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            last_login: parse_optional_datetime(row.try_get("last_login")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for RevokedToken {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(RevokedToken {
            id: row.try_get("id")?,
            token: row.try_get("token")?,
            account_id: row.try_get("account_id")?,
            expires_at: parse_datetime_or_now(&row.try_get::<String, _>("expires_at")?),
            revoked_at: parse_datetime_or_now(&row.try_get::<String, _>("revoked_at")?),
        })
    }
}
