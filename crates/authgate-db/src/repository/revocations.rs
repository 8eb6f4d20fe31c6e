//! Revoked token operations

use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

use crate::error::DbError;
use crate::models::{NewRevokedToken, RevokedToken};
use crate::utils::format_datetime;

use super::Database;

impl Database {
    /// Record a revoked token
    ///
    /// A second insert for the same token fails with `DbError::Duplicate`.
    pub async fn insert_revocation_entry(
        &self,
        entry: NewRevokedToken,
    ) -> Result<RevokedToken, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token, account_id, expires_at, revoked_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.token)
        .bind(entry.account_id)
        .bind(format_datetime(&entry.expires_at))
        .bind(format_datetime(&now))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_insert(e, "Token already revoked"))?;

        Ok(RevokedToken {
            id: result.get("id"),
            token: entry.token,
            account_id: entry.account_id,
            expires_at: entry.expires_at,
            revoked_at: now,
        })
    }

    /// Look up a revoked token by its exact string
    pub async fn lookup_revocation_entry(
        &self,
        token: &str,
    ) -> Result<Option<RevokedToken>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, token, account_id, expires_at, revoked_at
            FROM revoked_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| RevokedToken::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Delete entries whose token has already expired
    pub async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?")
            .bind(format_datetime(&now))
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        debug!("Purged {} expired revocation entries", purged);
        Ok(purged)
    }

    /// Count revocation entries still stored
    pub async fn count_revocations(&self) -> Result<i64, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM revoked_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(result.get("count"))
    }
}
