//! PostgreSQL-backed account store.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::models::{Account, AccountRow, NewAccount, PendingVerification};
use crate::services::{AccountStore, StoreError};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, is_admin, \
     is_verified, verification_code, code_expires_at, created_at";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(anyhow::anyhow!(e))
}

#[async_trait]
impl AccountStore for Database {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(Account::from))
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (email, password_hash, first_name, last_name, verification_code, code_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.verification.code)
        .bind(account.verification.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return StoreError::EmailTaken;
                }
            }
            unavailable(e)
        })?;

        Ok(Account::from(row))
    }

    async fn mark_verified(&self, id: i64, code: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_verified = TRUE, verification_code = NULL, code_expires_at = NULL
            WHERE id = $1 AND is_verified = FALSE AND verification_code = $2
            "#,
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_verification_code(
        &self,
        id: i64,
        verification: &PendingVerification,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET verification_code = $1, code_expires_at = $2
            WHERE id = $3 AND is_verified = FALSE
            "#,
        )
        .bind(&verification.code)
        .bind(verification.expires_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn promote_to_admin(&self, id: i64) -> Result<bool, StoreError> {
        // Postgres counts matched rows, so re-promoting an admin still reports 1.
        let result = sqlx::query("UPDATE accounts SET is_admin = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                unavailable(e)
            })?;
        Ok(())
    }
}
