use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Account, AccountChanges, CredentialStore, NewAccount};
use crate::error::AppError;

/// PostgreSQL-backed store over the `accounts` table.
///
/// Every mutation is a single statement, so per-row atomicity comes from
/// Postgres. Refresh-token rotation uses a conditional `UPDATE` as its
/// compare-and-swap.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations in `./migrations`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, display_name, password_hash, avatar_url,
                   cover_image_url, refresh_token_hash, created_at, updated_at
            FROM accounts
            WHERE username = $1 OR email = $2
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, display_name, password_hash, avatar_url,
                   cover_image_url, refresh_token_hash, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, username, email, display_name, password_hash,
                                  avatar_url, cover_image_url, refresh_token_hash,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, $8)
            RETURNING id, username, email, display_name, password_hash, avatar_url,
                      cover_image_url, refresh_token_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .bind(&account.avatar_url)
        .bind(&account.cover_image_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET refresh_token_hash = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(token_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET refresh_token_hash = $1, updated_at = $2
            WHERE id = $3 AND refresh_token_hash = $4
            "#,
        )
        .bind(replacement)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_details(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET display_name = COALESCE($1, display_name),
                email = COALESCE($2, email),
                updated_at = $3
            WHERE id = $4
            RETURNING id, username, email, display_name, password_hash, avatar_url,
                      cover_image_url, refresh_token_hash, created_at, updated_at
            "#,
        )
        .bind(changes.display_name)
        .bind(changes.email)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}
