/// Credential store
///
/// Persists one record per account. The session layer only talks to the
/// `CredentialStore` trait; PostgreSQL backs deployments and an in-process
/// map backs tests and local runs.

mod account;
mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

pub use account::{Account, AccountChanges, NewAccount, PublicAccount};
pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// First account whose username equals `username` or whose email equals `email`
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    /// Insert a new account. Duplicate username/email is a conflict error.
    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError>;

    /// Overwrite (or clear with `None`) the stored refresh token digest.
    /// Returns `false` when no such account exists.
    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<bool, AppError>;

    /// Replace the stored digest only if it still equals `expected`.
    /// Returns `false` when the stored value changed in the meantime.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError>;

    /// Write only the password hash; no other field is touched or re-checked.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError>;

    async fn update_details(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, AppError>;
}
