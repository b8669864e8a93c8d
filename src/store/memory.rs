use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{Account, AccountChanges, CredentialStore, NewAccount};
use crate::error::AppError;

/// Map-backed store. Each call holds the lock for its whole read-modify-write,
/// which gives the same per-record atomicity as a single SQL statement.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, AppError> {
        Ok(self
            .accounts
            .lock()
            .values()
            .find(|a| a.username == username || a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.lock().get(&id).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let mut accounts = self.accounts.lock();

        if accounts
            .values()
            .any(|a| a.username == account.username || a.email == account.email)
        {
            return Err(AppError::conflict("User with email or username already exists"));
        }

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            display_name: account.display_name,
            password_hash: account.password_hash,
            avatar_url: account.avatar_url,
            cover_image_url: account.cover_image_url,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(record.id, record.clone());

        Ok(record)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<bool, AppError> {
        match self.accounts.lock().get_mut(&id) {
            Some(account) => {
                account.refresh_token_hash = token_hash.map(str::to_string);
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        match self.accounts.lock().get_mut(&id) {
            Some(account) if account.refresh_token_hash.as_deref() == Some(expected) => {
                account.refresh_token_hash = Some(replacement.to_string());
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        match self.accounts.lock().get_mut(&id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_details(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, AppError> {
        let mut accounts = self.accounts.lock();

        if let Some(email) = &changes.email {
            if accounts.values().any(|a| a.id != id && &a.email == email) {
                return Err(AppError::conflict("Email is already in use"));
            }
        }

        Ok(accounts.get_mut(&id).map(|account| {
            if let Some(display_name) = changes.display_name {
                account.display_name = display_name;
            }
            if let Some(email) = changes.email {
                account.email = email;
            }
            account.updated_at = Utc::now();
            account.clone()
        }))
    }
}
