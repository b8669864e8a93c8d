/// Session Manager
///
/// Owns the account/session lifecycle: registration, login, logout,
/// refresh-token rotation, password change and account updates. It is the
/// only component that reads or writes the stored refresh token, which makes
/// it the single source of truth for "is this refresh token still valid".
///
/// A refresh token is accepted only when its signature and expiry verify AND
/// its digest equals the one stored on the account. Logout clears the stored
/// digest, and every successful refresh swaps it for the new token's digest,
/// so an old token never validates again even before it expires.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::{hash_if_changed, validate_password, PasswordHasher};
use crate::auth::refresh_token::fingerprint;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::store::{Account, AccountChanges, CredentialStore, NewAccount, PublicAccount};
use crate::validators::{
    is_valid_display_name, is_valid_email, is_valid_username, normalize_identifier,
};

/// Registration input
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "avatar")]
    pub avatar_url: Option<String>,
    #[serde(alias = "coverImage")]
    pub cover_image_url: Option<String>,
}

/// Login input; either `username` or `email` identifies the account
#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    #[serde(rename = "user")]
    pub account: PublicAccount,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: TokenCodec,
}

impl SessionManager {
    /// # Errors
    /// Returns a configuration error if the token settings are unusable
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        settings: &AuthSettings,
    ) -> Result<Self, AppError> {
        Ok(Self {
            store,
            hasher,
            codec: TokenCodec::new(settings)?,
        })
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account with no active session
    ///
    /// # Errors
    /// - Validation: a required field is missing or malformed
    /// - Conflict: username or email already taken
    pub async fn register(&self, input: Registration) -> Result<PublicAccount, AppError> {
        let context = ErrorContext::new("account_registration");

        let username = require(&input.username);
        let email = require(&input.email);
        let display_name = require(&input.display_name);
        let password = input.password.as_deref().filter(|p| !p.is_empty());

        let missing: Vec<String> = [
            ("username", username.is_none()),
            ("email", email.is_none()),
            ("displayName", display_name.is_none()),
            ("password", password.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(field, _)| field.to_string())
        .collect();

        let (Some(username), Some(email), Some(display_name), Some(password)) =
            (username, email, display_name, password)
        else {
            return Err(ValidationError::MissingFields(missing).into());
        };

        let username = is_valid_username(username)?;
        let email = is_valid_email(email)?;
        let display_name = is_valid_display_name(display_name)?;
        validate_password(password)?;

        if self
            .store
            .find_by_username_or_email(&username, &email)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User with email or username already exists"));
        }

        let password_hash = hash_if_changed(self.hasher.as_ref(), None, password)?;

        let account = self
            .store
            .create_account(NewAccount {
                username,
                email,
                display_name,
                password_hash,
                avatar_url: optional_reference(&input.avatar_url),
                cover_image_url: optional_reference(&input.cover_image_url),
            })
            .await?;

        tracing::info!(
            request_id = %context.request_id,
            operation = context.operation,
            account_id = %account.id,
            "Account registered"
        );

        Ok(account.public())
    }

    /// Verify credentials, mint a token pair and store the refresh digest
    ///
    /// # Errors
    /// - Validation: identifier or password missing
    /// - NotFound: no account with that username/email
    /// - Unauthorized: wrong password
    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, AppError> {
        let context = ErrorContext::new("account_login");

        let username = require(&credentials.username).map(normalize_identifier);
        let email = require(&credentials.email).map(normalize_identifier);
        let password = credentials.password.as_deref().filter(|p| !p.is_empty());

        let (username, email) = match (username, email) {
            (Some(u), Some(e)) => (u, e),
            (Some(u), None) => (u.clone(), u),
            (None, Some(e)) => (e.clone(), e),
            (None, None) => {
                return Err(ValidationError::EmptyField("username or email".to_string()).into())
            }
        };
        let password =
            password.ok_or_else(|| ValidationError::EmptyField("password".to_string()))?;

        let account = self
            .store
            .find_by_username_or_email(&username, &email)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        if !self.hasher.verify(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issue_tokens(&account)?;

        let stored = self
            .store
            .set_refresh_token(account.id, Some(&fingerprint(&tokens.refresh_token)))
            .await?;
        if !stored {
            return Err(AppError::Internal(format!(
                "Account {} disappeared during login",
                account.id
            )));
        }

        tracing::info!(
            request_id = %context.request_id,
            operation = context.operation,
            account_id = %account.id,
            "Account logged in"
        );

        Ok(LoginOutcome {
            account: account.public(),
            tokens,
        })
    }

    /// Clear the stored refresh token. Safe to repeat.
    ///
    /// # Errors
    /// Internal if the account no longer exists: the caller was just
    /// authenticated as this account, so absence is an inconsistency.
    pub async fn logout(&self, account_id: Uuid) -> Result<(), AppError> {
        let context = ErrorContext::new("account_logout");

        if !self.store.set_refresh_token(account_id, None).await? {
            return Err(AppError::Internal(format!(
                "Authenticated account {} not found during logout",
                account_id
            )));
        }

        tracing::info!(
            request_id = %context.request_id,
            operation = context.operation,
            account_id = %account_id,
            "Account logged out"
        );

        Ok(())
    }

    /// Exchange a refresh token for a new pair, rotating the stored digest
    ///
    /// # Errors
    /// Unauthorized when the token is absent, fails verification, names an
    /// unknown account, or is not the account's current refresh token
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("token_refresh");

        let token = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.codec.verify_refresh_token(token)?;
        let account_id = claims.account_id()?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::TokenInvalid("Invalid refresh token".to_string()))?;

        let presented_hash = fingerprint(token);
        if account.refresh_token_hash.as_deref() != Some(presented_hash.as_str()) {
            tracing::warn!(
                request_id = %context.request_id,
                operation = context.operation,
                account_id = %account.id,
                "Refresh token is not the current one for this account"
            );
            return Err(AuthError::TokenReused.into());
        }

        let tokens = self.issue_tokens(&account)?;

        let rotated = self
            .store
            .swap_refresh_token(
                account.id,
                &presented_hash,
                &fingerprint(&tokens.refresh_token),
            )
            .await?;
        if !rotated {
            // A concurrent refresh with the same token won the swap
            tracing::warn!(
                request_id = %context.request_id,
                operation = context.operation,
                account_id = %account.id,
                "Lost refresh token rotation race"
            );
            return Err(AuthError::TokenReused.into());
        }

        tracing::info!(
            request_id = %context.request_id,
            operation = context.operation,
            account_id = %account.id,
            "Refresh token rotated"
        );

        Ok(tokens)
    }

    /// # Errors
    /// - Validation: a password is missing or both are equal (checked before any store access)
    /// - Unauthorized: old password does not match
    /// - Internal: the authenticated account no longer exists
    pub async fn change_password(
        &self,
        account_id: Uuid,
        change: PasswordChange,
    ) -> Result<(), AppError> {
        let context = ErrorContext::new("password_change");

        let old_password = change.old_password.as_deref().filter(|p| !p.is_empty());
        let new_password = change.new_password.as_deref().filter(|p| !p.is_empty());

        let (old_password, new_password) = match (old_password, new_password) {
            (Some(old), Some(new)) => (old, new),
            (old, new) => {
                let mut missing = Vec::new();
                if old.is_none() {
                    missing.push("oldPassword".to_string());
                }
                if new.is_none() {
                    missing.push("newPassword".to_string());
                }
                return Err(ValidationError::MissingFields(missing).into());
            }
        };

        if old_password == new_password {
            return Err(ValidationError::Rejected(
                "New password must be different from the old password".to_string(),
            )
            .into());
        }
        validate_password(new_password)?;

        let account = self.require_account(account_id).await?;

        if !self.hasher.verify(old_password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        // The stored digest matches the old password, which differs from the new one
        let password_hash = hash_if_changed(self.hasher.as_ref(), None, new_password)?;

        if !self.store.update_password(account_id, &password_hash).await? {
            return Err(AppError::Internal(format!(
                "Account {} disappeared during password change",
                account_id
            )));
        }

        tracing::info!(
            request_id = %context.request_id,
            operation = context.operation,
            account_id = %account_id,
            "Password changed"
        );

        Ok(())
    }

    /// # Errors
    /// - Validation: nothing to update, or a field is malformed
    /// - Conflict: email belongs to another account
    pub async fn update_account_details(
        &self,
        account_id: Uuid,
        update: AccountUpdate,
    ) -> Result<PublicAccount, AppError> {
        let display_name = require(&update.display_name)
            .map(is_valid_display_name)
            .transpose()?;
        let email = require(&update.email).map(is_valid_email).transpose()?;

        if display_name.is_none() && email.is_none() {
            return Err(ValidationError::MissingFields(vec![
                "displayName".to_string(),
                "email".to_string(),
            ])
            .into());
        }

        let account = self
            .store
            .update_details(account_id, AccountChanges { display_name, email })
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Authenticated account {} not found during update",
                    account_id
                ))
            })?;

        tracing::info!(account_id = %account.id, "Account details updated");

        Ok(account.public())
    }

    async fn require_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        self.store.find_by_id(account_id).await?.ok_or_else(|| {
            AppError::Internal(format!("Authenticated account {} not found", account_id))
        })
    }

    fn issue_tokens(&self, account: &Account) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.codec.issue_access_token(account)?,
            refresh_token: self.codec.issue_refresh_token(account.id)?,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_ttl(),
        })
    }
}

/// Present and non-blank
fn require(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn optional_reference(value: &Option<String>) -> Option<String> {
    require(value).map(|v| v.trim().to_string())
}
