/// Password Hashing and Verification
///
/// The hashing primitive sits behind `PasswordHasher` so the session layer
/// receives it as an explicit collaborator. Production uses bcrypt.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

// bcrypt only reads the first 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Resolve the digest to store for `incoming`.
///
/// Returns `existing` untouched when it already matches `incoming`, and a
/// fresh hash otherwise (always the case at registration, where there is no
/// existing digest).
pub fn hash_if_changed(
    hasher: &dyn PasswordHasher,
    existing: Option<&str>,
    incoming: &str,
) -> Result<String, AppError> {
    if let Some(existing) = existing {
        if hasher.verify(incoming, existing)? {
            return Ok(existing.to_string());
        }
    }
    hasher.hash(incoming)
}

/// Reject passwords the hasher cannot faithfully represent
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    Ok(())
}
