/// Token Codec
///
/// Signs and verifies the two bearer token classes. Each class has its own
/// secret and lifetime taken from `AuthSettings` at construction.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ConfigError};
use crate::store::Account;

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl SigningKeys {
    fn new(name: &str, secret: &str, ttl_seconds: i64) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired(format!("auth.{}_token_secret", name)));
        }
        if ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "auth.{}_token_expiry must be positive",
                name
            )));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        })
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
}

impl TokenCodec {
    /// Build the codec from configuration
    ///
    /// # Errors
    /// Returns a configuration error if either secret is empty or a
    /// lifetime is not positive
    pub fn new(settings: &AuthSettings) -> Result<Self, AppError> {
        Ok(Self {
            access: SigningKeys::new(
                "access",
                &settings.access_token_secret,
                settings.access_token_expiry,
            )?,
            refresh: SigningKeys::new(
                "refresh",
                &settings.refresh_token_secret,
                settings.refresh_token_expiry,
            )?,
            issuer: settings.issuer.clone(),
        })
    }

    /// Access token lifetime in seconds
    pub fn access_ttl(&self) -> i64 {
        self.access.ttl_seconds
    }

    pub fn issue_access_token(&self, account: &Account) -> Result<String, AppError> {
        let claims = AccessClaims::new(account, self.access.ttl_seconds, self.issuer.clone());
        sign(&claims, &self.access.encoding)
    }

    pub fn issue_refresh_token(&self, account_id: Uuid) -> Result<String, AppError> {
        let claims = RefreshClaims::new(account_id, self.refresh.ttl_seconds, self.issuer.clone());
        sign(&claims, &self.refresh.encoding)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        verify(token, &self.access.decoding, &self.issuer)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        verify(token, &self.refresh.decoding, &self.issuer)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, AppError> {
    encode(&Header::default(), claims, key)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify signature, expiry and issuer, then extract the claims
///
/// # Errors
/// `TokenExpired` once `exp` has passed, `TokenInvalid` for anything else
pub fn verify<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    issuer: &str,
) -> Result<T, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);

    decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                tracing::debug!("JWT validation error: {}", e);
                AuthError::TokenInvalid(format!("Invalid token: {}", e))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn get_test_settings() -> AuthSettings {
        AuthSettings {
            access_token_secret: "access-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
            cookie_secure: false,
            password_hash_cost: 4,
        }
    }

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "u1".to_string(),
            email: "u1@x.com".to_string(),
            display_name: "User One".to_string(),
            password_hash: "hash".to_string(),
            avatar_url: None,
            cover_image_url: None,
            refresh_token_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let codec = TokenCodec::new(&get_test_settings()).unwrap();
        let account = account();

        let token = codec.issue_access_token(&account).expect("Failed to issue token");
        let claims = codec.verify_access_token(&token).expect("Failed to verify token");

        assert_eq!(claims.account_id().unwrap(), account.id);
        assert_eq!(claims.username, "u1");
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_refresh_tokens_differ_per_issue() {
        let codec = TokenCodec::new(&get_test_settings()).unwrap();
        let id = Uuid::new_v4();

        let first = codec.issue_refresh_token(id).unwrap();
        let second = codec.issue_refresh_token(id).unwrap();

        assert_ne!(first, second);
        assert_eq!(codec.verify_refresh_token(&first).unwrap().account_id().unwrap(), id);
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let codec = TokenCodec::new(&get_test_settings()).unwrap();
        let account = account();

        let access = codec.issue_access_token(&account).unwrap();
        let refresh = codec.issue_refresh_token(account.id).unwrap();

        assert!(matches!(
            codec.verify_refresh_token(&access),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            codec.verify_access_token(&refresh),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_tampered_token() {
        let codec = TokenCodec::new(&get_test_settings()).unwrap();
        let token = codec.issue_access_token(&account()).unwrap();

        let tampered = format!("{}X", token);
        assert!(matches!(
            codec.verify_access_token(&tampered),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(codec.verify_access_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_expired_token() {
        let settings = get_test_settings();
        let codec = TokenCodec::new(&settings).unwrap();

        let mut claims = AccessClaims::new(&account(), 3600, "test".to_string());
        claims.exp = Utc::now().timestamp() - 3600;
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(settings.access_token_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            codec.verify_access_token(&token).unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let mut settings = get_test_settings();
        let token = TokenCodec::new(&settings)
            .unwrap()
            .issue_access_token(&account())
            .unwrap();

        settings.issuer = "wrong-issuer".to_string();
        let codec = TokenCodec::new(&settings).unwrap();

        assert!(codec.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let mut settings = get_test_settings();
        settings.refresh_token_secret = "  ".to_string();

        assert!(matches!(
            TokenCodec::new(&settings),
            Err(AppError::Config(ConfigError::MissingRequired(_)))
        ));
    }

    #[test]
    fn test_non_positive_ttl_is_config_error() {
        let mut settings = get_test_settings();
        settings.access_token_expiry = 0;

        assert!(matches!(
            TokenCodec::new(&settings),
            Err(AppError::Config(ConfigError::InvalidValue(_)))
        ));
    }
}
