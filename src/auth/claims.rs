/// JWT Claims structures
///
/// Access tokens carry an identity snapshot so most handlers never need to
/// hit the store. Refresh tokens carry only the account id plus a unique `jti`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::Account;

/// Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl AccessClaims {
    pub fn new(account: &Account, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account.id.to_string(),
            email: account.email.clone(),
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        parse_subject(&self.sub)
    }
}

/// Claims for refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Unique token id; keeps two tokens issued in the same second distinct
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(account_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        parse_subject(&self.sub)
    }
}

fn parse_subject(sub: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(sub).map_err(|_| AuthError::TokenInvalid("Malformed token subject".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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
    fn test_access_claims_snapshot() {
        let account = account();
        let claims = AccessClaims::new(&account, 3600, "test".to_string());

        assert_eq!(claims.account_id().unwrap(), account.id);
        assert_eq!(claims.username, "u1");
        assert_eq!(claims.email, "u1@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["displayName"], "User One");
    }

    #[test]
    fn test_refresh_claims_are_unique() {
        let id = Uuid::new_v4();
        let a = RefreshClaims::new(id, 60, "test".to_string());
        let b = RefreshClaims::new(id, 60, "test".to_string());

        assert_eq!(a.sub, b.sub);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_invalid_subject() {
        let mut claims = RefreshClaims::new(Uuid::new_v4(), 60, "test".to_string());
        claims.sub = "invalid-uuid".to_string();

        assert!(matches!(claims.account_id(), Err(AuthError::TokenInvalid(_))));
    }
}
