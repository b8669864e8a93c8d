/// Account records
///
/// `Account` is the full stored row and never leaves the server.
/// `PublicAccount` is the projection returned to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    /// SHA-256 digest of the single live refresh token, if any
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Strip the password hash and refresh token
    pub fn public(&self) -> PublicAccount {
        PublicAccount {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            cover_image_url: self.cover_image_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "avatar")]
    pub avatar_url: Option<String>,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated, normalised input for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Partial update of the non-credential fields
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "u1".to_string(),
            email: "u1@x.com".to_string(),
            display_name: "User One".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
            cover_image_url: None,
            refresh_token_hash: Some("abc123".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_projection_excludes_secrets() {
        let account = sample_account();
        let json = serde_json::to_value(account.public()).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.keys().all(|k| !k.to_lowercase().contains("password")));
        assert!(obj.keys().all(|k| !k.to_lowercase().contains("refresh")));
        assert_eq!(obj["username"], "u1");
        assert_eq!(obj["displayName"], "User One");
        assert_eq!(obj["avatar"], "https://cdn.example.com/a.png");
        assert!(obj["coverImage"].is_null());
    }

    #[test]
    fn test_public_projection_is_stable() {
        let account = sample_account();
        assert_eq!(account.public(), account.public());
    }
}
