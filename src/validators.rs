/// Input validators for account fields
///
/// Each validator trims its input, enforces length limits and a character
/// policy, and returns the normalised value to store. Usernames and emails
/// are lowercased so uniqueness is case-insensitive.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_EMAIL_LOCAL_PART: usize = 64;
const MIN_USERNAME_LENGTH: usize = 2;
const MAX_USERNAME_LENGTH: usize = 30;
const MAX_DISPLAY_NAME_LENGTH: usize = 100;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-z0-9_.-]+$").unwrap();
}

/// Trim and lowercase a login identifier (username or email)
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Validates an email address and returns it trimmed and lowercased
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let normalized = normalize_identifier(email);

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if normalized.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(&normalized) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(normalized)
}

/// Validates a username and returns it trimmed and lowercased
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let normalized = normalize_identifier(username);

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if normalized.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_USERNAME_LENGTH,
        ));
    }

    if normalized.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }

    if !USERNAME_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(normalized)
}

/// Validates a display name and returns it trimmed; case is preserved
pub fn is_valid_display_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("displayName".to_string()));
    }

    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::TooLong(
            "displayName".to_string(),
            MAX_DISPLAY_NAME_LENGTH,
        ));
    }

    // Null bytes and other control characters
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("displayName".to_string()));
    }

    Ok(trimmed.to_string())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if email.matches('@').count() != 1 {
        return true;
    }

    if let Some(at_pos) = email.find('@') {
        if at_pos > MAX_EMAIL_LOCAL_PART {
            return true;
        }
    }

    email.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
        assert!(is_valid_email("u1@x.com").is_ok());
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(is_valid_email("  U1@X.com ").unwrap(), "u1@x.com");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&long_local).is_err());

        assert!(is_valid_email("a@b").is_err()); // Too short
        assert!(is_valid_email("   ").is_err());
    }

    #[test]
    fn test_valid_username() {
        assert_eq!(is_valid_username("u1").unwrap(), "u1");
        assert_eq!(is_valid_username(" Chai_Aur.Code ").unwrap(), "chai_aur.code");
    }

    #[test]
    fn test_invalid_username() {
        assert!(is_valid_username("").is_err());
        assert!(is_valid_username("a").is_err());
        assert!(is_valid_username(&"a".repeat(31)).is_err());
        assert!(is_valid_username("has space").is_err());
        assert!(is_valid_username("semi;colon").is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(is_valid_display_name("  Jean-Pierre O'Brien ").unwrap(), "Jean-Pierre O'Brien");
        assert!(is_valid_display_name("").is_err());
        assert!(is_valid_display_name("Name\0with\0null").is_err());
        assert!(is_valid_display_name(&"a".repeat(101)).is_err());
    }
}
