/// Authentication module
///
/// Token signing/verification, password hashing, refresh token
/// fingerprints and the session lifecycle built on top of them.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{AccessClaims, RefreshClaims};
pub use jwt::{verify, TokenCodec};
pub use password::{hash_if_changed, BcryptHasher, PasswordHasher};
pub use refresh_token::fingerprint;
pub use session::{
    AccountUpdate, Credentials, LoginOutcome, PasswordChange, Registration, SessionManager,
    TokenPair,
};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
