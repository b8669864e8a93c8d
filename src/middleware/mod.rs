/// Middleware module
///
/// Request authentication and request logging.

mod authenticator;
mod logger;

pub use authenticator::{bearer_token, resolve_identity, Authenticator, CurrentAccount};
pub use logger::LoggerMiddleware;
