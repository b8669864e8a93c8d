/// Request Authenticator
///
/// Gate for routes that need an identity. Resolves the bearer credential
/// (cookie first, then `Authorization: Bearer`), verifies it with the access
/// secret, loads the account and attaches it to the request extensions as
/// `CurrentAccount`. Any failure short-circuits with 401.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{SessionManager, TokenCodec, ACCESS_TOKEN_COOKIE};
use crate::error::{AppError, AuthError};
use crate::store::{CredentialStore, PublicAccount};

/// Identity resolved by `Authenticator`, read by handlers via `web::ReqData`
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub PublicAccount);

/// Access token from the `accessToken` cookie, else from the Authorization header
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.cookie(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| {
            req.headers()
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
        })
}

/// Turn an optional bearer token into the public view of its account
///
/// # Errors
/// Unauthorized when the token is absent, fails verification, or names an
/// account that no longer exists
pub async fn resolve_identity(
    token: Option<String>,
    codec: &TokenCodec,
    store: &dyn CredentialStore,
) -> Result<PublicAccount, AppError> {
    let token = token.ok_or(AuthError::MissingToken)?;
    let claims = codec.verify_access_token(&token)?;

    let account = store
        .find_by_id(claims.account_id()?)
        .await?
        .ok_or_else(|| AuthError::TokenInvalid("Invalid access token".to_string()))?;

    Ok(account.public())
}

#[derive(Clone)]
pub struct Authenticator {
    sessions: SessionManager,
}

impl Authenticator {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticator
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticatorService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthenticatorService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct AuthenticatorService<S> {
    service: Rc<S>,
    sessions: SessionManager,
}

impl<S, B> Service<ServiceRequest> for AuthenticatorService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = bearer_token(req.request());
        let service = self.service.clone();
        let sessions = self.sessions.clone();

        Box::pin(async move {
            match resolve_identity(token, sessions.codec(), sessions.store().as_ref()).await {
                Ok(account) => {
                    tracing::debug!(
                        account_id = %account.id,
                        username = %account.username,
                        "Request authenticated"
                    );
                    req.extensions_mut().insert(CurrentAccount(account));
                    service.call(req).await
                }
                Err(e) => {
                    tracing::warn!(path = %req.path(), "Request authentication failed: {}", e);
                    Err(e.into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BcryptHasher, Credentials, Registration};
    use crate::configuration::AuthSettings;
    use crate::store::InMemoryCredentialStore;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};
    use std::sync::Arc;

    fn sessions() -> SessionManager {
        let settings = AuthSettings {
            access_token_secret: "access-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            refresh_token_expiry: 864000,
            issuer: "test".to_string(),
            cookie_secure: false,
            password_hash_cost: 4,
        };
        SessionManager::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(BcryptHasher::new(4)),
            &settings,
        )
        .unwrap()
    }

    async fn access_token_for(sessions: &SessionManager, username: &str) -> String {
        sessions
            .register(Registration {
                username: Some(username.to_string()),
                email: Some(format!("{}@x.com", username)),
                display_name: Some("Test".to_string()),
                password: Some("pw1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        sessions
            .login(Credentials {
                username: Some(username.to_string()),
                email: None,
                password: Some("pw1".to_string()),
            })
            .await
            .unwrap()
            .tokens
            .access_token
    }

    async fn whoami(account: web::ReqData<CurrentAccount>) -> HttpResponse {
        HttpResponse::Ok().body(account.0.username.clone())
    }

    #[actix_web::test]
    async fn test_cookie_takes_precedence_over_header() {
        let req = test::TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "from-cookie"))
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("from-cookie"));

        let req = test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("from-header"));

        let req = test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwdw=="))
            .to_http_request();
        assert!(bearer_token(&req).is_none());
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let sessions = sessions();
        let token = access_token_for(&sessions, "u1").await;

        let app = test::init_service(
            App::new()
                .wrap(Authenticator::new(sessions))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;

        assert_eq!(body, web::Bytes::from_static(b"u1"));
    }

    #[actix_web::test]
    async fn test_missing_and_invalid_tokens_are_rejected() {
        let sessions = sessions();
        let app = test::init_service(
            App::new()
                .wrap(Authenticator::new(sessions.clone()))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let missing = test::TestRequest::get().uri("/me").to_request();
        let err = test::try_call_service(&app, missing).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let forged = test::TestRequest::get()
            .uri("/me")
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "forged.token.value"))
            .to_request();
        let err = test::try_call_service(&app, forged).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        // A refresh token is signed with the other secret
        let refresh = sessions
            .codec()
            .issue_refresh_token(uuid::Uuid::new_v4())
            .unwrap();
        let wrong_kind = test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, format!("Bearer {}", refresh)))
            .to_request();
        let err = test::try_call_service(&app, wrong_kind).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_expired_access_token_is_rejected() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let sessions = sessions();
        let token = access_token_for(&sessions, "u1").await;
        let mut claims = sessions.codec().verify_access_token(&token).unwrap();
        claims.exp = chrono::Utc::now().timestamp() - 3600;

        let expired = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"access-secret-key-at-least-32-characters"),
        )
        .unwrap();

        let result =
            resolve_identity(Some(expired), sessions.codec(), sessions.store().as_ref()).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenExpired))));
    }

    #[actix_web::test]
    async fn test_token_for_deleted_account_is_rejected() {
        let sessions = sessions();
        let store = InMemoryCredentialStore::new();
        let token = access_token_for(&sessions, "u1").await;

        // Same secrets, but a store that never saw the account
        let result = resolve_identity(Some(token), sessions.codec(), &store).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenInvalid(_)))));
    }
}
