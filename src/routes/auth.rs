/// Account and Session Routes
///
/// Thin HTTP layer over `SessionManager`: registration, login, token refresh,
/// logout, password change, current account and profile updates. Tokens go
/// out both as http-only cookies and in the response body.

use actix_web::{
    cookie::{Cookie, SameSite},
    http::StatusCode,
    web, HttpRequest, HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{
    AccountUpdate, Credentials, PasswordChange, Registration, SessionManager, TokenPair,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::configuration::AuthSettings;
use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::response::ApiResponse;

/// Token refresh request, used when no `refreshToken` cookie is sent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

fn token_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .finish()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = token_cookie(name, String::new(), secure);
    cookie.make_removal();
    cookie
}

fn session_cookies(tokens: &TokenPair, secure: bool) -> [Cookie<'static>; 2] {
    [
        token_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), secure),
        token_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), secure),
    ]
}

/// POST /api/v1/users/register
///
/// # Errors
/// - 400: Missing or blank username, email, display name or password
/// - 409: Username or email already taken
pub async fn register(
    form: web::Json<Registration>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let account = sessions.register(form.into_inner()).await?;

    Ok(ApiResponse::new(StatusCode::CREATED, account, "User registered successfully").into_response())
}

/// POST /api/v1/users/login
///
/// Accepts a username or an email with the password. Sets the
/// `accessToken` and `refreshToken` cookies.
///
/// # Errors
/// - 400: Neither username nor email, or no password
/// - 404: No such account
/// - 401: Wrong password
pub async fn login(
    form: web::Json<Credentials>,
    sessions: web::Data<SessionManager>,
    auth_settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let outcome = sessions.login(form.into_inner()).await?;
    let [access, refresh] = session_cookies(&outcome.tokens, auth_settings.cookie_secure);

    let response = ApiResponse::new(StatusCode::OK, outcome, "User logged in successfully");
    Ok(response.builder().cookie(access).cookie(refresh).json(response))
}

/// POST /api/v1/users/refresh-token
///
/// The `refreshToken` cookie wins over the `refreshToken` body field. The
/// presented token is consumed and a fresh pair is issued.
///
/// # Errors
/// - 401: No token, bad signature, expired, unknown account, or a token
///   that was already used
pub async fn refresh_access_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    sessions: web::Data<SessionManager>,
    auth_settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let presented = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token));

    let tokens = sessions.refresh(presented.as_deref()).await?;
    let [access, refresh] = session_cookies(&tokens, auth_settings.cookie_secure);

    let response = ApiResponse::new(StatusCode::OK, tokens, "Access token refreshed");
    Ok(response.builder().cookie(access).cookie(refresh).json(response))
}

/// POST /api/v1/users/logout
///
/// Revokes the stored refresh token and clears both cookies.
pub async fn logout(
    current: web::ReqData<CurrentAccount>,
    sessions: web::Data<SessionManager>,
    auth_settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    sessions.logout(current.0.id).await?;

    let response = ApiResponse::new(StatusCode::OK, json!({}), "User logged out");
    Ok(response
        .builder()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE, auth_settings.cookie_secure))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE, auth_settings.cookie_secure))
        .json(response))
}

/// POST /api/v1/users/change-password
///
/// Existing sessions stay valid.
///
/// # Errors
/// - 400: Missing fields, or the new password equals the old one
/// - 401: Old password does not match
pub async fn change_password(
    current: web::ReqData<CurrentAccount>,
    form: web::Json<PasswordChange>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    sessions
        .change_password(current.0.id, form.into_inner())
        .await?;

    Ok(ApiResponse::new(StatusCode::OK, json!({}), "Password changed successfully").into_response())
}

/// GET /api/v1/users/current-user
pub async fn get_current_user(current: web::ReqData<CurrentAccount>) -> HttpResponse {
    let account = current.into_inner().0;

    ApiResponse::new(StatusCode::OK, account, "User fetched successfully").into_response()
}

/// PATCH /api/v1/users/update-account
///
/// # Errors
/// - 400: Display name or email missing or invalid
/// - 409: Email belongs to another account
pub async fn update_account_details(
    current: web::ReqData<CurrentAccount>,
    form: web::Json<AccountUpdate>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let account = sessions
        .update_account_details(current.0.id, form.into_inner())
        .await?;

    Ok(ApiResponse::new(StatusCode::OK, account, "Account details updated successfully")
        .into_response())
}
