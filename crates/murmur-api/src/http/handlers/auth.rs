//! Signup, login, and logout handlers.
//!
//! A successful signup or login creates a session and returns its id in the
//! `session_id` cookie. Logout revokes that session and clears the cookie.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};

use murmur_types::config::ServerConfig;
use murmur_types::session::SessionId;

use crate::http::error::{AppError, INVALID_BODY, NO_ACTIVE_SESSION};
use crate::state::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub repeat_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn session_cookie(config: &ServerConfig, id: &SessionId) -> Cookie<'static> {
    let max_age = i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, id.as_str().to_owned()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let Json(req) = payload.map_err(|_| AppError::BadRequest(INVALID_BODY))?;

    let identity = state
        .accounts
        .signup(&req.username, &req.password, &req.repeat_password)
        .await?;
    let session_id = state.sessions().create(identity).await;

    Ok((
        jar.add(session_cookie(&state.config, &session_id)),
        Json(json!({ "message": "Signed up and logged in successfully" })),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let Json(req) = payload.map_err(|_| AppError::BadRequest(INVALID_BODY))?;

    let identity = state.accounts.login(&req.username, &req.password).await?;
    tracing::info!(user_id = %identity.user_id, username = %identity.username, "user logged in");
    let session_id = state.sessions().create(identity).await;

    Ok((
        jar.add(session_cookie(&state.config, &session_id)),
        Json(json!({ "message": "Logged in successfully" })),
    ))
}

/// POST /logout
///
/// Requires the cookie to name a live session. Existing realtime connections
/// opened with that session stay open.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|c| SessionId::from(c.value()))
        .ok_or(AppError::Unauthorized(NO_ACTIVE_SESSION))?;

    if !state.sessions().revoke(&session_id).await {
        return Err(AppError::Unauthorized(NO_ACTIVE_SESSION));
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(json!({ "message": "Logged out successfully" })),
    ))
}
