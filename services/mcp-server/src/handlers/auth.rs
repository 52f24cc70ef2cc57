//! Browser login flow handlers

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use fprime_auth_core::SESSION_COOKIE;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{session_cookie, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub redirect_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    /// `None` when the token carried no groups claim
    pub groups: Option<Vec<String>>,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub is_member: bool,
}

/// Redirect into the identity provider
pub async fn login(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> ApiResult<Response> {
    let url = state.auth.begin_login(params.redirect_to.as_deref()).await?;
    found(url.as_str(), None)
}

/// Finish the code flow, open a session, and send the browser on
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Identity provider returned an error");
        let message = match params.error_description {
            Some(detail) => format!("identity provider error: {error}: {detail}"),
            None => format!("identity provider error: {error}"),
        };
        return Err(ApiError::BadRequest(message));
    }
    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return Err(ApiError::BadRequest("missing code or state".into()));
    };

    let outcome = state.auth.complete_login(&code, &login_state).await?;
    let max_age = state.auth.config().session_duration.as_secs();
    let cookie = session_cookie_header(&outcome.session_id, max_age, state.config.secure_cookies());
    found(&outcome.redirect_to, Some(cookie))
}

/// Current caller's identity
pub async fn current_user(State(state): State<AppState>, Caller(token): Caller) -> Json<UserInfo> {
    let is_member = state.auth.is_member(&token);
    let claims = token.claims();
    Json(UserInfo {
        subject: claims.subject.clone(),
        display_name: claims.display_name().to_string(),
        email: claims.email.clone(),
        groups: claims
            .capabilities
            .groups
            .as_ref()
            .map(|groups| groups.iter().cloned().collect()),
        roles: claims.capabilities.roles.iter().cloned().collect(),
        expires_at: claims.expires_at,
        is_member,
    })
}

/// End the session and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(id) = session_cookie(&headers)? {
        state.auth.logout(&id).await;
    }
    let cleared = session_cookie_header("", 0, state.config.secure_cookies());
    found("/", Some(cleared))
}

fn session_cookie_header(session_id: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// 302 to `location`, optionally setting a cookie
fn found(location: &str, cookie: Option<String>) -> ApiResult<Response> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| ApiError::BadRequest("invalid redirect target".into()))?;
    let mut response = (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|_| ApiError::BadRequest("invalid session cookie".into()))?;
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}
