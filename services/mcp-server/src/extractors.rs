//! Axum extractors for caller credentials

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use fprime_auth_core::{AuthError, SESSION_COOKIE};
use fprime_types::AuthToken;

use crate::error::ApiError;
use crate::state::AppState;

/// Where the caller's credential came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `fprime_session` cookie holding a session id
    Session(String),
    None,
}

impl Credential {
    /// Bearer header first, then the session cookie
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        if let Some(value) = headers.get(header::AUTHORIZATION) {
            let value = value
                .to_str()
                .map_err(|_| ApiError::BadRequest("Invalid Authorization header encoding".into()))?;
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Ok(Self::Bearer(token.to_string()));
                }
            }
        }

        match session_cookie(headers)? {
            Some(id) => Ok(Self::Session(id)),
            None => Ok(Self::None),
        }
    }
}

/// Session id from the `Cookie` header, if present
pub fn session_cookie(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let prefix = format!("{SESSION_COOKIE}=");
    for value in headers.get_all(header::COOKIE) {
        let cookies = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid Cookie header encoding".into()))?;
        for cookie in cookies.split(';') {
            if let Some(id) = cookie.trim().strip_prefix(&prefix) {
                if !id.is_empty() {
                    return Ok(Some(id.to_string()));
                }
            }
        }
    }
    Ok(None)
}

/// Authenticated caller. Rejects with 401 when no credential is present or
/// the credential does not validate.
#[derive(Debug, Clone)]
pub struct Caller(pub AuthToken);

impl<S> FromRequestParts<S> for Caller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = match Credential::from_headers(&parts.headers)? {
            Credential::Bearer(raw) => app_state.authenticator.authenticate(&raw).await,
            Credential::Session(id) => app_state.auth.session_token(&id).await,
            Credential::None => Err(AuthError::Unauthenticated),
        }
        .map_err(|e| {
            tracing::debug!(error = %e, "Caller authentication failed");
            ApiError::from(e)
        })?;
        Ok(Self(token))
    }
}

/// Raw bearer for the dispatcher, which authenticates it itself.
///
/// A session cookie is resolved to its current access token (refreshing
/// when needed). A cookie naming no live session counts as no credential,
/// so public tools stay reachable.
#[derive(Debug, Clone)]
pub struct CallerBearer(pub Option<String>);

impl<S> FromRequestParts<S> for CallerBearer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match Credential::from_headers(&parts.headers)? {
            Credential::Bearer(raw) => Ok(Self(Some(raw))),
            Credential::Session(id) => match app_state.auth.session_token(&id).await {
                Ok(token) => Ok(Self(Some(token.raw().to_string()))),
                Err(AuthError::Unauthenticated) => Ok(Self(None)),
                Err(e) => Err(e.into()),
            },
            Credential::None => Ok(Self(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let headers = headers(&[
            (header::AUTHORIZATION, "Bearer abc"),
            (header::COOKIE, "fprime_session=s1"),
        ]);
        assert_eq!(
            Credential::from_headers(&headers).unwrap(),
            Credential::Bearer("abc".into())
        );
    }

    #[test]
    fn test_cookie_among_others() {
        let headers = headers(&[(header::COOKIE, "theme=dark; fprime_session=s1; other=x")]);
        assert_eq!(
            Credential::from_headers(&headers).unwrap(),
            Credential::Session("s1".into())
        );
    }

    #[test]
    fn test_blank_bearer_and_non_bearer_schemes_ignored() {
        assert_eq!(
            Credential::from_headers(&headers(&[(header::AUTHORIZATION, "Bearer   ")])).unwrap(),
            Credential::None
        );
        assert_eq!(
            Credential::from_headers(&headers(&[(header::AUTHORIZATION, "Basic dXNlcg==")]))
                .unwrap(),
            Credential::None
        );
    }

    #[test]
    fn test_empty_session_cookie_ignored() {
        let headers = headers(&[(header::COOKIE, "fprime_session=")]);
        assert_eq!(session_cookie(&headers).unwrap(), None);
    }
}
