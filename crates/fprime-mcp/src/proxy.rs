//! Client for the VC proxy backend
//!
//! Every proxy-backed tool is one POST to `{base_url}?endpoint={name}` with
//! a JSON body.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("proxy backend is not configured")]
    NotConfigured,

    #[error("proxy call failed: status={status}, body={body}")]
    Status { status: u16, body: String },

    #[error("proxy returned a non-JSON body: {0}")]
    NonJson(String),

    #[error("proxy transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Clone)]
pub struct ProxyClient {
    http_client: reqwest::Client,
    base_url: Option<Url>,
    auth_token: Option<String>,
}

impl ProxyClient {
    /// `base_url` of `None` leaves every proxy tool answering `NotImplemented`
    pub fn new(base_url: Option<Url>, auth_token: Option<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http_client,
            base_url,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Base URL with `endpoint` set, other query parameters kept
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ProxyError> {
        let base = self.base_url.as_ref().ok_or(ProxyError::NotConfigured)?;
        let kept: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(k, _)| k != "endpoint")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut url = base.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("endpoint", endpoint);
        Ok(url)
    }

    /// POST `payload` to `endpoint`. The configured proxy token is sent as
    /// the authorization header, or the caller's bearer when none is set.
    pub async fn post(
        &self,
        endpoint: &str,
        payload: &Value,
        caller_bearer: Option<&str>,
    ) -> Result<Value, ProxyError> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.http_client.post(url).json(payload);
        if let Some(token) = self.auth_token.as_deref().or(caller_bearer) {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(endpoint, status = status.as_u16(), "Proxy call failed");
            return Err(ProxyError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }
        serde_json::from_str(&text).map_err(|_| ProxyError::NonJson(text.chars().take(500).collect()))
    }
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str, token: Option<&str>) -> ProxyClient {
        ProxyClient::new(
            Some(Url::parse(base).unwrap()),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_endpoint_url_replaces_endpoint_param() {
        let c = client("https://proxy.example.com/api?stage=prod&endpoint=old", None);
        let url = c.endpoint_url("get_similars").unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/api?stage=prod&endpoint=get_similars"
        );
    }

    #[test]
    fn test_unconfigured() {
        let c = ProxyClient::new(None, None, Duration::from_secs(5));
        assert_eq!(c.endpoint_url("x").unwrap_err(), ProxyError::NotConfigured);
    }

    #[tokio::test]
    async fn test_post_sends_token_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/proxy"))
            .and(query_param("endpoint", "map_theme"))
            .and(header("authorization", "proxy-secret"))
            .and(body_json(json!({"theme": "oncology"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mapped": true})))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&format!("{}/proxy", server.uri()), Some("proxy-secret"));
        let out = c
            .post("map_theme", &json!({"theme": "oncology"}), Some("user-token"))
            .await
            .unwrap();
        assert_eq!(out, json!({"mapped": true}));
    }

    #[tokio::test]
    async fn test_post_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let c = client(&server.uri(), None);
        let err = c.post("get_similars", &json!({}), None).await.unwrap_err();
        assert_eq!(
            err,
            ProxyError::Status {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn test_post_non_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let c = client(&server.uri(), None);
        let err = c.post("get_similars", &json!({}), None).await.unwrap_err();
        assert!(matches!(err, ProxyError::NonJson(_)));
    }
}
