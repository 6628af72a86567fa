use crate::config::SessionConfig;
use crate::error::AuthorizedError;
use crate::request::RequestRejection;
use crate::session::Session;
use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response envelope used by the gateway's APIs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReturn<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiReturn<T> {
    /// Error messages of a failed call, falling back to the top-level message
    pub fn error_messages(&self) -> Vec<String> {
        if !self.errors.is_empty() {
            return self.errors.iter().map(|e| e.message.clone()).collect();
        }
        self.message.iter().cloned().collect()
    }

    pub fn into_result(self) -> Result<T> {
        if !self.success {
            let messages = self.error_messages();
            if messages.is_empty() {
                bail!("API call failed");
            }
            bail!("API call failed: {}", messages.join("; "));
        }
        self.result.context("API response missing result")
    }
}

#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("HTTP {status}: {}", message_from_body(.body))]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The gateway's own error messages when the body is an [`ApiReturn`]
    pub fn message(&self) -> String {
        match self {
            HttpError::Status { body, .. } => message_from_body(body),
            other => other.to_string(),
        }
    }
}

impl RequestRejection for HttpError {
    fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

fn message_from_body(body: &str) -> String {
    serde_json::from_str::<ApiReturn<serde_json::Value>>(body)
        .ok()
        .map(|envelope| envelope.error_messages())
        .filter(|messages| !messages.is_empty())
        .map(|messages| messages.join("; "))
        .unwrap_or_else(|| body.to_string())
}

/// Bearer-authenticated client for the admin console's backend APIs
pub struct ApiClient {
    client: Client,
    base_url: String,
    search_param: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session, config: &SessionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_param: config.search_param.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AuthorizedError<HttpError>> {
        let url = self.url(path);
        self.send(|| self.client.get(&url).query(query)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AuthorizedError<HttpError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.send(|| self.client.post(&url).json(body)).await
    }

    /// Runs a search with `dsl` in the configured query parameter. An empty
    /// expression sends no filter at all.
    pub async fn search<T: DeserializeOwned>(
        &self,
        path: &str,
        dsl: &str,
    ) -> Result<T, AuthorizedError<HttpError>> {
        if dsl.trim().is_empty() {
            return self.get_json(path, &[]).await;
        }
        self.get_json(path, &[(self.search_param.as_str(), dsl)])
            .await
    }

    async fn send<T, F>(&self, build: F) -> Result<T, AuthorizedError<HttpError>>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        self.session
            .authorized_request(|token| execute(build().bearer_auth(token)))
            .await
    }
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, HttpError> {
    let response = request
        .send()
        .await
        .map_err(|e| HttpError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| HttpError::Transport(e.to_string()))?;

    if !status.is_success() {
        tracing::debug!(%status, "API request failed");
        return Err(HttpError::Status { status, body });
    }

    serde_json::from_str(&body).map_err(|e| HttpError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::TokenEndpoint;
    use crate::error::{AuthError, EndpointError};
    use crate::token::{TokenGrant, TokenSet};
    use async_trait::async_trait;
    use chrono::Utc;
    use mockito::{Matcher, Server};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct RotatingEndpoint {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenEndpoint for RotatingEndpoint {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, EndpointError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenGrant::new(format!("fresh-{}", n)).with_expires_in(Duration::from_secs(3600)))
        }

        async fn password(&self, _: &str, _: &str) -> Result<TokenGrant, EndpointError> {
            Err(EndpointError::Rejected("unsupported".to_string()))
        }

        async fn authorization_code(&self, _: &str, _: Option<&str>) -> Result<TokenGrant, EndpointError> {
            Err(EndpointError::Rejected("unsupported".to_string()))
        }
    }

    fn signed_in_client(server_url: &str) -> (ApiClient, Arc<RotatingEndpoint>) {
        let endpoint = Arc::new(RotatingEndpoint {
            calls: AtomicUsize::new(0),
        });
        let config = SessionConfig::new(server_url, "admin-console");
        let session = Session::from_config(&config, endpoint.clone());
        session.sign_in(TokenSet::from_grant(
            TokenGrant::new("stale")
                .with_refresh_token("r1")
                .with_expires_in(Duration::from_secs(3600)),
            Utc::now(),
            Duration::from_secs(300),
        ));
        let client = ApiClient::new(server_url, session, &config).unwrap();
        (client, endpoint)
    }

    #[derive(Debug, Deserialize)]
    struct Partner {
        name: String,
    }

    #[tokio::test]
    async fn test_search_sends_dsl_and_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/partners")
            .match_query(Matcher::UrlEncoded(
                "filter".into(),
                r#"name == "Acme""#.into(),
            ))
            .match_header("authorization", "Bearer stale")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"result":[{"name":"Acme"}]}"#)
            .create_async()
            .await;

        let (client, endpoint) = signed_in_client(&server.url());
        let response: ApiReturn<Vec<Partner>> = client
            .search("/api/partners", r#"name == "Acme""#)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
        let partners = response.into_result().unwrap();
        assert_eq!(partners.len(), 1);
        assert_eq!(partners[0].name, "Acme");
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_retries_once() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("GET", "/api/me")
            .match_header("authorization", "Bearer stale")
            .with_status(401)
            .create_async()
            .await;
        let accepted = server
            .mock("GET", "/api/me")
            .match_header("authorization", "Bearer fresh-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Alice"}"#)
            .create_async()
            .await;

        let (client, endpoint) = signed_in_client(&server.url());
        let me: Partner = client.get_json("/api/me", &[]).await.unwrap();

        rejected.assert_async().await;
        accepted.assert_async().await;
        assert_eq!(me.name, "Alice");
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_unauthorized_expires_session() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/me")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;

        let (client, endpoint) = signed_in_client(&server.url());
        let err = client
            .get_json::<Partner>("/api/me", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AuthorizedError::Unauthorized(_)));
        assert!(err.requires_reauthentication());
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            client.session().get_valid_token().await,
            Err(AuthError::SessionExpired(_))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/partners")
            .match_body(Matcher::Json(serde_json::json!({"name": "Acme"})))
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":false,"errors":[{"message":"Name already taken","code":"DUPLICATE"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let (client, endpoint) = signed_in_client(&server.url());
        let err = client
            .post_json::<_, serde_json::Value>("/api/partners", &serde_json::json!({"name": "Acme"}))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
        match err {
            AuthorizedError::Request(e) => {
                assert_eq!(e.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
                assert_eq!(e.message(), "Name already taken");
                assert_eq!(e.to_string(), "HTTP 422 Unprocessable Entity: Name already taken");
            }
            other => panic!("Expected Request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/me")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server.url());
        let err = client.get_json::<Partner>("/api/me", &[]).await.unwrap_err();
        assert!(matches!(err, AuthorizedError::Request(HttpError::Decode(_))));
        assert!(!err.requires_reauthentication());
    }

    #[test]
    fn test_api_return_into_result() {
        let ok: ApiReturn<u32> = serde_json::from_str(r#"{"success":true,"result":7}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), 7);

        let failed: ApiReturn<u32> = serde_json::from_str(
            r#"{"success":false,"message":"ignored","errors":[{"message":"first"},{"message":"second","code":"E2"}]}"#,
        )
        .unwrap();
        assert_eq!(
            failed.into_result().unwrap_err().to_string(),
            "API call failed: first; second"
        );

        let bare: ApiReturn<u32> =
            serde_json::from_str(r#"{"success":false,"message":"Forbidden"}"#).unwrap();
        assert_eq!(bare.error_messages(), vec!["Forbidden".to_string()]);
    }
}
