use crate::config::SessionConfig;
use crate::error::{AuthError, EndpointError};
use crate::token::TokenGrant;
use anyhow::Result;
use async_trait::async_trait;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grants the session needs from the identity provider
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, EndpointError>;

    async fn password(&self, username: &str, password: &str) -> Result<TokenGrant, EndpointError>;

    async fn authorization_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<TokenGrant, EndpointError>;
}

/// OIDC providers return an `id_token` next to the OAuth fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type GatewayTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type GatewayClient = Client<
    BasicErrorResponse,
    GatewayTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Everything needed to start a browser sign-in and finish it later
#[derive(Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

impl fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("url", &self.url)
            .field("csrf_state", &self.csrf_state)
            .field("pkce_verifier", &"<redacted>")
            .finish()
    }
}

/// Token endpoint of the identity gateway, spoken through the `oauth2` client
pub struct OAuthTokenEndpoint {
    client: GatewayClient,
    scopes: Vec<Scope>,
}

impl OAuthTokenEndpoint {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let client = GatewayClient::new(
            ClientId::new(config.client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(config.authorize_url())?,
            Some(TokenUrl::new(config.token_url())?),
        )
        // The gateway expects client credentials as form fields, not Basic auth
        .set_auth_type(AuthType::RequestBody)
        .set_redirect_uri(RedirectUrl::new(config.redirect_url.clone())?);

        Ok(Self {
            client,
            scopes: config
                .scope_list()
                .map(|s| Scope::new(s.to_string()))
                .collect(),
        })
    }

    /// Authorization URL with a fresh CSRF state and PKCE S256 challenge
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: url.to_string(),
            csrf_state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }
}

#[async_trait]
impl TokenEndpoint for OAuthTokenEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, EndpointError> {
        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let response = self
            .client
            .exchange_refresh_token(&refresh_token)
            .request_async(async_http_client)
            .await
            .map_err(map_token_error)?;
        Ok(into_grant(response))
    }

    async fn password(&self, username: &str, password: &str) -> Result<TokenGrant, EndpointError> {
        let username = ResourceOwnerUsername::new(username.to_string());
        let password = ResourceOwnerPassword::new(password.to_string());
        let response = self
            .client
            .exchange_password(&username, &password)
            .add_scopes(self.scopes.iter().cloned())
            .request_async(async_http_client)
            .await
            .map_err(map_token_error)?;
        Ok(into_grant(response))
    }

    async fn authorization_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<TokenGrant, EndpointError> {
        let mut request = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()));
        }
        let response = request
            .request_async(async_http_client)
            .await
            .map_err(map_token_error)?;
        Ok(into_grant(response))
    }
}

fn into_grant(response: GatewayTokenResponse) -> TokenGrant {
    TokenGrant {
        access_token: response.access_token().secret().clone(),
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
        id_token: response.extra_fields().id_token.clone(),
        expires_in: response.expires_in(),
    }
}

fn map_token_error<RE>(error: RequestTokenError<RE, BasicErrorResponse>) -> EndpointError
where
    RE: std::error::Error + 'static,
{
    match error {
        RequestTokenError::ServerResponse(response) => EndpointError::Rejected(response.to_string()),
        RequestTokenError::Request(e) => EndpointError::Transport(e.to_string()),
        RequestTokenError::Parse(e, _body) => EndpointError::InvalidResponse(e.to_string()),
        RequestTokenError::Other(message) => EndpointError::InvalidResponse(message),
    }
}

/// Query parameters the provider appends to the redirect URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Validates the callback against the state issued with the authorization request
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::SignIn(self.error_description.unwrap_or(error)));
        }
        let code = self
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::SignIn("No authorization code received".to_string()))?;
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::SignIn("Invalid state parameter".to_string()));
        }
        Ok(code)
    }
}
