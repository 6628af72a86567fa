use thiserror::Error;

/// Failures talking to the provider's token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The provider answered with an OAuth error response
    #[error("token endpoint rejected the request: {0}")]
    Rejected(String),
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    #[error("unexpected token endpoint response: {0}")]
    InvalidResponse(String),
}

/// Session-level failures. Cloned to every caller waiting on a shared refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("session has no refresh token")]
    NoRefreshToken,
    #[error("refresh token rejected: {0}")]
    RefreshRejected(String),
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    /// Sticky marker left by an earlier failed refresh
    #[error("session expired: {0}")]
    SessionExpired(String),
    #[error("sign-in failed: {0}")]
    SignIn(String),
}

impl AuthError {
    /// True when the caller must send the user back through sign-in
    pub fn requires_reauthentication(&self) -> bool {
        !matches!(self, AuthError::SignIn(_))
    }
}

impl From<EndpointError> for AuthError {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::Rejected(reason) => AuthError::RefreshRejected(reason),
            other => AuthError::RefreshFailed(other.to_string()),
        }
    }
}

/// Outcome of [`crate::Session::authorized_request`]
#[derive(Debug, Error)]
pub enum AuthorizedError<E> {
    #[error(transparent)]
    Auth(AuthError),
    /// The request was refused even after a forced refresh
    #[error("request unauthorized after token refresh: {0}")]
    Unauthorized(E),
    #[error(transparent)]
    Request(E),
}

impl<E> AuthorizedError<E> {
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            AuthorizedError::Auth(e) => e.requires_reauthentication(),
            AuthorizedError::Unauthorized(_) => true,
            AuthorizedError::Request(_) => false,
        }
    }
}
