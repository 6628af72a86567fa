use crate::error::AuthorizedError;
use crate::session::Session;
use std::future::Future;

/// Lets [`Session::authorized_request`] tell an expired-credential response
/// apart from every other failure
pub trait RequestRejection {
    fn is_unauthorized(&self) -> bool;
}

impl Session {
    /// Runs `request` with a valid bearer token.
    ///
    /// When the request is refused as unauthorized, the token is refreshed
    /// (bypassing the local expiry check) and the request is retried once.
    /// A second refusal expires the session. Other errors are returned as-is
    /// and never retried.
    pub async fn authorized_request<T, E, F, Fut>(
        &self,
        mut request: F,
    ) -> Result<T, AuthorizedError<E>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RequestRejection,
    {
        let token = self.get_valid_token().await.map_err(AuthorizedError::Auth)?;

        match request(token.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Request rejected as unauthorized, refreshing token and retrying");
            }
            Err(e) => return Err(AuthorizedError::Request(e)),
        }

        let token = self
            .refresh_after_rejection(&token)
            .await
            .map_err(AuthorizedError::Auth)?;

        match request(token.clone()).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                self.expire_token(&token, "request rejected after token refresh");
                Err(AuthorizedError::Unauthorized(e))
            }
            Err(e) => Err(AuthorizedError::Request(e)),
        }
    }
}
