use crate::config::SessionConfig;
use crate::endpoint::TokenEndpoint;
use crate::error::AuthError;
use crate::token::TokenSet;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthError>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(TokenSet),
    /// A refresh failed; only a new sign-in leaves this state
    Expired { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    Refreshing,
    Expired,
}

struct Slot {
    state: SessionState,
    /// At most one refresh runs per session; every waiter clones this
    in_flight: Option<RefreshFuture>,
    /// Bumped by sign-in and sign-out so a refresh started before them is discarded
    epoch: u64,
}

impl Slot {
    fn current_token(&self) -> Result<String, AuthError> {
        match &self.state {
            SessionState::Anonymous => Err(AuthError::NotSignedIn),
            SessionState::Authenticated(tokens) => Ok(tokens.access_token.clone()),
            SessionState::Expired { reason } => Err(AuthError::SessionExpired(reason.clone())),
        }
    }

    fn expire(&mut self, error: &AuthError) {
        tracing::warn!("Session expired: {}", error);
        self.in_flight = None;
        self.state = SessionState::Expired {
            reason: error.to_string(),
        };
    }
}

struct SessionInner {
    endpoint: Arc<dyn TokenEndpoint>,
    margin: Duration,
    default_lifetime: Duration,
    slot: Mutex<Slot>,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot updates are single assignments, so a poisoned lock still holds consistent data
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_refresh(self: Arc<Self>, refresh_token: String, epoch: u64) -> Result<String, AuthError> {
        tracing::info!("Refreshing access token");
        let result = self.endpoint.refresh(&refresh_token).await;

        let mut slot = self.lock();
        if slot.epoch != epoch {
            tracing::debug!("Discarding refresh result, session changed while it was running");
            return slot.current_token();
        }
        slot.in_flight = None;

        match result {
            Ok(grant) => {
                let now = Utc::now();
                let tokens = match &slot.state {
                    SessionState::Authenticated(previous) => {
                        previous.refreshed(grant, now, self.default_lifetime)
                    }
                    _ => TokenSet::from_grant(grant, now, self.default_lifetime),
                };
                tracing::debug!(expires_at = %tokens.expires_at, "Access token refreshed");
                let access_token = tokens.access_token.clone();
                slot.state = SessionState::Authenticated(tokens);
                Ok(access_token)
            }
            Err(e) => {
                let error = AuthError::from(e);
                slot.expire(&error);
                Err(error)
            }
        }
    }
}

/// Holds the tokens of one signed-in user and keeps them valid.
///
/// Cloning yields another handle to the same session. Concurrent callers
/// that find the access token stale share a single refresh; the refresh runs
/// on its own task, so it completes and updates the session even when every
/// caller waiting on it goes away. A failed refresh leaves the session
/// [`SessionState::Expired`] and no further refresh is attempted until the
/// next sign-in.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, margin: Duration) -> Self {
        Self::with_lifetime(endpoint, margin, DEFAULT_TOKEN_LIFETIME)
    }

    pub fn from_config(config: &SessionConfig, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self::with_lifetime(
            endpoint,
            config.refresh_margin(),
            config.default_token_lifetime(),
        )
    }

    /// `default_lifetime` applies to tokens that carry no expiry of their own
    pub fn with_lifetime(
        endpoint: Arc<dyn TokenEndpoint>,
        margin: Duration,
        default_lifetime: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                endpoint,
                margin,
                default_lifetime,
                slot: Mutex::new(Slot {
                    state: SessionState::Anonymous,
                    in_flight: None,
                    epoch: 0,
                }),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn status(&self) -> SessionStatus {
        let slot = self.inner.lock();
        if slot.in_flight.is_some() {
            return SessionStatus::Refreshing;
        }
        match slot.state {
            SessionState::Anonymous => SessionStatus::Anonymous,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
            SessionState::Expired { .. } => SessionStatus::Expired,
        }
    }

    pub fn tokens(&self) -> Option<TokenSet> {
        match &self.inner.lock().state {
            SessionState::Authenticated(tokens) => Some(tokens.clone()),
            _ => None,
        }
    }

    /// Installs tokens from a completed sign-in, clearing any expiry marker
    pub fn sign_in(&self, tokens: TokenSet) {
        let mut slot = self.inner.lock();
        tracing::info!(expires_at = %tokens.expires_at, "Signed in");
        slot.state = SessionState::Authenticated(tokens);
        slot.in_flight = None;
        slot.epoch += 1;
    }

    pub async fn sign_in_with_password(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let grant = self
            .inner
            .endpoint
            .password(username, password)
            .await
            .map_err(|e| AuthError::SignIn(e.to_string()))?;
        self.sign_in(TokenSet::from_grant(grant, Utc::now(), self.inner.default_lifetime));
        Ok(())
    }

    pub async fn sign_in_with_code(&self, code: &str, pkce_verifier: Option<&str>) -> Result<(), AuthError> {
        let grant = self
            .inner
            .endpoint
            .authorization_code(code, pkce_verifier)
            .await
            .map_err(|e| AuthError::SignIn(e.to_string()))?;
        self.sign_in(TokenSet::from_grant(grant, Utc::now(), self.inner.default_lifetime));
        Ok(())
    }

    pub fn sign_out(&self) {
        let mut slot = self.inner.lock();
        tracing::info!("Signed out");
        slot.state = SessionState::Anonymous;
        slot.in_flight = None;
        slot.epoch += 1;
    }

    /// Returns the cached access token while it is fresh, refreshing it otherwise
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        let refresh = {
            let mut slot = self.inner.lock();
            if slot.in_flight.is_none() {
                if let SessionState::Authenticated(tokens) = &slot.state {
                    if tokens.is_fresh(Utc::now(), self.inner.margin) {
                        return Ok(tokens.access_token.clone());
                    }
                }
            }
            self.start_refresh(&mut slot)?
        };
        refresh.await
    }

    /// Refreshes regardless of the token's expiry
    pub async fn force_refresh(&self) -> Result<String, AuthError> {
        let refresh = {
            let mut slot = self.inner.lock();
            self.start_refresh(&mut slot)?
        };
        refresh.await
    }

    /// Refreshes after the server refused `rejected_token`. When another caller
    /// already replaced that token, the replacement is returned without I/O.
    pub async fn refresh_after_rejection(&self, rejected_token: &str) -> Result<String, AuthError> {
        let refresh = {
            let mut slot = self.inner.lock();
            if slot.in_flight.is_none() {
                if let SessionState::Authenticated(tokens) = &slot.state {
                    if tokens.access_token != rejected_token {
                        return Ok(tokens.access_token.clone());
                    }
                }
            }
            self.start_refresh(&mut slot)?
        };
        refresh.await
    }

    /// Expires the session if `token` is still the current access token
    pub(crate) fn expire_token(&self, token: &str, reason: &str) {
        let mut slot = self.inner.lock();
        let current = matches!(
            &slot.state,
            SessionState::Authenticated(tokens) if tokens.access_token == token
        );
        if current && slot.in_flight.is_none() {
            slot.expire(&AuthError::SessionExpired(reason.to_string()));
        }
    }

    fn start_refresh(&self, slot: &mut Slot) -> Result<RefreshFuture, AuthError> {
        if let Some(in_flight) = &slot.in_flight {
            return Ok(in_flight.clone());
        }

        let refresh_token = match &slot.state {
            SessionState::Authenticated(tokens) => tokens.refresh_token.clone(),
            SessionState::Anonymous => return Err(AuthError::NotSignedIn),
            SessionState::Expired { reason } => {
                return Err(AuthError::SessionExpired(reason.clone()))
            }
        };
        let Some(refresh_token) = refresh_token else {
            let error = AuthError::NoRefreshToken;
            slot.expire(&error);
            return Err(error);
        };

        let epoch = slot.epoch;
        let task = tokio::spawn(self.inner.clone().run_refresh(refresh_token, epoch));
        let inner = self.inner.clone();
        let refresh = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    let error = AuthError::RefreshFailed(join_error.to_string());
                    let mut slot = inner.lock();
                    if slot.epoch == epoch && slot.in_flight.is_some() {
                        slot.expire(&error);
                    }
                    Err(error)
                }
            }
        }
        .boxed()
        .shared();

        slot.in_flight = Some(refresh.clone());
        Ok(refresh)
    }
}
