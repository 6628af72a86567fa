use crate::jwt;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::time::Duration;

/// Tokens held by an authenticated session
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Builds the session tokens from a grant. Expiry comes from the access
    /// token's `exp` claim when it has one, then `expires_in`, then `default_lifetime`.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>, default_lifetime: Duration) -> Self {
        let expires_at = jwt::expiry(&grant.access_token)
            .or_else(|| grant.expires_in.map(|ttl| after(now, ttl)))
            .unwrap_or_else(|| after(now, default_lifetime));

        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            id_token: grant.id_token,
            expires_at,
        }
    }

    /// Applies a refresh grant. Tokens the provider did not rotate are kept.
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>, default_lifetime: Duration) -> Self {
        let previous_refresh = self.refresh_token.clone();
        let previous_id = self.id_token.clone();
        let mut next = Self::from_grant(grant, now, default_lifetime);
        if next.refresh_token.is_none() {
            next.refresh_token = previous_refresh;
        }
        if next.id_token.is_none() {
            next.id_token = previous_id;
        }
        next
    }

    /// Still usable at `now` with `margin` to spare
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        after(now, margin) < self.expires_at
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What a token endpoint returned for one grant
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_in: Option<Duration>,
}

impl TokenGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// `now + duration`, saturating at the largest representable instant
fn after(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(duration)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_exp_claim_takes_precedence() {
        let token = jwt::encode_test_token(1_700_000_900);
        let grant = TokenGrant::new(token).with_expires_in(Duration::from_secs(60));

        let set = TokenSet::from_grant(grant, now(), Duration::from_secs(300));
        assert_eq!(set.expires_at, DateTime::from_timestamp(1_700_000_900, 0).unwrap());
    }

    #[test]
    fn test_expires_in_then_default_lifetime() {
        let grant = TokenGrant::new("opaque").with_expires_in(Duration::from_secs(60));
        let set = TokenSet::from_grant(grant, now(), Duration::from_secs(300));
        assert_eq!(set.expires_at, now() + ChronoDuration::seconds(60));

        let set = TokenSet::from_grant(TokenGrant::new("opaque"), now(), Duration::from_secs(300));
        assert_eq!(set.expires_at, now() + ChronoDuration::seconds(300));
    }

    #[test]
    fn test_refresh_keeps_unrotated_tokens() {
        let mut grant = TokenGrant::new("a1").with_refresh_token("r1");
        grant.id_token = Some("id1".to_string());
        let set = TokenSet::from_grant(grant, now(), Duration::from_secs(300));

        let refreshed = set.refreshed(TokenGrant::new("a2"), now(), Duration::from_secs(300));
        assert_eq!(refreshed.access_token, "a2");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r1"));
        assert_eq!(refreshed.id_token.as_deref(), Some("id1"));

        let rotated = set.refreshed(
            TokenGrant::new("a3").with_refresh_token("r2"),
            now(),
            Duration::from_secs(300),
        );
        assert_eq!(rotated.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn test_is_fresh_respects_margin() {
        let set = TokenSet::from_grant(
            TokenGrant::new("a").with_expires_in(Duration::from_secs(5)),
            now(),
            Duration::from_secs(300),
        );
        assert!(set.is_fresh(now(), Duration::from_secs(0)));
        assert!(!set.is_fresh(now(), Duration::from_secs(10)));
        assert!(!set.is_fresh(now() + ChronoDuration::seconds(5), Duration::from_secs(0)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let set = TokenSet::from_grant(
            TokenGrant::new("super-secret").with_refresh_token("also-secret"),
            now(),
            Duration::from_secs(300),
        );
        let printed = format!("{:?}", set);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }
}
