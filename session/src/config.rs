use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Identity gateway and token handling settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub gateway_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Where the provider sends the browser after sign-in
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,
    #[serde(default = "default_token_lifetime")]
    pub default_token_lifetime_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Query parameter carrying the DSL on search calls
    #[serde(default = "default_search_param")]
    pub search_param: String,
}

impl SessionConfig {
    pub fn new(gateway_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_url: default_redirect_url(),
            scopes: default_scopes(),
            refresh_margin_secs: default_refresh_margin(),
            default_token_lifetime_secs: default_token_lifetime(),
            request_timeout_secs: default_request_timeout(),
            search_param: default_search_param(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Builds a config from `GATEWAY_URL`, `OIDC_CLIENT_ID`, `OIDC_CLIENT_SECRET` and `APP_URL`
    pub fn from_env() -> Result<Self> {
        let gateway_url = std::env::var("GATEWAY_URL")
            .map_err(|_| anyhow!("GATEWAY_URL environment variable not set"))?;
        let client_id = std::env::var("OIDC_CLIENT_ID")
            .map_err(|_| anyhow!("OIDC_CLIENT_ID environment variable not set"))?;

        let mut config = Self::new(gateway_url, client_id);
        config.client_secret = std::env::var("OIDC_CLIENT_SECRET").ok();
        if let Ok(app_url) = std::env::var("APP_URL") {
            config.redirect_url = format!("{}/callback", app_url.trim_end_matches('/'));
        }
        Ok(config)
    }

    fn gateway(&self) -> &str {
        self.gateway_url.trim_end_matches('/')
    }

    pub fn token_url(&self) -> String {
        format!("{}/connect/token", self.gateway())
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/connect/authorize", self.gateway())
    }

    pub fn end_session_url(&self, post_logout_redirect: &str) -> String {
        format!(
            "{}/connect/logout?client_id={}&post_logout_redirect_uri={}",
            self.gateway(),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(post_logout_redirect)
        )
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    pub fn default_token_lifetime(&self) -> Duration {
        Duration::from_secs(self.default_token_lifetime_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scope_list(&self) -> impl Iterator<Item = &str> {
        self.scopes.split_whitespace()
    }
}

// Default functions
fn default_redirect_url() -> String {
    "http://localhost:3000/callback".to_string()
}

fn default_scopes() -> String {
    "openid profile email offline_access".to_string()
}

fn default_refresh_margin() -> u64 {
    10
}

fn default_token_lifetime() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_search_param() -> String {
    "filter".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("session.toml");
        fs::write(
            &config_path,
            r#"
gateway_url = "https://gateway.example.com/"
client_id = "admin-console"
"#,
        )
        .unwrap();

        let config = SessionConfig::load(&config_path).unwrap();
        assert_eq!(config.client_id, "admin-console");
        assert!(config.client_secret.is_none());
        assert_eq!(config.scopes, "openid profile email offline_access");
        assert_eq!(config.refresh_margin(), Duration::from_secs(10));
        assert_eq!(config.default_token_lifetime(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.search_param, "filter");
        assert_eq!(
            config.token_url(),
            "https://gateway.example.com/connect/token"
        );
        assert_eq!(
            config.authorize_url(),
            "https://gateway.example.com/connect/authorize"
        );
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("session.toml");
        fs::write(
            &config_path,
            r#"
gateway_url = "https://gateway.example.com"
client_id = "admin-console"
client_secret = "s3cret"
redirect_url = "https://console.example.com/callback"
scopes = "openid api"
refresh_margin_secs = 30
default_token_lifetime_secs = 600
request_timeout_secs = 5
search_param = "q"
"#,
        )
        .unwrap();

        let config = SessionConfig::load(&config_path).unwrap();
        assert_eq!(config.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.redirect_url, "https://console.example.com/callback");
        assert_eq!(config.scope_list().collect::<Vec<_>>(), vec!["openid", "api"]);
        assert_eq!(config.refresh_margin_secs, 30);
        assert_eq!(config.default_token_lifetime_secs, 600);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.search_param, "q");
    }

    #[test]
    fn test_load_missing_required_field() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("session.toml");
        fs::write(&config_path, r#"gateway_url = "https://gateway.example.com""#).unwrap();

        let err = SessionConfig::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionConfig::load(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_end_session_url_encodes_redirect() {
        let config = SessionConfig::new("https://gateway.example.com", "admin console");
        assert_eq!(
            config.end_session_url("https://console.example.com/?a=1"),
            "https://gateway.example.com/connect/logout?client_id=admin%20console&post_logout_redirect_uri=https%3A%2F%2Fconsole.example.com%2F%3Fa%3D1"
        );
    }
}
