mod auth;
mod filter;
mod search;

use crate::argparse::{Cli, Commands};
use anyhow::{Context, Result};
pub use auth::handle_auth_command;
use console_session::SessionConfig;
pub use filter::{
    handle_check_command, handle_compile_command, handle_operators_command, handle_state_command,
};
pub use search::handle_search_command;
use std::path::{Path, PathBuf};

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config_path = cli.config;

    match cli.command {
        Commands::Operators(args) => handle_operators_command(args),
        Commands::Compile(args) => handle_compile_command(args),
        Commands::Check(args) => handle_check_command(args),
        Commands::State(command) => handle_state_command(command),
        Commands::Auth(command) => {
            let config = load_config(config_path.as_deref())?;
            handle_auth_command(command, &config).await
        }
        Commands::Search(args) => {
            let config = load_config(config_path.as_deref())?;
            handle_search_command(args, &config).await
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("admin-console").join("session.toml"))
}

/// Explicit `--config`, then the user config dir, then environment variables
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    if let Some(path) = path {
        return SessionConfig::load(path);
    }
    if let Some(path) = default_config_path().filter(|p| p.exists()) {
        tracing::debug!("Using session config {}", path.display());
        return SessionConfig::load(&path);
    }
    SessionConfig::from_env().context(
        "No session config found. Pass --config <file> or set GATEWAY_URL and OIDC_CLIENT_ID",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");
        fs::write(
            &path,
            "gateway_url = \"https://gateway.example.com\"\nclient_id = \"console\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.client_id, "console");
    }

    #[test]
    fn test_load_explicit_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/session.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
