use crate::argparse::SearchArgs;
use crate::utils::{print_json, read_json_arg};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use console_dsl::{compile, FieldConfig, FilterCondition};
use console_session::{
    ApiClient, AuthorizedError, OAuthTokenEndpoint, Session, SessionConfig, TokenGrant, TokenSet,
};
use std::sync::Arc;

pub async fn handle_search_command(args: SearchArgs, config: &SessionConfig) -> Result<()> {
    let query = search_query(&args)?;
    tracing::debug!(query = %query, "Running search");

    let endpoint = OAuthTokenEndpoint::new(config)?;
    let session = Session::from_config(config, Arc::new(endpoint));
    session.sign_in(resume_tokens(args.access_token, args.refresh_token, config));

    let base_url = args.api_url.as_deref().unwrap_or(&config.gateway_url);
    let client = ApiClient::new(base_url, session, config)?;

    match client.search::<serde_json::Value>(&args.path, &query).await {
        Ok(result) => print_json(&result),
        Err(e) if e.requires_reauthentication() => Err(anyhow!(
            "{}\nSign in again with `console auth login` or `console auth exchange`",
            describe(&e)
        )),
        Err(e) => Err(anyhow!(describe(&e))),
    }
}

/// The DSL to send: `--query` as given, or `--conditions` compiled against `--fields`
fn search_query(args: &SearchArgs) -> Result<String> {
    if let Some(query) = &args.query {
        return Ok(query.clone());
    }
    match (&args.conditions, &args.fields) {
        (Some(conditions), Some(fields)) => {
            let conditions: Vec<FilterCondition> =
                read_json_arg(conditions).context("Invalid --conditions")?;
            let fields: Vec<FieldConfig> = read_json_arg(fields).context("Invalid --fields")?;
            Ok(compile(&conditions, &fields))
        }
        _ => Ok(String::new()),
    }
}

/// Session tokens rebuilt from the command line. Without an access token the
/// set is already stale, so the first call refreshes.
fn resume_tokens(
    access_token: Option<String>,
    refresh_token: String,
    config: &SessionConfig,
) -> TokenSet {
    let now = Utc::now();
    match access_token {
        Some(access_token) => TokenSet::from_grant(
            TokenGrant::new(access_token).with_refresh_token(refresh_token),
            now,
            config.default_token_lifetime(),
        ),
        None => TokenSet {
            access_token: String::new(),
            refresh_token: Some(refresh_token),
            id_token: None,
            expires_at: now,
        },
    }
}

fn describe<E: std::fmt::Display>(error: &AuthorizedError<E>) -> String {
    match error {
        AuthorizedError::Auth(e) => format!("Authentication failed: {}", e),
        AuthorizedError::Unauthorized(e) => format!("Request still unauthorized after refresh: {}", e),
        AuthorizedError::Request(e) => format!("Search failed: {}", e),
    }
}
