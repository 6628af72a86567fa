use crate::argparse::AuthCommands;
use crate::utils::{print_json, prompt_password};
use anyhow::Result;
use console_session::{
    CallbackParams, OAuthTokenEndpoint, Session, SessionConfig, TokenSet,
};
use serde::Serialize;
use std::sync::Arc;

/// Tokens printed after a successful sign-in
#[derive(Debug, Serialize)]
struct SignedIn {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    expires_at: String,
}

impl From<TokenSet> for SignedIn {
    fn from(tokens: TokenSet) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            expires_at: tokens.expires_at.to_rfc3339(),
        }
    }
}

pub async fn handle_auth_command(command: AuthCommands, config: &SessionConfig) -> Result<()> {
    match command {
        AuthCommands::AuthorizeUrl => {
            let endpoint = OAuthTokenEndpoint::new(config)?;
            let request = endpoint.authorization_request();
            println!("Open this URL to sign in:\n  {}\n", request.url);
            println!("state:    {}", request.csrf_state);
            println!("verifier: {}", request.pkce_verifier);
        }
        AuthCommands::Login { username, password } => {
            let password = prompt_password(password, &username)?;
            let session = session_for(config)?;
            session.sign_in_with_password(&username, &password).await?;
            print_tokens(&session)?;
        }
        AuthCommands::Exchange {
            code,
            verifier,
            state,
            expected_state,
        } => {
            let code = match expected_state {
                Some(expected) => CallbackParams {
                    code: Some(code),
                    state,
                    ..Default::default()
                }
                .into_code(&expected)?,
                None => code,
            };
            let session = session_for(config)?;
            session.sign_in_with_code(&code, verifier.as_deref()).await?;
            print_tokens(&session)?;
        }
        AuthCommands::LogoutUrl { redirect } => {
            println!("{}", config.end_session_url(&redirect));
        }
    }
    Ok(())
}

fn session_for(config: &SessionConfig) -> Result<Session> {
    let endpoint = OAuthTokenEndpoint::new(config)?;
    Ok(Session::from_config(config, Arc::new(endpoint)))
}

fn print_tokens(session: &Session) -> Result<()> {
    match session.tokens() {
        Some(tokens) => print_json(&SignedIn::from(tokens)),
        None => anyhow::bail!("Sign-in did not produce tokens"),
    }
}
