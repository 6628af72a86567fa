use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "console",
    about = "Admin console filter and session tooling",
    version,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Session config file (TOML). Defaults to the user config dir, then environment variables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the operators available for a data type
    Operators(OperatorsArgs),
    /// Compile filter rows into a DSL expression
    Compile(CompileArgs),
    /// Parse a DSL expression and print its tree
    Check(CheckArgs),
    /// Encode or decode filter state for a shareable URL
    #[command(subcommand)]
    State(StateCommands),
    /// Sign in against the identity gateway
    #[command(subcommand)]
    Auth(AuthCommands),
    /// Run an authorized search against the console API
    Search(SearchArgs),
}

#[derive(Args)]
pub struct OperatorsArgs {
    /// string, int, long, date or bool
    #[arg(long = "type", value_name = "DATA_TYPE")]
    pub data_type: String,
}

#[derive(Args)]
pub struct CompileArgs {
    /// Field catalog as JSON, or @path to a JSON file
    #[arg(long)]
    pub fields: String,

    /// Filter rows as JSON, or @path to a JSON file
    #[arg(long)]
    pub conditions: String,
}

#[derive(Args)]
pub struct CheckArgs {
    /// DSL expression to parse
    pub query: String,
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// Turn filter rows into a URL query parameter value
    Encode {
        /// Filter rows as JSON, or @path to a JSON file
        #[arg(long)]
        conditions: String,

        /// Print a share link for this page instead of the bare value
        #[arg(long)]
        url: Option<String>,
    },
    /// Restore filter rows from a share link or a URL query parameter value
    Decode {
        /// Share link, query string or percent-encoded parameter value
        param: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Print a browser sign-in URL with its state and PKCE verifier
    AuthorizeUrl,
    /// Sign in with username and password
    Login {
        #[arg(long)]
        username: String,

        /// Prompted for when omitted
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Exchange an authorization code from the sign-in callback
    Exchange {
        #[arg(long)]
        code: String,

        /// PKCE verifier printed by authorize-url
        #[arg(long)]
        verifier: Option<String>,

        /// State returned on the callback, checked against --expected-state
        #[arg(long, requires = "expected_state")]
        state: Option<String>,

        /// State printed by authorize-url
        #[arg(long)]
        expected_state: Option<String>,
    },
    /// Print the gateway's end-session URL
    LogoutUrl {
        /// Where the gateway sends the browser afterwards
        #[arg(long, default_value = "http://localhost:3000")]
        redirect: String,
    },
}

#[derive(Args)]
pub struct SearchArgs {
    /// API path, e.g. /api/partners/search
    #[arg(long)]
    pub path: String,

    /// DSL expression
    #[arg(long, conflicts_with = "conditions")]
    pub query: Option<String>,

    /// Filter rows as JSON (or @path), compiled against --fields
    #[arg(long, requires = "fields")]
    pub conditions: Option<String>,

    /// Field catalog as JSON, or @path to a JSON file
    #[arg(long)]
    pub fields: Option<String>,

    /// Base URL of the console API; defaults to the gateway URL
    #[arg(long, env = "CONSOLE_API_URL")]
    pub api_url: Option<String>,

    /// Refresh token from a previous sign-in
    #[arg(long, env = "CONSOLE_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: String,

    /// Access token to try before refreshing
    #[arg(long, env = "CONSOLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile() {
        let cli = Cli::try_parse_from([
            "console",
            "--verbose",
            "compile",
            "--fields",
            "@fields.json",
            "--conditions",
            "[]",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Compile(args) => {
                assert_eq!(args.fields, "@fields.json");
                assert_eq!(args.conditions, "[]");
            }
            _ => panic!("Expected compile command"),
        }
    }

    #[test]
    fn test_parse_state_decode_with_global_config() {
        let cli = Cli::try_parse_from([
            "console",
            "state",
            "decode",
            "%5B%5D",
            "--config",
            "session.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("session.toml")));
        assert!(matches!(
            cli.command,
            Commands::State(StateCommands::Decode { ref param }) if param == "%5B%5D"
        ));
    }

    #[test]
    fn test_exchange_state_requires_expected_state() {
        let result = Cli::try_parse_from([
            "console", "auth", "exchange", "--code", "abc", "--state", "s1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_search_query_conflicts_with_conditions() {
        let result = Cli::try_parse_from([
            "console",
            "search",
            "--path",
            "/api/partners",
            "--refresh-token",
            "r1",
            "--query",
            "a == 1",
            "--conditions",
            "[]",
            "--fields",
            "[]",
        ]);
        assert!(result.is_err());
    }
}
