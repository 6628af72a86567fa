mod argparse;
mod commands;
mod utils;

use anyhow::Result;
use argparse::parse_args;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();
    utils::init_logger(cli.verbose);

    commands::handle_command(cli).await
}
