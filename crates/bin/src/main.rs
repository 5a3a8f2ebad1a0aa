//! formtree command line: drives the sign-up form and inspects field paths.

mod cli;
mod commands;
mod output;
mod signup;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("formtree=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Signup(args) => commands::signup::run(args).await,
        Commands::Path(args) => commands::path::run(args),
    }
}
