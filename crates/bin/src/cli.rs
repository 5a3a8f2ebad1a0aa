//! CLI argument definitions for the formtree binary.

use clap::{Parser, Subcommand, ValueEnum};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Aligned tables
    Human,
    /// Pretty-printed JSON
    Json,
}

/// Drive formtree form models from the command line
#[derive(Parser, Debug)]
#[command(name = "formtree")]
#[command(about = "formtree: nested form state with sync and async validation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill in and submit the sign-up form
    Signup(SignupArgs),
    /// Parse a field path and print its keys
    Path(PathArgs),
}

/// Arguments for the signup command
#[derive(clap::Args, Debug)]
pub struct SignupArgs {
    /// Username to register
    #[arg(short, long, default_value = "", env = "FORMTREE_USERNAME")]
    pub username: String,

    /// Contact email address
    #[arg(short, long, default_value = "", env = "FORMTREE_EMAIL")]
    pub email: String,

    /// Friend's name; repeat for more friends
    #[arg(short, long = "friend")]
    pub friends: Vec<String>,

    /// Usernames the availability check reports as taken
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "admin,root",
        env = "FORMTREE_TAKEN"
    )]
    pub taken: Vec<String>,

    /// Simulated latency of the username availability check
    #[arg(long, default_value_t = 300, env = "FORMTREE_LATENCY_MS")]
    pub latency_ms: u64,

    /// Output format
    #[arg(short, long, default_value = "human", env = "FORMTREE_FORMAT")]
    pub format: Format,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Path in dotted/bracketed notation, e.g. `friends[0].name`
    pub path: String,

    /// Output format
    #[arg(short, long, default_value = "human", env = "FORMTREE_FORMAT")]
    pub format: Format,
}
