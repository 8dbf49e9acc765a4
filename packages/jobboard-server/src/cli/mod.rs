mod users;

pub use users::UserCommands;

use clap::{Parser, Subcommand};

/// Job board API server
#[derive(Parser)]
#[command(name = "jobboard-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default)
    Serve,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),
}
