use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = colloquy_core::lifecycle::APP_NAME, about = "Colloquy, moderated chat in your terminal")]
pub struct Cli {
    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,

    /// Send a single message and print the resolved exchange
    Ask {
        message: String,

        /// Print the exchange as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent exchanges from the JSONL mirror
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Validate the configuration and print the selected backends
    CheckConfig,
}
