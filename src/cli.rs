//! Command-line interface for letter_rush.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Letter Rush - realtime multiplayer letter and category race
#[derive(Parser, Debug)]
#[command(name = "letter_rush")]
#[command(about = "Realtime game server for the letter/category word race", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP/WebSocket game server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the category datasets
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Load the datasets and print the number of words per topic
    Datasets {
        /// Directory holding the category datasets
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
