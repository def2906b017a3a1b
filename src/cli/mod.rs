//! CLI module - Command-line interface for Peerly
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Peerly - monthly peer reviews for teams
#[derive(Parser)]
#[command(name = "peerly")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API together with the monthly purge scheduler
    #[command(alias = "daemon")]
    Serve,

    /// Delete reviews outside the current month once, then exit
    Purge,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Print a stored credential string for a password
    HashPassword {
        /// Plaintext password
        password: String,
    },
}

pub use commands::*;
