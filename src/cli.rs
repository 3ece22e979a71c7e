//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the TOML file and environment variables.

use clap::{Parser, Subcommand};
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Delivers alert notifications through chat, SMS and voice channels.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq, Default)]
pub enum Command {
    /// Validate every configured sender and list the contact types it serves.
    #[default]
    Check,

    /// Send a synthetic TEST notification through one sender.
    Test {
        /// Contact type to route the notification by.
        #[arg(long)]
        contact_type: String,
        /// Destination address (chat channel, phone number).
        #[arg(long)]
        to: String,
        /// Trigger name shown in the notification.
        #[arg(long, default_value = "Test trigger")]
        trigger: String,
    },

    /// Print the payload a sender would deliver for a JSON event batch.
    Preview {
        /// Path to a JSON-encoded event batch.
        #[arg(value_name = "FILE")]
        batch: PathBuf,
    },
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
