//! alertdispatch - command-line entry point
//!
//! Loads the sender configuration, validates it, and can send a test
//! notification or preview the payload for a recorded event batch.

use alertdispatch::{
    cli::{Cli, Command},
    config::Config,
    core::{Contact, EventBatch},
    transport::HttpTransportFactory,
    SenderRegistry,
};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).context("Failed to load configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("alertdispatch starting up...");
    let registry = SenderRegistry::from_config(&config, &HttpTransportFactory::default())
        .context("Invalid sender configuration")?;

    match cli.command.clone().unwrap_or_default() {
        Command::Check => {
            if registry.is_empty() {
                println!("No senders configured.");
            }
            for contact_type in registry.contact_types() {
                if let Some(sender) = registry.get(contact_type) {
                    println!("{}: {}", contact_type, sender.channel());
                }
            }
        }
        Command::Test {
            contact_type,
            to,
            trigger,
        } => {
            let contact = Contact {
                contact_type,
                value: to.clone(),
            };
            let batch = EventBatch::test_notification(contact, &trigger, Utc::now().timestamp());
            registry.dispatch(&batch).await?;
            println!("Test notification sent to {}", to);
        }
        Command::Preview { batch } => {
            let raw = std::fs::read_to_string(&batch)
                .with_context(|| format!("Failed to read {}", batch.display()))?;
            let batch: EventBatch =
                serde_json::from_str(&raw).context("Failed to parse event batch")?;
            let sender = registry.get(&batch.contact.contact_type).ok_or_else(|| {
                anyhow!(
                    "no sender configured for contact type '{}'",
                    batch.contact.contact_type
                )
            })?;
            println!("{}", sender.preview(&batch));
        }
    }

    Ok(())
}
