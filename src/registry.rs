//! Routes event batches to the sender configured for their contact type.

use crate::config::Config;
use crate::core::{EventBatch, Sender};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::resolver::ConfigError;
use crate::transport::TransportFactory;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Initialized senders, keyed by the contact type they serve.
#[derive(Default)]
pub struct SenderRegistry {
    senders: HashMap<String, Arc<dyn Sender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every sender in `config`.
    ///
    /// The first invalid sender aborts the whole registry; its name is
    /// attached to the error.
    pub fn from_config(config: &Config, factory: &dyn TransportFactory) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, sender) in &config.senders {
            let dispatcher = Dispatcher::init(&sender.resolver_settings(), factory).map_err(|e| {
                ConfigError::Sender {
                    name: name.clone(),
                    source: Box::new(e),
                }
            })?;
            let contact_type = sender.contact_type(name);
            info!(sender = %name, contact_type, channel = dispatcher.channel(), "Sender initialized");
            registry.register(contact_type, Arc::new(dispatcher))?;
        }
        Ok(registry)
    }

    /// Adds a sender for `contact_type`. Each contact type has one sender.
    pub fn register(&mut self, contact_type: &str, sender: Arc<dyn Sender>) -> Result<(), ConfigError> {
        if self.senders.contains_key(contact_type) {
            return Err(ConfigError::DuplicateContactType(contact_type.to_string()));
        }
        self.senders.insert(contact_type.to_string(), sender);
        Ok(())
    }

    pub fn get(&self, contact_type: &str) -> Option<&Arc<dyn Sender>> {
        self.senders.get(contact_type)
    }

    /// Registered contact types, sorted.
    pub fn contact_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.senders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Sends `batch` through the sender registered for its contact type.
    #[instrument(skip_all, fields(contact_type = %batch.contact.contact_type))]
    pub async fn dispatch(&self, batch: &EventBatch) -> Result<(), DispatchError> {
        let sender = self.get(&batch.contact.contact_type).ok_or_else(|| {
            DispatchError::NoSender {
                contact_type: batch.contact.contact_type.clone(),
            }
        })?;

        sender.send_events(batch).await.inspect_err(|e| {
            error!(error = %e, "Failed to send notification");
        })
    }
}
