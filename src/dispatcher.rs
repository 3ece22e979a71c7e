//! Channel variants and the dispatcher that drives them.
//!
//! A `ChannelVariant` is a fully configured channel; it can only be built by
//! [`crate::resolver::resolve`]. The `Dispatcher` owns one variant, composes a
//! message for every batch and hands it to the variant's transport.

use crate::core::{EventBatch, Sender};
use crate::formatting::{ChatComposer, Composer, SmsComposer, VoiceComposer};
use crate::resolver::{resolve, ConfigError, Settings};
use crate::transport::{
    Ack, ChatMessage, ChatTransport, PhoneTransport, SmsMessage, TransportError,
    TransportFactory, VoiceCall,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("failed to deliver notification to {destination}: {source}")]
    Transport {
        destination: String,
        correlation_id: Option<String>,
        source: TransportError,
    },

    #[error("no sender configured for contact type '{contact_type}'")]
    NoSender { contact_type: String },
}

/// Receives every composed message body before it is sent.
pub trait AuditSink: Send + Sync {
    fn record(&self, channel: &str, destination: &str, body: &str);
}

/// Writes composed bodies to the `tracing` debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, channel: &str, destination: &str, body: &str) {
        debug!(channel, destination, body, "Composed message body");
    }
}

pub struct ChatChannel {
    pub(crate) composer: ChatComposer,
    pub(crate) username: String,
    pub(crate) transport: Arc<dyn ChatTransport>,
}

pub struct SmsChannel {
    pub(crate) composer: SmsComposer,
    pub(crate) from_phone: String,
    pub(crate) transport: Arc<dyn PhoneTransport>,
}

pub struct VoiceChannel {
    pub(crate) composer: VoiceComposer,
    pub(crate) from_phone: String,
    pub(crate) transport: Arc<dyn PhoneTransport>,
}

/// One configured delivery variant.
pub enum ChannelVariant {
    Chat(ChatChannel),
    Sms(SmsChannel),
    Voice(VoiceChannel),
}

impl ChannelVariant {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelVariant::Chat(_) => "chat",
            ChannelVariant::Sms(_) => "sms",
            ChannelVariant::Voice(_) => "voice",
        }
    }

    /// The payload this variant would send for `batch`, as text.
    ///
    /// Chat and SMS return the message body, voice returns the callback URL.
    pub fn preview(&self, batch: &EventBatch) -> String {
        match self {
            ChannelVariant::Chat(c) => c.composer.compose(batch).text,
            ChannelVariant::Sms(c) => c.composer.compose(batch),
            ChannelVariant::Voice(c) => c.composer.compose(batch),
        }
    }
}

/// The `Sender` implementation shared by every channel.
pub struct Dispatcher {
    variant: ChannelVariant,
    audit: Arc<dyn AuditSink>,
}

impl Dispatcher {
    /// Resolves `settings` into a variant and wraps it in a dispatcher.
    pub fn init(settings: &Settings, factory: &dyn TransportFactory) -> Result<Self, ConfigError> {
        Ok(Self::new(resolve(settings, factory)?))
    }

    pub fn new(variant: ChannelVariant) -> Self {
        Self {
            variant,
            audit: Arc::new(TracingAuditSink),
        }
    }

    /// Replaces the default tracing audit sink.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn variant(&self) -> &ChannelVariant {
        &self.variant
    }

    async fn deliver(&self, batch: &EventBatch, destination: &str) -> Result<Ack, TransportError> {
        let channel = self.variant.name();
        match &self.variant {
            ChannelVariant::Chat(chat) => {
                let content = chat.composer.compose(batch);
                self.audit.record(channel, destination, &content.text);
                let message = ChatMessage {
                    channel: destination.to_string(),
                    text: content.text,
                    username: chat.username.clone(),
                    icon_url: content.icon_url,
                };
                chat.transport.post_message(&message).await
            }
            ChannelVariant::Sms(sms) => {
                let body = sms.composer.compose(batch);
                self.audit.record(channel, destination, &body);
                let message = SmsMessage {
                    from: sms.from_phone.clone(),
                    to: destination.to_string(),
                    body,
                };
                sms.transport.send_sms(&message).await
            }
            ChannelVariant::Voice(voice) => {
                let callback_url = voice.composer.compose(batch);
                self.audit.record(channel, destination, &callback_url);
                let call = VoiceCall {
                    from: voice.from_phone.clone(),
                    to: destination.to_string(),
                    callback_url,
                };
                voice.transport.place_call(&call).await
            }
        }
    }
}

#[async_trait]
impl Sender for Dispatcher {
    fn channel(&self) -> &'static str {
        self.variant.name()
    }

    fn preview(&self, batch: &EventBatch) -> String {
        self.variant.preview(batch)
    }

    #[instrument(skip_all, fields(channel = self.variant.name(), events = batch.len()))]
    async fn send_events(&self, batch: &EventBatch) -> Result<(), DispatchError> {
        let destination = batch.contact.value.as_str();

        match self.deliver(batch, destination).await {
            Ok(ack) => {
                metrics::counter!("notifications_sent_total", "channel" => self.channel(), "status" => "success")
                    .increment(1);
                debug!(id = ?ack.id, status = ?ack.status, destination, "Notification accepted");
                Ok(())
            }
            Err(source) => {
                metrics::counter!("notifications_sent_total", "channel" => self.channel(), "status" => "failure")
                    .increment(1);
                Err(DispatchError::Transport {
                    destination: destination.to_string(),
                    correlation_id: source.correlation_id().map(str::to_string),
                    source,
                })
            }
        }
    }
}
