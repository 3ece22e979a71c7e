//! Transport capabilities consumed by the dispatchers.
//!
//! The core never talks to a provider directly: it builds payloads and calls
//! these traits. `HttpTransportFactory` wires the bundled HTTP clients; tests
//! inject their own factory.

pub mod slack;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod twilio;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use slack::SlackApiClient;
pub use twilio::TwilioClient;

/// Request timeout applied by the bundled HTTP transports.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("provider rejected the request (status {status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        correlation_id: Option<String>,
    },
}

impl TransportError {
    /// Provider-issued identifier for the failed request, when there is one.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            TransportError::Rejected { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Acknowledgement returned by a provider for an accepted request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Provider-side identifier (message sid, call sid, message ts, ...)
    pub id: Option<String>,
    /// Provider-side status, if reported
    pub status: Option<String>,
}

/// A message posted to a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: String,
    pub text: String,
    pub username: String,
    pub icon_url: String,
}

/// A text message to a phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// A voice call that fetches its script from `callback_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCall {
    pub from: String,
    pub to: String,
    pub callback_url: String,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_message(&self, message: &ChatMessage) -> Result<Ack, TransportError>;
}

#[async_trait]
pub trait PhoneTransport: Send + Sync {
    async fn send_sms(&self, message: &SmsMessage) -> Result<Ack, TransportError>;

    async fn place_call(&self, call: &VoiceCall) -> Result<Ack, TransportError>;
}

/// Account credentials for a phone provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

/// Builds transport handles from validated credentials.
///
/// Implementations must not perform any network I/O.
pub trait TransportFactory: Send + Sync {
    fn chat(
        &self,
        api_token: &str,
        api_url: Option<&str>,
    ) -> Result<Arc<dyn ChatTransport>, TransportError>;

    fn phone(
        &self,
        credentials: &PhoneCredentials,
        api_url: Option<&str>,
    ) -> Result<Arc<dyn PhoneTransport>, TransportError>;
}

/// Factory for the bundled Slack and Twilio HTTP clients.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    timeout: Duration,
}

impl HttpTransportFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl TransportFactory for HttpTransportFactory {
    fn chat(
        &self,
        api_token: &str,
        api_url: Option<&str>,
    ) -> Result<Arc<dyn ChatTransport>, TransportError> {
        let client = SlackApiClient::new(
            api_token,
            api_url.unwrap_or(slack::DEFAULT_API_URL),
            self.timeout,
        )?;
        Ok(Arc::new(client))
    }

    fn phone(
        &self,
        credentials: &PhoneCredentials,
        api_url: Option<&str>,
    ) -> Result<Arc<dyn PhoneTransport>, TransportError> {
        let client = TwilioClient::new(
            credentials.clone(),
            api_url.unwrap_or(twilio::DEFAULT_API_URL),
            self.timeout,
        )?;
        Ok(Arc::new(client))
    }
}

/// Builds the shared `reqwest` client used by the HTTP transports.
fn http_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(TransportError::from)
}
