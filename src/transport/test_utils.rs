//! In-memory transports for exercising dispatchers without a network.

use super::{
    Ack, ChatMessage, ChatTransport, PhoneCredentials, PhoneTransport, SmsMessage,
    TransportError, TransportFactory, VoiceCall,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Everything a fake transport was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Chat(ChatMessage),
    Sms(SmsMessage),
    Call(VoiceCall),
}

/// A transport that records every payload and answers with a fixed result.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<Sent>>>,
    failure: Option<TransportError>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that rejects every request with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self {
            sent: Arc::default(),
            failure: Some(error),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, item: Sent) -> Result<Ack, TransportError> {
        self.sent.lock().unwrap().push(item);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Ack {
                id: Some("fake-id".to_string()),
                status: Some("queued".to_string()),
            }),
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn post_message(&self, message: &ChatMessage) -> Result<Ack, TransportError> {
        self.record(Sent::Chat(message.clone()))
    }
}

#[async_trait]
impl PhoneTransport for RecordingTransport {
    async fn send_sms(&self, message: &SmsMessage) -> Result<Ack, TransportError> {
        self.record(Sent::Sms(message.clone()))
    }

    async fn place_call(&self, call: &VoiceCall) -> Result<Ack, TransportError> {
        self.record(Sent::Call(call.clone()))
    }
}

/// A factory handing out one shared [`RecordingTransport`] and remembering
/// the credentials it was built with.
#[derive(Clone, Default)]
pub struct FakeTransportFactory {
    pub transport: RecordingTransport,
    pub chat_tokens: Arc<Mutex<Vec<String>>>,
    pub phone_credentials: Arc<Mutex<Vec<PhoneCredentials>>>,
}

impl FakeTransportFactory {
    pub fn new(transport: RecordingTransport) -> Self {
        Self {
            transport,
            ..Default::default()
        }
    }
}

impl TransportFactory for FakeTransportFactory {
    fn chat(
        &self,
        api_token: &str,
        _api_url: Option<&str>,
    ) -> Result<Arc<dyn ChatTransport>, TransportError> {
        self.chat_tokens.lock().unwrap().push(api_token.to_string());
        Ok(Arc::new(self.transport.clone()))
    }

    fn phone(
        &self,
        credentials: &PhoneCredentials,
        _api_url: Option<&str>,
    ) -> Result<Arc<dyn PhoneTransport>, TransportError> {
        self.phone_credentials
            .lock()
            .unwrap()
            .push(credentials.clone());
        Ok(Arc::new(self.transport.clone()))
    }
}
