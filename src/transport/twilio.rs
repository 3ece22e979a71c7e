//! A client for the Twilio Messages and Calls REST resources.

use super::{
    http_client, Ack, PhoneCredentials, PhoneTransport, SmsMessage, TransportError, VoiceCall,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub const DEFAULT_API_URL: &str = "https://api.twilio.com";

const REQUEST_ID_HEADER: &str = "twilio-request-id";

/// The subset of a Message or Call resource we care about.
#[derive(Debug, Deserialize)]
struct ResourceResponse {
    sid: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

pub struct TwilioClient {
    client: reqwest::Client,
    api_url: String,
    credentials: PhoneCredentials,
}

impl TwilioClient {
    /// Creates a new `TwilioClient`. No request is made.
    pub fn new(
        credentials: PhoneCredentials,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{}.json",
            self.api_url, self.credentials.account_sid, resource
        )
    }

    /// Creates a resource and returns its sid and status.
    async fn create(&self, resource: &str, form: &[(&str, &str)]) -> Result<Ack, TransportError> {
        let response = self
            .client
            .post(self.resource_url(resource))
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(ErrorResponse {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{} (code {})", message, code),
                Ok(ErrorResponse {
                    message: Some(message),
                    ..
                }) => message,
                _ => text,
            };
            error!(status = %status, error = %message, resource, "Twilio rejected the request");
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
                correlation_id: request_id,
            });
        }

        let body: ResourceResponse = response.json().await?;
        Ok(Ack {
            id: body.sid,
            status: body.status,
        })
    }
}

#[async_trait]
impl PhoneTransport for TwilioClient {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send_sms(&self, message: &SmsMessage) -> Result<Ack, TransportError> {
        let ack = self
            .create(
                "Messages",
                &[
                    ("To", message.to.as_str()),
                    ("From", message.from.as_str()),
                    ("Body", message.body.as_str()),
                ],
            )
            .await?;
        debug!(status = ?ack.status, "Message sent to Twilio");
        Ok(ack)
    }

    #[instrument(skip(self, call), fields(to = %call.to))]
    async fn place_call(&self, call: &VoiceCall) -> Result<Ack, TransportError> {
        let ack = self
            .create(
                "Calls",
                &[
                    ("To", call.to.as_str()),
                    ("From", call.from.as_str()),
                    ("Url", call.callback_url.as_str()),
                ],
            )
            .await?;
        debug!(status = ?ack.status, callback_url = %call.callback_url, "Call queued to Twilio");
        Ok(ack)
    }
}
