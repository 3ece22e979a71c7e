//! A client for posting messages through the Slack Web API.

use super::{http_client, Ack, ChatMessage, ChatTransport, TransportError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, instrument};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Header Slack uses to identify a request in its own logs.
const REQUEST_ID_HEADER: &str = "x-slack-req-id";

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Posts to `chat.postMessage` with a bot token.
pub struct SlackApiClient {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl SlackApiClient {
    /// Creates a new `SlackApiClient`. No request is made.
    pub fn new(api_token: &str, api_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }
}

#[async_trait]
impl ChatTransport for SlackApiClient {
    #[instrument(skip(self, message), fields(channel = %message.channel))]
    async fn post_message(&self, message: &ChatMessage) -> Result<Ack, TransportError> {
        let form = [
            ("channel", message.channel.as_str()),
            ("text", message.text.as_str()),
            ("username", message.username.as_str()),
            ("icon_url", message.icon_url.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.api_token)
            .form(&form)
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
            error!(status = %status, body = %text, "Slack API returned an HTTP error");
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: text,
                correlation_id: request_id,
            });
        }

        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            let reason = body.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(error = %reason, "Slack API rejected the message");
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: reason,
                correlation_id: request_id,
            });
        }

        info!("Message posted to Slack.");
        Ok(Ack {
            id: body.ts,
            status: Some("ok".to_string()),
        })
    }
}
