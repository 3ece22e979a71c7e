//! Dispatchers wired to the bundled HTTP transports, against mock providers.

use alertdispatch::core::{Sender, State};
use alertdispatch::transport::{HttpTransportFactory, TransportError};
use alertdispatch::{DispatchError, Dispatcher};
use anyhow::Result;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::{batch, event, settings, sms_settings};

#[tokio::test]
async fn test_chat_message_reaches_slack_api() -> Result<()> {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-secret"))
        .and(body_string_contains("channel=C024BE91L"))
        .and(body_string_contains("fav72_error.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "ts": "1.2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api_url = server.uri();
    let dispatcher = Dispatcher::init(
        &settings(&[
            ("type", "slack"),
            ("api_token", "xoxb-secret"),
            ("front_uri", "https://alerts.example.com"),
            ("api_url", api_url.as_str()),
        ]),
        &HttpTransportFactory::default(),
    )?;

    // Act
    dispatcher
        .send_events(&batch("slack", "C024BE91L", vec![event("m", State::Ok, State::Error)]))
        .await?;

    // Assert: `expect(1)` is verified when the server drops.
    Ok(())
}

#[tokio::test]
async fn test_sms_reaches_twilio_api() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
        .and(body_string_contains("From=%2B15550199"))
        .and(body_string_contains("To=%2B15550100"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({"sid": "SM1", "status": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut s = sms_settings();
    s.insert("api_url".to_string(), server.uri());
    let dispatcher = Dispatcher::init(&s, &HttpTransportFactory::default())?;

    dispatcher
        .send_events(&batch("phone", "+15550100", vec![event("m", State::Ok, State::Warn)]))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_slow_provider_surfaces_as_timeout() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({"sid": "SM1"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut s = sms_settings();
    s.insert("api_url".to_string(), server.uri());
    let dispatcher = Dispatcher::init(&s, &HttpTransportFactory::new(Duration::from_millis(300)))?;

    let err = dispatcher
        .send_events(&batch("phone", "+15550100", vec![event("m", State::Ok, State::Warn)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Transport {
            source: TransportError::Timeout,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_twilio_rejection_keeps_destination() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"code": 20003, "message": "Authenticate"})),
        )
        .mount(&server)
        .await;

    let mut s = sms_settings();
    s.insert("api_url".to_string(), server.uri());
    let dispatcher = Dispatcher::init(&s, &HttpTransportFactory::default())?;

    let err = dispatcher
        .send_events(&batch("phone", "+15550100", vec![event("m", State::Ok, State::Warn)]))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("+15550100"), "{}", message);
    assert!(message.contains("Authenticate (code 20003)"), "{}", message);
    Ok(())
}
