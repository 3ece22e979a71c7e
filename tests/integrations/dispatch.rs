//! End-to-end dispatch through in-memory transports.

use alertdispatch::core::{Sender, State};
use alertdispatch::transport::test_utils::{FakeTransportFactory, RecordingTransport, Sent};
use alertdispatch::transport::TransportError;
use alertdispatch::{ConfigError, DispatchError, Dispatcher};
use anyhow::Result;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::{batch, event, settings, sms_settings};

#[tokio::test]
async fn test_sms_batch_of_eight_lists_all_events_and_omission_line() -> Result<()> {
    let factory = FakeTransportFactory::default();
    let dispatcher = Dispatcher::init(&sms_settings(), &factory)?;

    let events = (0..8)
        .map(|i| event(&format!("api.p99.{}", i), State::Ok, State::Warn))
        .collect();
    dispatcher
        .send_events(&batch("phone", "+15550100", events))
        .await?;

    let sent = factory.transport.sent();
    let body = match sent.as_slice() {
        [Sent::Sms(message)] => message.body.clone(),
        other => panic!("expected a single SMS, got {:?}", other),
    };

    assert!(body.starts_with("WARN Api latency [api] (8)\n"));
    assert_eq!(body.matches("\n02:40: api.p99.").count(), 8);
    assert!(body.ends_with("\n\n...and 3 more events."));
    Ok(())
}

#[tokio::test]
async fn test_throttled_advisory_in_chat_and_sms() -> Result<()> {
    let factory = FakeTransportFactory::default();
    let chat = Dispatcher::init(
        &settings(&[("api_token", "xoxb"), ("utc_offset", "+00:00")]),
        &factory,
    )?;
    let sms = Dispatcher::init(&sms_settings(), &factory)?;

    let throttled = batch("slack", "C1", vec![event("m", State::Ok, State::Error)]).with_throttled(true);
    chat.send_events(&throttled).await?;
    sms.send_events(&throttled).await?;

    let sent = factory.transport.sent();
    assert_eq!(sent.len(), 2);
    match &sent[0] {
        Sent::Chat(m) => assert!(m
            .text
            .ends_with("\nPlease, *fix your system or tune this trigger* to generate less events.")),
        other => panic!("unexpected payload {:?}", other),
    }
    match &sent[1] {
        Sent::Sms(m) => assert!(m
            .body
            .ends_with("\n\nPlease, fix your system or tune this trigger to generate less events.")),
        other => panic!("unexpected payload {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_voice_call_with_appended_message() -> Result<()> {
    let factory = FakeTransportFactory::default();
    let mut s = sms_settings();
    s.insert("type".to_string(), "voice".to_string());
    s.insert(
        "voice_url".to_string(),
        "https://twimlets.com/message?Message%5B0%5D=".to_string(),
    );
    s.insert("append_message".to_string(), "true".to_string());
    let dispatcher = Dispatcher::init(&s, &factory)?;

    dispatcher
        .send_events(&batch("phone", "+15550100", vec![event("m", State::Ok, State::Error)]))
        .await?;

    match factory.transport.sent().as_slice() {
        [Sent::Call(call)] => {
            assert!(call
                .callback_url
                .starts_with("https://twimlets.com/message?Message%5B0%5D=Hi%21"));
            assert!(call.callback_url.contains("Api+latency"));
            assert_eq!(call.to, "+15550100");
        }
        other => panic!("expected a single call, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_provider_rejection_becomes_dispatch_error() -> Result<()> {
    let factory = FakeTransportFactory::new(RecordingTransport::failing(TransportError::Rejected {
        status: 429,
        message: "Too Many Requests".to_string(),
        correlation_id: Some("RQ7".to_string()),
    }));
    let dispatcher = Dispatcher::init(&sms_settings(), &factory)?;

    let err = dispatcher
        .send_events(&batch("phone", "+15550100", vec![event("m", State::Ok, State::Error)]))
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        DispatchError::Transport { destination, correlation_id: Some(id), .. }
            if destination == "+15550100" && id == "RQ7"
    ));
    assert_eq!(factory.transport.sent().len(), 1, "the dispatcher must not retry");
    Ok(())
}

#[test]
fn test_missing_account_sid_is_a_config_error() {
    let mut s = sms_settings();
    s.insert("account_sid".to_string(), String::new());

    let err = Dispatcher::init(&s, &FakeTransportFactory::default())
        .err()
        .expect("resolution should fail");
    assert_eq!(
        err,
        ConfigError::MissingField {
            variant: "sms".to_string(),
            field: "account_sid",
        }
    );
}

#[test]
fn test_preview_is_deterministic() {
    let dispatcher = Dispatcher::init(
        &settings(&[("api_token", "xoxb"), ("front_uri", "https://front"), ("utc_offset", "+00:00")]),
        &FakeTransportFactory::default(),
    )
    .unwrap();
    let b = batch(
        "slack",
        "C1",
        vec![
            event("b", State::Ok, State::Test),
            event("a", State::Warn, State::Ok),
            event("c", State::Ok, State::Warn),
        ],
    );

    let first = dispatcher.preview(&b);
    assert_eq!(first, dispatcher.preview(&b));
    assert!(first.starts_with(" *OK* *WARN* *TEST*[api] <https://front/#/events/5f1c|Api latency>\n```"));
}
