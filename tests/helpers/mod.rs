//! Shared fixtures for integration tests.

#![allow(dead_code)]

use alertdispatch::core::{Contact, Event, EventBatch, State, Trigger};
use alertdispatch::Settings;

/// 2017-07-14T02:40:00Z
pub const TIMESTAMP: i64 = 1_500_000_000;

pub fn event(metric: &str, old_state: State, state: State) -> Event {
    Event {
        trigger_id: "5f1c".to_string(),
        metric: metric.to_string(),
        value: Some(42.0),
        timestamp: TIMESTAMP,
        old_state,
        state,
        message: None,
    }
}

pub fn batch(contact_type: &str, value: &str, events: Vec<Event>) -> EventBatch {
    EventBatch::new(
        events,
        Contact {
            contact_type: contact_type.to_string(),
            value: value.to_string(),
        },
        Trigger {
            id: "5f1c".to_string(),
            name: "Api latency".to_string(),
            tags: vec!["api".to_string()],
        },
    )
    .expect("fixture batch must not be empty")
}

pub fn settings(pairs: &[(&str, &str)]) -> Settings {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn sms_settings() -> Settings {
    settings(&[
        ("type", "sms"),
        ("account_sid", "AC1"),
        ("auth_token", "token"),
        ("from_phone", "+15550199"),
        ("utc_offset", "+00:00"),
    ])
}
