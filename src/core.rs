//! Core domain types and service traits for alertdispatch
//!
//! This module defines the data passed into every dispatch (events, trigger,
//! contact) and the `Sender` contract implemented by every channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::dispatcher::DispatchError;

/// The state of a metric as reported by an alert event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Ok,
    Warn,
    Error,
    Nodata,
    Test,
}

/// Fixed severity table used when aggregating the states of a batch.
///
/// Multi-event summaries list states in this order, never in arrival order.
pub const SEVERITY_ORDER: [State; 5] = [
    State::Ok,
    State::Warn,
    State::Error,
    State::Nodata,
    State::Test,
];

impl State {
    /// The upper-case name used in every rendered message.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Ok => "OK",
            State::Warn => "WARN",
            State::Error => "ERROR",
            State::Nodata => "NODATA",
            State::Test => "TEST",
        }
    }

    /// Position of this state in [`SEVERITY_ORDER`].
    pub fn rank(self) -> usize {
        SEVERITY_ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or(SEVERITY_ORDER.len())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alert observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Identifier of the trigger that produced the event
    pub trigger_id: String,
    /// Metric name
    pub metric: String,
    /// Observed value; `None` when the metric had no data
    #[serde(default)]
    pub value: Option<f64>,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// State before the transition
    pub old_state: State,
    /// State after the transition
    pub state: State,
    /// Optional free text attached by the trigger
    #[serde(default)]
    pub message: Option<String>,
}

/// The alerting rule that produced a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Trigger {
    /// Renders the tags as `[tag1][tag2]`, in trigger order.
    pub fn bracketed_tags(&self) -> String {
        self.tags.iter().map(|tag| format!("[{}]", tag)).collect()
    }
}

/// The destination of a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Contact {
    /// Channel kind, used to pick a sender (e.g. "slack", "phone")
    #[serde(rename = "type")]
    pub contact_type: String,
    /// Address on that channel: chat channel id, phone number, ...
    pub value: String,
}

/// Error returned when constructing an invalid [`EventBatch`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("an event batch must contain at least one event")]
    Empty,
}

/// Everything a sender needs for one delivery.
///
/// The event list is guaranteed non-empty and cannot be changed after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawEventBatch")]
pub struct EventBatch {
    events: Vec<Event>,
    pub contact: Contact,
    pub trigger: Trigger,
    /// Upstream suppressed part of the event volume for this trigger
    #[serde(default)]
    pub throttled: bool,
}

#[derive(Deserialize)]
struct RawEventBatch {
    events: Vec<Event>,
    contact: Contact,
    trigger: Trigger,
    #[serde(default)]
    throttled: bool,
}

impl TryFrom<RawEventBatch> for EventBatch {
    type Error = BatchError;

    fn try_from(raw: RawEventBatch) -> Result<Self, Self::Error> {
        let mut batch = EventBatch::new(raw.events, raw.contact, raw.trigger)?;
        batch.throttled = raw.throttled;
        Ok(batch)
    }
}

impl EventBatch {
    /// Creates a non-throttled batch.
    ///
    /// # Returns
    /// * `Err(BatchError::Empty)` if `events` is empty
    pub fn new(events: Vec<Event>, contact: Contact, trigger: Trigger) -> Result<Self, BatchError> {
        if events.is_empty() {
            return Err(BatchError::Empty);
        }
        Ok(Self {
            events,
            contact,
            trigger,
            throttled: false,
        })
    }

    /// A single synthetic `TEST` event for checking a contact's setup.
    pub fn test_notification(contact: Contact, trigger_name: &str, timestamp: i64) -> Self {
        let event = Event {
            trigger_id: String::new(),
            metric: "Test.metric.value".to_string(),
            value: Some(1.0),
            timestamp,
            old_state: State::Test,
            state: State::Test,
            message: None,
        };
        Self {
            events: vec![event],
            contact,
            trigger: Trigger {
                id: String::new(),
                name: trigger_name.to_string(),
                tags: vec!["test".to_string()],
            },
            throttled: false,
        }
    }

    /// Marks the batch as throttled.
    pub fn with_throttled(mut self, throttled: bool) -> Self {
        self.throttled = throttled;
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The first event of the batch. Always present.
    pub fn first(&self) -> &Event {
        &self.events[0]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if any event moved to a state other than `OK`.
    pub fn has_problems(&self) -> bool {
        self.events.iter().any(|e| e.state != State::Ok)
    }

    /// Distinct new states present in the batch, in [`SEVERITY_ORDER`].
    pub fn distinct_states(&self) -> Vec<State> {
        SEVERITY_ORDER
            .iter()
            .copied()
            .filter(|state| self.events.iter().any(|e| e.state == *state))
            .collect()
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// The uniform entry point for every notification channel.
#[async_trait]
pub trait Sender: Send + Sync {
    /// A short name for the channel variant ("chat", "sms", "voice").
    /// Used for logging and metrics.
    fn channel(&self) -> &'static str;

    /// Renders the payload `send_events` would deliver, without sending it.
    fn preview(&self, batch: &EventBatch) -> String;

    /// Composes a message for the batch and delivers it to `batch.contact`.
    ///
    /// # Returns
    /// * `Ok(())` if the transport accepted the message
    /// * `Err(DispatchError)` wrapping the transport failure and destination
    async fn send_events(&self, batch: &EventBatch) -> Result<(), DispatchError>;
}
