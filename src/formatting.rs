// src/formatting.rs

//! Message composition for every channel family.
//!
//! Composers are pure: the same batch always produces byte-identical output.
//! The only time-dependent input is each event's own timestamp, rendered in
//! the composer's fixed UTC offset.

use crate::core::{Event, EventBatch, State};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Advisory appended to chat messages for throttled batches.
pub const CHAT_THROTTLED_NOTICE: &str =
    "\nPlease, *fix your system or tune this trigger* to generate less events.";

/// Advisory appended to SMS messages for throttled batches.
pub const SMS_THROTTLED_NOTICE: &str =
    "\n\nPlease, fix your system or tune this trigger to generate less events.";

/// SMS messages list at most this many events before the omission line kicks in.
pub const SMS_EVENT_LIMIT: usize = 5;

/// A composer turns a batch into channel-ready content.
pub trait Composer: Send + Sync {
    type Output;

    fn compose(&self, batch: &EventBatch) -> Self::Output;
}

/// Formats a metric value in the shortest plain decimal form.
///
/// Missing values and NaN render as `NaN`; no exponent is ever used.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        None => "NaN".to_string(),
        Some(v) if v.is_nan() => "NaN".to_string(),
        Some(v) if v.is_infinite() => {
            if v > 0.0 {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        }
        Some(v) => v.to_string(),
    }
}

/// Formats an epoch timestamp as `HH:MM` in the given offset.
pub fn format_time(timestamp: i64, offset: &FixedOffset) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.with_timezone(offset).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// One `HH:MM: metric = value (OLD to NEW)` line, prefixed by a newline.
fn format_event_line(event: &Event, offset: &FixedOffset) -> String {
    format!(
        "\n{}: {} = {} ({} to {})",
        format_time(event.timestamp, offset),
        event.metric,
        format_value(event.value),
        event.old_state,
        event.state
    )
}

// =============================================================================
// Chat
// =============================================================================

/// Chat message text plus the icon shown next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContent {
    pub text: String,
    pub icon_url: String,
}

/// Composer for team-chat messages with a link back to the trigger.
#[derive(Debug, Clone)]
pub struct ChatComposer {
    front_uri: String,
    offset: FixedOffset,
}

impl ChatComposer {
    pub fn new(front_uri: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            front_uri: front_uri.into(),
            offset,
        }
    }

    /// States shown in the message headline.
    ///
    /// A single event headlines with its own state; otherwise every distinct
    /// state appears once, in severity order.
    pub fn subject_states(batch: &EventBatch) -> Vec<State> {
        if batch.len() == 1 {
            vec![batch.first().state]
        } else {
            batch.distinct_states()
        }
    }

    fn icon_url(&self, batch: &EventBatch) -> String {
        let icon = if batch.has_problems() {
            "fav72_error.png"
        } else {
            "fav72_ok.png"
        };
        format!("{}/public/{}", self.front_uri, icon)
    }
}

impl Composer for ChatComposer {
    type Output = ChatContent;

    fn compose(&self, batch: &EventBatch) -> ChatContent {
        let mut text = if batch.len() == 1 {
            format!("*{}* ", batch.first().state)
        } else {
            Self::subject_states(batch)
                .iter()
                .map(|state| format!(" *{}*", state))
                .collect()
        };

        text.push_str(&batch.trigger.bracketed_tags());
        text.push_str(&format!(
            " <{}/#/events/{}|{}>\n```",
            self.front_uri,
            batch.first().trigger_id,
            batch.trigger.name
        ));

        for event in batch.events() {
            text.push_str(&format_event_line(event, &self.offset));
        }
        text.push_str("```");

        if batch.throttled {
            text.push_str(CHAT_THROTTLED_NOTICE);
        }

        ChatContent {
            text,
            icon_url: self.icon_url(batch),
        }
    }
}

// =============================================================================
// SMS
// =============================================================================

/// How the SMS headline picks the state that represents the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectPolicy {
    /// The first event that is not `OK`, or the first event if all are `OK`.
    #[default]
    FirstNonOk,
    /// The present state ranked last in the severity table.
    MostSevere,
}

impl SubjectPolicy {
    pub fn subject_state(self, batch: &EventBatch) -> State {
        match self {
            SubjectPolicy::FirstNonOk => batch
                .events()
                .iter()
                .find(|e| e.state != State::Ok)
                .unwrap_or_else(|| batch.first())
                .state,
            SubjectPolicy::MostSevere => batch
                .events()
                .iter()
                .map(|e| e.state)
                .max_by_key(|state| state.rank())
                .unwrap_or(batch.first().state),
        }
    }
}

impl FromStr for SubjectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_non_ok" => Ok(SubjectPolicy::FirstNonOk),
            "most_severe" => Ok(SubjectPolicy::MostSevere),
            other => Err(format!("unknown subject policy '{}'", other)),
        }
    }
}

/// Composer for plain-text SMS bodies.
#[derive(Debug, Clone)]
pub struct SmsComposer {
    policy: SubjectPolicy,
    offset: FixedOffset,
}

impl SmsComposer {
    pub fn new(policy: SubjectPolicy, offset: FixedOffset) -> Self {
        Self { policy, offset }
    }
}

impl Composer for SmsComposer {
    type Output = String;

    fn compose(&self, batch: &EventBatch) -> String {
        let mut message = format!(
            "{} {} {} ({})\n",
            self.policy.subject_state(batch),
            batch.trigger.name,
            batch.trigger.bracketed_tags(),
            batch.len()
        );

        for event in batch.events() {
            message.push_str(&format_event_line(event, &self.offset));
            if let Some(text) = event.message.as_deref().filter(|m| !m.is_empty()) {
                message.push_str(". ");
                message.push_str(text);
            }
        }

        if batch.len() > SMS_EVENT_LIMIT {
            message.push_str(&format!(
                "\n\n...and {} more events.",
                batch.len() - SMS_EVENT_LIMIT
            ));
        }

        if batch.throttled {
            message.push_str(SMS_THROTTLED_NOTICE);
        }

        message
    }
}

// =============================================================================
// Voice
// =============================================================================

/// Composer producing the callback URL a voice call fetches its script from.
#[derive(Debug, Clone)]
pub struct VoiceComposer {
    voice_url: String,
    append_message: bool,
}

impl VoiceComposer {
    pub fn new(voice_url: impl Into<String>, append_message: bool) -> Self {
        Self {
            voice_url: voice_url.into(),
            append_message,
        }
    }

    /// The sentence spoken to the callee.
    pub fn spoken_message(trigger_name: &str) -> String {
        format!(
            "Hi! This is a notification for trigger {}. Please, visit the web interface for details.",
            trigger_name
        )
    }
}

impl Composer for VoiceComposer {
    type Output = String;

    fn compose(&self, batch: &EventBatch) -> String {
        if !self.append_message {
            return self.voice_url.clone();
        }
        let spoken = Self::spoken_message(&batch.trigger.name);
        let encoded: String = url::form_urlencoded::byte_serialize(spoken.as_bytes()).collect();
        format!("{}{}", self.voice_url, encoded)
    }
}
