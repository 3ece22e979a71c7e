//! Selects and builds a channel variant from a flat settings map.
//!
//! Resolution is purely local: required fields are validated and the
//! transport handle is constructed, but nothing is sent.

use crate::dispatcher::{ChannelVariant, ChatChannel, SmsChannel, VoiceChannel};
use crate::formatting::{ChatComposer, SmsComposer, SubjectPolicy, VoiceComposer};
use crate::transport::{PhoneCredentials, TransportError, TransportFactory};
use chrono::{FixedOffset, Local, Offset};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Flat per-channel settings, as read from configuration.
pub type Settings = HashMap<String, String>;

/// Username shown next to chat messages unless `username` is configured.
pub const DEFAULT_USERNAME: &str = "Alerting";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("can not read [{variant}] {field} param from config")]
    MissingField { variant: String, field: &'static str },

    #[error("unknown sender type: {0}")]
    UnknownVariant(String),

    #[error("invalid value '{value}' for [{variant}] {field} param")]
    InvalidValue {
        variant: String,
        field: &'static str,
        value: String,
    },

    #[error("failed to build [{variant}] transport: {source}")]
    Transport {
        variant: String,
        source: TransportError,
    },

    #[error("sender '{name}': {source}")]
    Sender {
        name: String,
        source: Box<ConfigError>,
    },

    #[error("contact type '{0}' is configured more than once")]
    DuplicateContactType(String),
}

/// The variant families a discriminator can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariantKind {
    Chat,
    Sms,
    Voice,
}

impl VariantKind {
    fn from_discriminator(value: &str) -> Result<Self, ConfigError> {
        match value {
            "" | "chat" | "slack" => Ok(VariantKind::Chat),
            "sms" | "twilio sms" => Ok(VariantKind::Sms),
            "voice" | "twilio voice" => Ok(VariantKind::Voice),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

/// Looks up the first non-empty value among `keys`.
fn lookup<'a>(settings: &'a Settings, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| settings.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Looks up a required field; `aliases` are accepted legacy key names.
fn required<'a>(
    settings: &'a Settings,
    variant: &str,
    field: &'static str,
    aliases: &[&str],
) -> Result<&'a str, ConfigError> {
    let keys: Vec<&str> = std::iter::once(field).chain(aliases.iter().copied()).collect();
    lookup(settings, &keys).ok_or_else(|| ConfigError::MissingField {
        variant: variant.to_string(),
        field,
    })
}

/// The offset used to render event times; defaults to the host's local offset.
fn utc_offset(settings: &Settings, variant: &str) -> Result<FixedOffset, ConfigError> {
    match lookup(settings, &["utc_offset"]) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            variant: variant.to_string(),
            field: "utc_offset",
            value: value.to_string(),
        }),
        None => Ok(Local::now().offset().fix()),
    }
}

/// Resolves `settings` into exactly one configured [`ChannelVariant`].
///
/// # Arguments
/// * `settings` - Flat key/value settings; `type` selects the variant
/// * `factory` - Builds the transport handle from validated credentials
pub fn resolve(
    settings: &Settings,
    factory: &dyn TransportFactory,
) -> Result<ChannelVariant, ConfigError> {
    let discriminator = lookup(settings, &["type"]).unwrap_or_default();
    let kind = VariantKind::from_discriminator(discriminator)?;
    let variant = if discriminator.is_empty() {
        "slack"
    } else {
        discriminator
    };
    let api_url = lookup(settings, &["api_url"]);

    let resolved = match kind {
        VariantKind::Chat => {
            let api_token = required(settings, variant, "api_token", &[])?;
            let front_uri = lookup(settings, &["front_uri"]).unwrap_or_default();
            let username = lookup(settings, &["username"]).unwrap_or(DEFAULT_USERNAME);
            let offset = utc_offset(settings, variant)?;
            let transport = factory
                .chat(api_token, api_url)
                .map_err(|source| transport_error(variant, source))?;

            ChannelVariant::Chat(ChatChannel {
                composer: ChatComposer::new(front_uri, offset),
                username: username.to_string(),
                transport,
            })
        }
        VariantKind::Sms | VariantKind::Voice => {
            resolve_phone(settings, kind, variant, api_url, factory)?
        }
    };

    debug!(variant, channel = resolved.name(), "Resolved sender settings");
    Ok(resolved)
}

fn transport_error(variant: &str, source: TransportError) -> ConfigError {
    ConfigError::Transport {
        variant: variant.to_string(),
        source,
    }
}

/// Composer for a phone variant, chosen before the transport is built.
enum PhoneComposer {
    Sms(SmsComposer),
    Voice(VoiceComposer),
}

fn resolve_phone(
    settings: &Settings,
    kind: VariantKind,
    variant: &str,
    api_url: Option<&str>,
    factory: &dyn TransportFactory,
) -> Result<ChannelVariant, ConfigError> {
    let account_sid = required(settings, variant, "account_sid", &["api_asid"])?;
    let auth_token = required(settings, variant, "auth_token", &["api_authtoken"])?;
    let from_phone = required(settings, variant, "from_phone", &["api_fromphone"])?;

    let composer = if kind == VariantKind::Voice {
        let voice_url = required(settings, variant, "voice_url", &["voiceurl"])?;
        let append_message = lookup(settings, &["append_message"]) == Some("true");
        PhoneComposer::Voice(VoiceComposer::new(voice_url, append_message))
    } else {
        let policy = match lookup(settings, &["subject_policy"]) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                variant: variant.to_string(),
                field: "subject_policy",
                value: value.to_string(),
            })?,
            None => SubjectPolicy::default(),
        };
        PhoneComposer::Sms(SmsComposer::new(policy, utc_offset(settings, variant)?))
    };

    let credentials = PhoneCredentials {
        account_sid: account_sid.to_string(),
        auth_token: auth_token.to_string(),
    };
    let transport = factory
        .phone(&credentials, api_url)
        .map_err(|source| transport_error(variant, source))?;
    let from_phone = from_phone.to_string();

    Ok(match composer {
        PhoneComposer::Sms(composer) => ChannelVariant::Sms(SmsChannel {
            composer,
            from_phone,
            transport,
        }),
        PhoneComposer::Voice(composer) => ChannelVariant::Voice(VoiceChannel {
            composer,
            from_phone,
            transport,
        }),
    })
}
