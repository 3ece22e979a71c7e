//! Configuration management for alertdispatch
//!
//! This module defines the main `Config` struct, which holds the log level
//! and one flat settings table per configured sender. It uses the `figment`
//! crate to load configuration from a TOML file and merge it with environment
//! variables and command-line arguments.

use crate::cli::Cli;
use crate::resolver::Settings;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map, Value},
    Figment, Metadata, Profile, Provider,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of every environment variable read by [`Config::load`].
pub const ENV_PREFIX: &str = "ALERTDISPATCH_";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Sender settings, keyed by sender name.
    #[serde(default)]
    pub senders: BTreeMap<String, SenderConfig>,
}

/// Configuration for a single sender.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SenderConfig {
    /// Contact type routed to this sender. Defaults to the sender name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_type: Option<String>,
    /// Every other key is handed to the variant resolver.
    #[serde(flatten)]
    pub settings: BTreeMap<String, SettingValue>,
}

/// A scalar setting. TOML and environment values are accepted in any scalar
/// form and handed to the resolver as strings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Text(s) => f.write_str(s),
            SettingValue::Flag(b) => write!(f, "{}", b),
            SettingValue::Integer(i) => write!(f, "{}", i),
            SettingValue::Float(x) => write!(f, "{}", x),
        }
    }
}

impl SenderConfig {
    /// The flat string map consumed by [`crate::resolver::resolve`].
    pub fn resolver_settings(&self) -> Settings {
        self.settings
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }

    /// The contact type this sender serves.
    pub fn contact_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.contact_type.as_deref().unwrap_or(name)
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are layered: defaults, the TOML file named by `--config`,
    /// environment variables, then command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .split("__")
                    .filter(|key| !key.as_str().to_ascii_lowercase().starts_with("senders")),
            )
            // e.g. ALERTDISPATCH_SENDERS__SMS__AUTH_TOKEN=...
            .merge(SenderEnv::from_env())
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

/// Sender settings taken from `ALERTDISPATCH_SENDERS__<NAME>__<KEY>` variables.
///
/// Values stay raw strings: figment's `Env` would turn `+15550199` or `007`
/// into integers and drop the sign or the leading zeros.
#[derive(Debug, Clone, Default)]
pub struct SenderEnv {
    vars: Vec<(String, String)>,
}

impl SenderEnv {
    /// Captures the process environment. Non-UTF-8 variables are skipped.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl Provider for SenderEnv {
    fn metadata(&self) -> Metadata {
        Metadata::named("Sender environment variables")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let prefix = format!("{}senders__", ENV_PREFIX.to_ascii_lowercase());
        let mut senders: BTreeMap<String, Dict> = BTreeMap::new();

        for (key, value) in &self.vars {
            let key = key.to_ascii_lowercase();
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some((name, setting)) = rest.split_once("__") else {
                continue;
            };
            if name.is_empty() || setting.is_empty() {
                continue;
            }
            senders
                .entry(name.to_string())
                .or_default()
                .insert(setting.to_string(), Value::from(value.clone()));
        }

        let mut dict = Dict::new();
        if !senders.is_empty() {
            dict.insert("senders".into(), Value::from(senders));
        }
        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            senders: BTreeMap::new(),
        }
    }
}
