//! Loading sender configuration from TOML.

use alertdispatch::cli::Cli;
use alertdispatch::config::{Config, SettingValue};
use alertdispatch::transport::test_utils::FakeTransportFactory;
use alertdispatch::{ConfigError, SenderRegistry};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn cli_for(file: &NamedTempFile) -> Cli {
    Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn test_load_full_valid_config() {
    let file = write_config(
        r#"
        log_level = "debug"

        [senders.slack]
        api_token = "xoxb-1"
        front_uri = "https://alerts.example.com"

        [senders.sms]
        contact_type = "phone"
        type = "sms"
        account_sid = "AC1"
        auth_token = "token"
        from_phone = "+15550199"

        [senders.voice]
        type = "voice"
        account_sid = "AC1"
        auth_token = "token"
        from_phone = "+15550199"
        voice_url = "https://twimlets.com/message?Message="
        append_message = true
        "#,
    );

    let config = Config::load(&cli_for(&file)).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.senders.len(), 3);
    assert_eq!(
        config.senders["voice"].settings["append_message"],
        SettingValue::Flag(true)
    );
    assert_eq!(config.senders["voice"].resolver_settings()["append_message"], "true");

    let registry = SenderRegistry::from_config(&config, &FakeTransportFactory::default()).unwrap();
    assert_eq!(registry.contact_types(), vec!["phone", "slack", "voice"]);
}

#[test]
fn test_cli_log_level_overrides_file() {
    let file = write_config("log_level = \"warn\"\n");
    let cli = Cli {
        log_level: Some("trace".to_string()),
        ..cli_for(&file)
    };

    let config = Config::load(&cli).unwrap();
    assert_eq!(config.log_level, "trace");
    assert!(config.senders.is_empty());
}

#[test]
fn test_defaults_without_file() {
    let config = Config::load(&Cli::default()).unwrap();
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_invalid_sender_is_reported_by_name() {
    let file = write_config(
        r#"
        [senders.sms]
        type = "sms"
        account_sid = ""
        auth_token = "token"
        from_phone = "+15550199"
        "#,
    );
    let config = Config::load(&cli_for(&file)).unwrap();

    let err = SenderRegistry::from_config(&config, &FakeTransportFactory::default())
        .err()
        .unwrap();
    assert_eq!(
        err,
        ConfigError::Sender {
            name: "sms".to_string(),
            source: Box::new(ConfigError::MissingField {
                variant: "sms".to_string(),
                field: "account_sid",
            }),
        }
    );
}
