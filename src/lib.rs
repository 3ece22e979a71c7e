/// alertdispatch - Notification dispatch for an alerting platform
///
/// This library turns batches of alert events into chat messages, SMS texts
/// and voice calls, and delivers them through pluggable transports.
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod formatting;
pub mod registry;
pub mod resolver;
pub mod transport;

// Re-export core types for convenience
pub use crate::core::*;
pub use dispatcher::{DispatchError, Dispatcher};
pub use registry::SenderRegistry;
pub use resolver::{resolve, ConfigError, Settings};
