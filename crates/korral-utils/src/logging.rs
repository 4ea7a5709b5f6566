/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Korral Logging Module
//!
//! Installs the process-wide `tracing` subscriber used by every korral crate.
//!
//! ## Usage
//!
//! 1. Initialize the subscriber:
//!    ```rust,ignore
//!    korral_utils::logging::init("info", "text")?;
//!    ```
//!
//! 2. Use the re-exported macros throughout your code:
//!    ```rust,ignore
//!    use korral_utils::logging::prelude::*;
//!    info!(cluster = %name, "watch established");
//!    ```
//!
//! 3. Update the log level at runtime if needed:
//!    ```rust,ignore
//!    korral_utils::logging::update_log_level("debug")?;
//!    ```
//!
//! ## Log Levels
//!
//! "off", "error", "warn", "info", "debug" and "trace". Unknown strings fall
//! back to "info". When `RUST_LOG` is set it takes precedence over the
//! configured level at initialization.

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Identity, Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

pub use tracing::{debug, error, info, trace, warn};

/// Subscriber type every extra layer is stacked on.
pub type BaseSubscriber = Layered<reload::Layer<EnvFilter, Registry>, Registry>;

static FILTER_HANDLE: OnceCell<reload::Handle<EnvFilter, Registry>> = OnceCell::new();

/// Error type for logging initialization and level updates
#[derive(Debug)]
pub enum LoggingError {
    /// A global subscriber could not be installed
    SubscriberError(String),
    /// The level filter could not be swapped
    ReloadError(String),
    /// `update_log_level` was called before `init`
    NotInitialized,
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggingError::SubscriberError(e) => write!(f, "Subscriber error: {}", e),
            LoggingError::ReloadError(e) => write!(f, "Reload error: {}", e),
            LoggingError::NotInitialized => write!(f, "Logging has not been initialized"),
        }
    }
}

impl std::error::Error for LoggingError {}

/// Initializes the korral logging system.
///
/// Calling it again after a successful initialization only updates the level.
///
/// # Arguments
/// * `level` - Log level string ("trace", "debug", "info", "warn", "error", "off")
/// * `format` - Output format ("text" for human-readable, "json" for structured JSON)
///
/// # Returns
/// * `Result<(), LoggingError>` - Success/failure of subscriber installation
pub fn init(level: &str, format: &str) -> Result<(), LoggingError> {
    install(level, format, None::<Identity>)
}

/// Installs the subscriber with an optional extra layer (e.g. OpenTelemetry).
pub(crate) fn install<L>(level: &str, format: &str, extra: Option<L>) -> Result<(), LoggingError>
where
    L: Layer<BaseSubscriber> + Send + Sync + 'static,
{
    if FILTER_HANDLE.get().is_some() {
        return update_log_level(level);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(str_to_level_filter(level).into()));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry().with(filter_layer).with(extra);

    let installed = if format.eq_ignore_ascii_case("json") {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| LoggingError::SubscriberError(e.to_string()))?;

    // A concurrent initializer may have won the race; its handle is equivalent.
    let _ = FILTER_HANDLE.set(handle);
    Ok(())
}

/// Updates the current log level.
///
/// # Arguments
///
/// * `level` - The new log level; unknown strings fall back to "info"
///
/// # Returns
///
/// * `Ok(())` if the filter was swapped
/// * `Err(LoggingError)` if logging is not initialized or the swap failed
pub fn update_log_level(level: &str) -> Result<(), LoggingError> {
    let handle = FILTER_HANDLE.get().ok_or(LoggingError::NotInitialized)?;
    let filter = EnvFilter::default().add_directive(str_to_level_filter(level).into());
    handle
        .reload(filter)
        .map_err(|e| LoggingError::ReloadError(e.to_string()))
}

/// Returns the most verbose level the current filter enables, if initialized.
pub fn current_level() -> Option<LevelFilter> {
    FILTER_HANDLE
        .get()
        .and_then(|handle| handle.with_current(|f| f.max_level_hint()).ok().flatten())
}

fn str_to_level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" => LevelFilter::WARN,
        "info" => LevelFilter::INFO,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{info_span, instrument, Instrument};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_str_to_level_filter() {
        assert_eq!(str_to_level_filter("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(str_to_level_filter("warn"), LevelFilter::WARN);
        assert_eq!(str_to_level_filter("off"), LevelFilter::OFF);
        assert_eq!(str_to_level_filter("invalid_level"), LevelFilter::INFO);
    }

    #[test]
    #[serial]
    /// Verifies that the subscriber initializes and that later calls only
    /// adjust the level.
    fn test_init_and_update_log_level() {
        std::env::remove_var("RUST_LOG");
        assert!(init("info", "text").is_ok());

        assert!(update_log_level("debug").is_ok());
        assert_eq!(current_level(), Some(LevelFilter::DEBUG));

        assert!(init("warn", "json").is_ok());
        assert_eq!(current_level(), Some(LevelFilter::WARN));

        assert!(update_log_level("another_invalid_level").is_ok());
        assert_eq!(current_level(), Some(LevelFilter::INFO));
    }

    #[test]
    #[serial]
    #[allow(clippy::assertions_on_constants)]
    fn test_log_macros() {
        init("debug", "text").expect("Failed to initialize logger");

        debug!("This is a debug message");
        info!(cluster = "c1", "This is an info message");
        warn!("This is a warning message");
        error!("This is an error message");

        assert!(true);
    }
}
