//! Logging setup built on the standard `log` facade
//!
//! Library code only uses `log::debug!`, `log::warn!` and friends. Binaries call
//! [`init_logging`] once at startup to install an `env_logger` backend with the
//! configured level and format.
//!
//! ```rust,no_run
//! use tabula_core::config::LoggingConfig;
//!
//! tabula_core::logging::init_logging(&LoggingConfig::production()).unwrap();
//! log::info!("serving {} collections", 3);
//! ```

pub mod config;
pub mod formatter;

pub use config::LogLevel;
pub use formatter::LogFormat;

use crate::config::LoggingConfig;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger. Safe to call more than once; only the first call wins.
///
/// `RUST_LOG` still refines per-module filters on top of the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = init_logging_internal(config);
    });
    result
}

fn init_logging_internal(config: &LoggingConfig) -> anyhow::Result<()> {
    let format = config.format;
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level.to_level_filter());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(move |buf, record| {
        use std::io::Write;
        writeln!(buf, "{}", format.format_record(record))
    });
    builder.try_init()?;
    Ok(())
}
