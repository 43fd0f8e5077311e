//! Tracing subscriber setup.
//!
//! Logs go to stderr so `kb ask` output on stdout stays pipeable.
//! `RUST_LOG` takes precedence over `[logging] level`.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// Calling this twice is an error from `tracing-subscriber`; the CLI calls
/// it once at startup.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,mandate_kb={0},mandate_kb_core={0}", config.level))
    });

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    Ok(())
}
