//! Structured logging using the tracing crate.
//!
//! Log output goes to stderr so stdout stays free for host notifications.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// The level comes from `RUST_LOG` when set, otherwise from `default_filter`
/// (for example `capture_relay=debug`).
pub fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init()?;

    tracing::info!("Starting capture-relay v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
