//! Tracing subscriber configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switchboard_core::config::LoggingConfig;
use switchboard_core::{Error, Result};

/// Configure stdout logging.
///
/// `RUST_LOG` overrides the configured level when set. With `json` enabled,
/// log lines are emitted as structured JSON for collection.
pub fn configure_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("{},switchboard=debug", config.level)),
    );

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| Error::gateway(format!("failed to init tracing: {}", e)))
}
