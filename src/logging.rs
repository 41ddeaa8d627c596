use tracing_subscriber::EnvFilter;

use crate::error::TradeViewError;

/// Install a global fmt subscriber. `RUST_LOG` takes precedence over
/// `default_level`. Fails if a subscriber is already installed.
pub fn init_logging(default_level: &str) -> Result<(), TradeViewError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| TradeViewError::InvalidArgument(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| TradeViewError::Logging(e.to_string()))
}
