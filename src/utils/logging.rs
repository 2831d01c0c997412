//! Logging setup

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Setup logging with the specified level; `RUST_LOG` takes precedence.
///
/// Installs the global subscriber, so only the first call in a process
/// succeeds. Later calls return an error and leave the first one in place.
pub fn setup_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .with(filter)
        .try_init()
        .context("Global logger is already installed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_setup_fails() {
        assert!(setup_logging("info").is_ok());
        assert!(setup_logging("debug").is_err());
    }
}
