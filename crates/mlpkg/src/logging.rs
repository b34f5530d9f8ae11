//! Logging set-up for the command line
//!
//! Diagnostics go to stderr through `tracing`; command output stays on
//! stdout. `RUST_LOG` takes precedence over the verbosity flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a `-v` count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "mlpkg=warn",
        1 => "mlpkg=info",
        _ => "mlpkg=debug",
    }
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init(verbosity: u8) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .compact(),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "mlpkg=warn");
        assert_eq!(default_directive(1), "mlpkg=info");
        assert_eq!(default_directive(5), "mlpkg=debug");
    }
}
