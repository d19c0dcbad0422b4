//! Diagnostic logging setup for the CLI.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the binary. `FTX_LOG` takes an `EnvFilter` directive and overrides the
//! level picked from `-v` flags.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive (e.g. `ftx=trace`).
pub const LOG_ENV_VAR: &str = "FTX_LOG";

/// Default level for a given number of `-v` flags.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a stderr fmt subscriber. Calling it twice is harmless.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }

    #[test]
    #[serial]
    fn init_is_idempotent() {
        init(0);
        init(2);
    }
}
