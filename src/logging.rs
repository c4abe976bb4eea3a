//! Tracing subscriber setup for the binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_ENV: &str = "STATIONVOX_LOG";

/// Filter directive for the CLI verbosity flags.
///
/// `quiet` wins over `verbose`; each `-v` raises stationvox's own level one
/// step while dependencies stay at `warn`.
pub fn filter_directive(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn,stationvox=info",
        1 => "warn,stationvox=debug",
        _ => "info,stationvox=trace",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `STATIONVOX_LOG` overrides the directive derived from the flags.
/// Calling this twice is harmless.
pub fn init(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(quiet, verbose)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose >= 2),
        )
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(filter_directive(true, 2), "error");
    }

    #[test]
    fn verbosity_raises_own_level() {
        assert_eq!(filter_directive(false, 0), "warn,stationvox=info");
        assert_eq!(filter_directive(false, 1), "warn,stationvox=debug");
        assert_eq!(filter_directive(false, 5), "info,stationvox=trace");
    }

    #[test]
    fn directives_parse() {
        for verbose in 0..3 {
            assert!(EnvFilter::try_new(filter_directive(false, verbose)).is_ok());
        }
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(true, 0);
        init(false, 1);
    }
}
