//! Telemetry initialization.
//!
//! Events go to stderr so stdout stays free for command output (the JSON of
//! `last-release`, the file list of `changed-files`).
//!
//! - `RUST_LOG` set → used as the filter verbatim
//! - otherwise → `info`, or `debug` when the pipeline debug flag is on
//!
//! `json = true` switches the formatter to one JSON object per event, with
//! span close events, for log collectors.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Held by `main()` until exit.
///
/// Nothing needs flushing today; the guard keeps the call site stable if a
/// buffered exporter is added.
pub struct TelemetryGuard {
    _private: (),
}

/// Install the global subscriber.
///
/// Calling it twice (as tests may) leaves the first subscriber in place.
#[must_use]
pub fn init(debug: bool, json: bool) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    };

    if let Err(e) = installed {
        eprintln!("warning: tracing subscriber already installed: {e}");
    }

    TelemetryGuard { _private: () }
}

const fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_default_level() {
        assert_eq!(default_directive(false), "info");
        assert_eq!(default_directive(true), "debug");
    }

    #[test]
    fn second_init_does_not_panic() {
        let _a = init(false, false);
        let _b = init(true, true);
    }
}
