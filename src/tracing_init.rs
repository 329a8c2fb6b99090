//! Subscribers for the digitization pipeline's tracing events
//!
//! The library only emits events. Hosts that install their own subscriber never call into
//! this module. Per-candidate detector decisions and per-beat delineation are `trace` events
//! and stay silent unless `RUST_LOG` asks for them, e.g.
//! `RUST_LOG=rustyecg=debug,rustyecg::qrs::state=trace`.

#[cfg(test)]
use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

/// Directive used by host binaries when `RUST_LOG` is unset
const HOST_DIRECTIVE: &str = "rustyecg=info";

/// Unit tests only surface warnings (implausible signals, skipped filter stages)
#[cfg(test)]
const TEST_DIRECTIVE: &str = "rustyecg=warn";

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the test-writer subscriber once per test binary
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        let _ = fmt()
            .with_env_filter(env_filter(TEST_DIRECTIVE))
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .try_init();
    });

    Lazy::force(&TRACING);
}

/// Install the global subscriber for a host binary
///
/// Per-lead work runs on rayon workers, so events carry their thread id. Returns `false`
/// when the host already installed a subscriber; that one is left in place.
pub fn init_tracing() -> bool {
    fmt()
        .with_env_filter(env_filter(HOST_DIRECTIVE))
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}
