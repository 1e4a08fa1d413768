//! Tracing initialization with decoder verbosity levels
//!
//! The decoder's diagnostics are layered the way pager decoders usually
//! step their verbosity: decoded traffic and lock/sync events first, then
//! per-frame diagnostics, then per-word traces. A verbosity level picks the
//! default filter; the `RUST_LOG` environment variable always wins when set:
//! - `RUST_LOG=rustyflex=debug` - Show all frame diagnostics
//! - `RUST_LOG=rustyflex::demod=trace` - Trace specific module
//! - `RUST_LOG=rustyflex=debug,rustyflex::bch=trace` - Mixed levels

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive for a decoder verbosity level.
///
/// - 0: messages, lock and sync events (`rustyflex=info`)
/// - 1: frame, FIW and BCH correction diagnostics (`rustyflex=debug`)
/// - 2 and up: per-word and per-page traces (`rustyflex=trace`)
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "rustyflex=info",
        1 => "rustyflex=debug",
        _ => "rustyflex=trace",
    }
}

/// Filter for a decoder verbosity level, unless `RUST_LOG` overrides it.
pub fn filter_for_verbosity(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Initialize tracing for binaries at the given decoder verbosity.
///
/// Call this early in main(), after argument parsing.
pub fn init_tracing(verbosity: u8) {
    fmt()
        .with_env_filter(filter_for_verbosity(verbosity))
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Initialize tracing for tests, quiet by default
///
/// Defaults to `rustyflex=warn` so passing tests stay silent; raise with
/// RUST_LOG as above. Call this once at the start of each test that needs
/// tracing. Multiple calls are safe (uses once_cell).
#[cfg(test)]
pub fn init_test_tracing() {
    use once_cell::sync::Lazy;

    static TRACING: Lazy<()> = Lazy::new(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rustyflex=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}
