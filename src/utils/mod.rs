pub mod build_info;
pub mod listeners;
pub mod persistence;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "people_ledger=info";

/// Initializes the global tracing subscriber with sensible defaults.
///
/// `RUST_LOG` takes precedence; `fallback` (usually from the config file) is used when it
/// is unset, then the crate-wide default.
pub fn init_tracing(fallback: Option<&str>) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback.unwrap_or(DEFAULT_FILTER)))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // A subscriber installed by the host (or a test harness) wins.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
