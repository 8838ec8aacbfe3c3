use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: request traces from the HTTP layer
/// plus one event per store mutation (`record_created`, `record_updated`,
/// `record_removed`).
const DEFAULT_FILTER: &str = "info,tower_http=info,service::store=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Human-readable single-line output on stdout, the `compact` log format.
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// One JSON object per event on stdout, the `json` log format. Store spans
/// keep their `collection`/`id` fields as structured keys.
pub fn init_logging_json() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .json()
        .with_writer(io::stdout)
        .try_init();
}

/// Install the subscriber named by `logging.format`; anything but `json`
/// falls back to compact. A second call is a no-op.
pub fn init_logging(format: &str) {
    if format.eq_ignore_ascii_case("json") {
        init_logging_json();
    } else {
        init_logging_default();
    }
}
