//! Process-wide observability setup: tracing subscriber initialization and
//! the shared metric storage registry.

pub mod metrics;

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// `env_filter` uses the usual `RUST_LOG` syntax. With `json` set, events are
/// emitted as one JSON object per line for log collectors; otherwise the
/// human-readable format is used.
///
/// Calling this more than once is a no-op so tests can initialize logging
/// unconditionally.
pub fn tracing_init(env_filter: &str, json: bool) {
    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(!json);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
