//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` drives the filter; a `format`
/// of `json` emits JSON lines, anything else the human format.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(format: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if format.is_some_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    // already installed by a test harness or an earlier call
    let _ = installed;
}
