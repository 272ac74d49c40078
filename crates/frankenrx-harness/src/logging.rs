#![forbid(unsafe_code)]

//! Log setup for test binaries.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the test log filter.
pub const LOG_FILTER_ENV: &str = "FRANKENRX_LOG";

/// Install a test-writer subscriber once per process.
///
/// The filter comes from `FRANKENRX_LOG` (e.g. `frankenrx_core=trace`) and
/// defaults to `info`. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter)
        .try_init();
}
