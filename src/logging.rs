//! Log setup for Kizuna binaries.
//!
//! Logs go to stderr so stdout stays free for the RPC channel. The filter comes
//! from `KIZUNA_LOG` (same syntax as `RUST_LOG`) and defaults to `info`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KIZUNA_LOG";

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
