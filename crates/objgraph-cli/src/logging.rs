//! Diagnostic logging for the command-line tools.
//!
//! Reports go to stdout; everything logged through `tracing` goes to
//! stderr, filtered by `OBJGRAPH_LOG` (for example `OBJGRAPH_LOG=debug` or
//! `OBJGRAPH_LOG=objgraph_core=debug`).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "OBJGRAPH_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs the stderr subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
