//! Logging initialization
//!
//! Thin helper over tracing-subscriber for host binaries; honors
//! `RUST_LOG` when set, falls back to the supplied level for this
//! crate. Safe to call more than once.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("livebind={},info", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
