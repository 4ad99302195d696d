//! A logging utility to provide a standard interface for Lively apps.
//!
//! ```no_run
//! fn main() {
//!     lively_logger::init(tracing::Level::INFO).expect("failed to init logger");
//!     tracing::info!("starting app");
//! }
//! ```

use tracing::Level;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Attempt to initialize the subscriber, returning an error when another
/// subscriber already claimed the process.
///
/// `RUST_LOG` overrides the provided level when set.
pub fn init(level: Level) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .finish()
        .try_init()?;
    Ok(())
}
