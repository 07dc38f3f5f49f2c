//! Tracing setup for the momentum service binary

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to `service` and the
/// workspace crates, and everything else logs at `warn`.
pub fn init_strategy_logging(service: &str, level: &str, json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,{service}={level},okx_adapter={level},momentum_config={level}"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json {
        builder.json().finish().try_init()
    } else {
        builder.finish().try_init()
    }
}
