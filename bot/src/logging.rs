//! Session log output.
//!
//! Progress lines (`info!`), soft failures (`warn!`) and probe detail
//! (`debug!`) go to stderr, each prefixed with the time since the bot
//! started. The final summary and the session report are separate product
//! output (see `io::report`) and unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` when set. Otherwise logs `info` for the bot (`debug`
/// with `verbose`) and `warn` for everything else.
///
/// # Example
/// ```bash
/// RUST_LOG=gfl_bot=debug gfl-bot run
/// ```
pub fn init(verbose: bool) {
    let default = if verbose {
        "warn,gfl_bot=debug"
    } else {
        "warn,gfl_bot=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::uptime())
                .with_target(false)
                .compact(),
        )
        .init();
}
