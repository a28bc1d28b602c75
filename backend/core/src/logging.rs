//! Structured logging bootstrap.
//!
//! Console output only: this is a library, so the host owns any file or
//! network sinks it wants layered on top.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global logger. Level comes from `RUST_LOG` when set,
/// falling back to `level`. Safe to call more than once; later calls are
/// no-ops.
pub fn init_logger(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
