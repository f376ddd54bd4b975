use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "colloquy";

/// Used when `RUST_LOG` is unset. HTTP client internals stay at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Initialize tracing, honouring `RUST_LOG` when set.
///
/// Logs go to stderr so they never interleave with the transcript on stdout.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

pub fn log_startup() {
    tracing::info!("{APP_NAME} {} starting", env!("CARGO_PKG_VERSION"));
}

pub fn log_shutdown() {
    tracing::info!("{APP_NAME} stopped");
}
