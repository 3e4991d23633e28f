use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the default Quantflow Tracing subscriber.
///
/// Filters via the `RUST_LOG` environment variable, falling back to `info`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(cfg!(debug_assertions)))
        .init()
}
