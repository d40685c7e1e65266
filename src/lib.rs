pub mod agent_engine;
pub mod assistant;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod executor;
pub mod intent;
pub mod perception;
pub mod planner;

/// Load `.env` and install the global `tracing` subscriber.
///
/// `RUST_LOG` controls the filter, defaulting to `info`. Safe to call twice.
pub fn init_tracing() {
    // Load .env first so RUST_LOG set there takes effect; missing file is fine.
    let _ = dotenvy::dotenv();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
