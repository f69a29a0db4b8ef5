use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use carpool_engine::api;
use carpool_engine::config::Config;
use carpool_engine::error::AppError;
use carpool_engine::rewards::{RandomSource, SeededRandom, SystemRandom};
use carpool_engine::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let random: Arc<dyn RandomSource> = match config.rng_seed {
        Some(seed) => {
            tracing::info!(seed, "using seeded random source");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(SystemRandom),
    };

    let shared_state = Arc::new(AppState::new(
        config.matching.clone(),
        config.rewards.clone(),
        random,
        config.event_buffer_size,
    ));

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
