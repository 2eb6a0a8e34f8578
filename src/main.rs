use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_proxy::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.openweather_api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set; weather requests will fail with 500");
    }
    let bind_address = config.bind_address();

    let state = AppState::from_config(config)?;
    tracing::info!(
        "Cache backend: {} (ttl {}s), rate limiting {}",
        state.cache.backend(),
        state.cache.ttl().as_secs(),
        if state.rate_limiter.is_some() { "enabled" } else { "disabled" }
    );

    if let Some(limiter) = state.rate_limiter.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window().max(Duration::from_secs(1)));
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = limiter.purge_idle();
                if removed > 0 {
                    tracing::debug!(
                        "Purged {} idle rate-limit windows, {} remain",
                        removed,
                        limiter.tracked_clients()
                    );
                }
            }
        });
    }

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server starting on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Err(e) = state.cache.clear().await {
        tracing::warn!("Failed to clear cache on shutdown: {}", e);
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
