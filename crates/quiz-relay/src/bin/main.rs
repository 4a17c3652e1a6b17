use quiz_relay::config::Config;
use quiz_relay::error::RelayError;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quiz_relay=debug")),
        )
        .init();

    info!("Quiz leaderboard relay v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let addr = config.server.listen_addr();
    info!("Loaded configuration");
    info!("  Broadcast every {:?}, top {}", config.leaderboard.broadcast_interval(), config.leaderboard.top_k);
    info!(
        "  Inactive players evicted after {:?} (checked every {:?})",
        config.retention.player_ttl(),
        config.retention.sweep_interval()
    );

    let (app, state, tasks) = quiz_relay::build_app(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(quiz_relay::wait_for_shutdown(tokio::signal::ctrl_c()))
        .await?;

    tasks.shutdown();
    info!(players = state.registry.len(), "Relay stopped");
    Ok(())
}
