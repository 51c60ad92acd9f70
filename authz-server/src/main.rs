use authz_server::{
    build_router,
    config::ServerConfig,
    db,
    services::{NoopCacheUpdater, UpdateTimer},
    store::PgCredentialStore,
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::oneshot};

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = ServerConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authorization server"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;

    let store = Arc::new(PgCredentialStore::new(pool));
    let state = AppState::new(config.clone(), store)?;

    let timer = Arc::new(UpdateTimer::new(
        config.cache.refresh_interval(),
        Arc::new(NoopCacheUpdater),
    ));
    let (timer_exit_tx, timer_exit_rx) = oneshot::channel::<i32>();
    let timer_task = tokio::spawn({
        let timer = timer.clone();
        async move { timer.start(timer_exit_rx).await }
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The receiver may already be gone if the timer was stopped.
    let _ = timer_exit_tx.send(0);
    timer.stop();
    match timer_task.await {
        Ok(code) => tracing::info!(code, "Cache update timer finished"),
        Err(e) => tracing::warn!(error = %e, "Cache update timer task failed"),
    }

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
