//! missionflow-server
//!
//! Variables de entorno:
//!   MISSIONFLOW_BIND_ADDR: dirección de escucha (default: 0.0.0.0:5000)
//!   DATABASE_URL         : Postgres; sin ella se usa un store en memoria
//!   DATABASE_MIN_CONNECTIONS / DATABASE_MAX_CONNECTIONS: tamaño del pool
//!   RUST_LOG             : filtro de logs (default: info,missionflow=debug)

use missionflow::{build_router, AppConfig, CoreError};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                                                  "info,missionflow=debug,mission_core=debug,mission_persistence=debug".into()
                                              }))
                             .init();

    let config = AppConfig::from_env()?;
    let state = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || config.build_state()).await
                                                                 .map_err(|e| CoreError::Internal(format!("startup: {e}")))??
    };

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr,
                   persistent = config.database.is_some(),
                   "missionflow listening");

    axum::serve(listener, build_router(state)).with_graceful_shutdown(shutdown_signal())
                                              .await?;
    tracing::info!("missionflow stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
