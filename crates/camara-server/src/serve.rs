use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use camara_api::state::AppStateInner;
use camara_api::{tablet_router, web_router};
use camara_db::Database;
use camara_gateway::relay::HttpRelay;
use camara_gateway::{Gateway, HubKind};

use crate::config::Config;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camara=debug,tower_http=debug".into()),
        )
        .init();
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let db = Arc::new(Database::open(&config.db_path)?);
    let relay = Arc::new(HttpRelay::new(&config.peer_url, config.relay_timeout)?);
    info!("relaying to {}", relay.base_url());

    let gateway = Gateway::new(config.hub, db.clone(), relay, config.jwt_secret);
    let state = AppStateInner::new(db, gateway);

    let app = match config.hub {
        HubKind::Public => web_router(state),
        HubKind::Tablet => tablet_router(state),
    }
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http());

    info!("{} listening on {}", config.hub.service_name(), config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
