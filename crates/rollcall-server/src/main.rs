mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use rollcall_api::{AppState, AppStateInner};
use rollcall_store::Store;
use rollcall_store::migrations::seed_admin;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall=debug,rollcall_api=debug,rollcall_store=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init data store
    let store = Store::open(&config.data_dir)?;
    if let Some(seed) = &config.admin_seed {
        seed_admin(&store, seed)?;
    }

    let state: AppState = Arc::new(AppStateInner::new(
        store,
        config.jwt_secret.clone(),
        chrono::Duration::hours(config.token_ttl_hours),
    ));

    // Static pages served alongside the API
    let static_dir = &config.static_dir;
    let pages = Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/admin", ServeFile::new(static_dir.join("adminSide").join("indexAdmin.html")))
        .route_service(
            "/dashboard",
            ServeFile::new(static_dir.join("clientSide").join("studentDashboard.html")),
        )
        .nest_service("/clientSide", ServeDir::new(static_dir.join("clientSide")))
        .nest_service("/adminSide", ServeDir::new(static_dir.join("adminSide")));

    let app = Router::new()
        .merge(rollcall_api::router(state))
        .merge(pages)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Rollcall server listening on http://{}", addr);
    info!("Data directory: {}", config.data_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
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
