use std::sync::Arc;

use anyhow::Context;
use common::storage::build_object_store;
use server::config::AppConfig;
use server::planner::HttpTaskPlanner;
use server::state::AppState;
use server::{build_router, database, reconcile, seed};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db).await?;
    seed::seed_bootstrap_admin(&db, config.auth.bootstrap_admin.as_ref())
        .await
        .context("Failed to seed bootstrap admin")?;

    let storage = build_object_store(&config.storage).context("Failed to set up object storage")?;
    let planner = HttpTaskPlanner::new(&config.ai).context("Failed to set up task planner")?;
    info!(
        strategy = ?config.grading.final_grade_strategy,
        bucket = %config.storage.bucket,
        "Services ready"
    );

    let reconciler = reconcile::spawn_upload_reconciler(
        db.clone(),
        Arc::clone(&storage),
        config.reconcile.clone(),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        storage,
        planner: Arc::new(planner),
    };
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = reconciler {
        handle.abort();
    }
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
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
}
