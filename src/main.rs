use anyhow::{Context, Result};
use axum::{ServiceExt, body::Body, http::Request};
use simple_storage::{config, routes, services::storage_service::StorageService};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting simple-storage with config: {:?}", cfg);

    // --- Open storage root and Bucket Catalog ---
    let storage = StorageService::open(cfg.storage_dir.clone())
        .await
        .with_context(|| format!("opening storage root {}", cfg.storage_dir.display()))?;
    tracing::info!("Serving buckets from {}", cfg.storage_dir.display());

    // --- Build router ---
    let app = routes::routes::app(storage);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        ServiceExt::<Request<Body>>::into_make_service(app),
    )
    .await?;

    Ok(())
}
