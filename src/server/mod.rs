//! HTTP boundary of the retrieval service.
//!
//! One [`RetrievalPipeline`] is built at startup and shared with every
//! handler through [`AppState`]. Shutdown is coordinated with a
//! `CancellationToken` that Ctrl-C (or the caller) cancels.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{
    AddDocumentsResponse, AppState, HealthResponse, SearchRequest, SearchResponse, router,
};

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;
use crate::retrieval::RetrievalPipeline;

/// Builds the store from `settings` and serves it on `bind` until Ctrl-C.
pub async fn serve_http(settings: Settings, bind: String) -> anyhow::Result<()> {
    let pipeline = Arc::new(
        RetrievalPipeline::from_settings(&settings).context("Failed to initialize vector store")?,
    );
    let described = pipeline.describe();
    info!(
        dimension = described.dimension,
        documents = described.total_documents,
        journaled = pipeline.is_journaled(),
        "Vector store ready"
    );

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
                }
                signal_ct.cancel();
            }
            _ = signal_ct.cancelled() => {}
        }
    });

    serve_until(listener, pipeline, &settings, ct).await
}

/// Serves on an already bound listener until `ct` is cancelled.
pub async fn serve_until(
    listener: TcpListener,
    pipeline: Arc<RetrievalPipeline>,
    settings: &Settings,
    ct: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(
        AppState::new(pipeline, settings.search.clone()),
        &settings.server,
    );

    let addr = listener.local_addr()?;
    info!(%addr, "Retriever listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .context("HTTP server error")?;

    info!("HTTP server shut down gracefully");
    Ok(())
}
