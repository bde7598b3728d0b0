use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use chunk_analyst::application::services::{AnalysisService, AnalysisWorker};
use chunk_analyst::infrastructure::llm::HttpLlmClientFactory;
use chunk_analyst::infrastructure::observability::{TracingConfig, init_tracing};
use chunk_analyst::infrastructure::persistence::{
    PgChunkSource, PgJobRepository, create_pool, run_migrations,
};
use chunk_analyst::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(
        &TracingConfig {
            environment: environment.to_string(),
            json_format: settings.logging.enable_json,
            level: settings.logging.level.clone(),
        },
        settings.server.port,
    );

    let pool = create_pool(&settings.database.url, settings.database.max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if settings.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let llm_factory = HttpLlmClientFactory::new(settings.llm.request_timeout())
        .context("Failed to build HTTP client")?;

    let analysis_service = Arc::new(AnalysisService::new(
        Arc::new(PgJobRepository::new(pool.clone())),
        Arc::new(PgChunkSource::new(pool)),
        Arc::new(llm_factory),
        settings.retry.policy(),
    ));

    let (analysis_sender, analysis_receiver) = mpsc::channel(settings.analysis.queue_capacity);
    let worker = AnalysisWorker::new(analysis_receiver, Arc::clone(&analysis_service));
    let worker_handle = tokio::spawn(worker.run());

    let state = AppState {
        analysis_service,
        analysis_sender,
        analysis_defaults: settings.analysis.clone(),
    };
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!(%addr, "Listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last sender; the worker finishes in-flight runs and exits.
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Analysis worker terminated abnormally");
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
