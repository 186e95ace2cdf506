use std::sync::Arc;

use marketsync_ingest::RunnerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marketsync_observability::init();

    let services = Arc::new(marketsync_api::app::services::build_services());
    let runner_handle = services.runner.clone().spawn(RunnerConfig::default())?;

    let app = marketsync_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    runner_handle.shutdown();
    Ok(())
}
