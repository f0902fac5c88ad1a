use anyhow::Context;
use simjob_orchestrator::repository::InMemoryParameterStore;
use simjob_orchestrator::{OrchestratorConfig, api, build_orchestrators, registry};
use simjob_runner::ProcessSimulator;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simjob_orchestrator=debug,simjob_runner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SimJob Orchestrator...");

    let config = OrchestratorConfig::from_env().context("loading configuration")?;
    config.validate().context("invalid configuration")?;

    tracing::info!("Simulator: {}", config.runner.simulator_program);
    tracing::info!("Data root: {:?}", config.data_root);
    tracing::info!("Report root: {:?}", config.report_root);

    let entities = registry::load_entities(&config.routes_file)
        .with_context(|| format!("loading route registry {:?}", config.routes_file))?;
    if entities.is_empty() {
        tracing::warn!(
            "No entity types registered in {:?}, only /health is served",
            config.routes_file
        );
    }

    let orchestrators = build_orchestrators(
        &config,
        entities,
        Arc::new(InMemoryParameterStore::new()),
        Arc::new(ProcessSimulator::new(config.runner.clone())),
    );

    // Build router with all API endpoints
    let app = api::create_router(&orchestrators).context("mounting routes")?;

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
