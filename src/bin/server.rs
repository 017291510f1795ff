use std::sync::Arc;

use miette::IntoDiagnostic;

use threadloom::config::Settings;
use threadloom::orchestrator::Orchestrator;
use threadloom::{http, telemetry, workflows};

#[tokio::main]
async fn main() -> miette::Result<()> {
    telemetry::init();

    let settings = Settings::from_env();
    let checkpointer = settings.create_checkpointer().await;

    let orchestrator = Orchestrator::new().register(workflows::sample::build(checkpointer)?);

    let router = http::router(Arc::new(orchestrator));
    http::serve(router, settings.port).await.into_diagnostic()?;
    Ok(())
}
