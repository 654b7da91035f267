// Scheduler binary entry point
//
// Composition root: loads configuration, wires the engine with the demo
// batch pipeline and the logging listener, and keeps a handle to the engine
// for whatever request layer sits in front of this process.

mod batch;

use batch::{LogStep, Pipeline};
use common::config::Settings;
use common::listener::LoggingJobListener;
use common::models::JobRequest;
use common::scheduler::SchedulerEngine;
use common::telemetry;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    settings.validate().map_err(|e| anyhow::anyhow!(e))?;

    telemetry::init_logging(&settings.observability.log_level)?;
    telemetry::init_metrics(settings.observability.metrics_port)?;

    info!(
        tick_interval_seconds = settings.scheduler.tick_interval_seconds,
        timezone = %settings.scheduler.timezone,
        "Configuration loaded"
    );

    let pipeline = Arc::new(Pipeline::new(
        "sample-batch",
        vec![Box::new(LogStep::new("sample-step"))],
    ));
    let engine = Arc::new(SchedulerEngine::new(
        settings.scheduler.engine_config(),
        pipeline,
    ));
    engine.add_listener(Arc::new(LoggingJobListener)).await;

    engine.start().await?;
    info!("Scheduler engine started");

    // A sample recurring job so a bare start has something to fire.
    let sample = JobRequest {
        job_name: "sample".to_string(),
        job_group: "default".to_string(),
        start_at: None,
        repeat_interval_seconds: None,
        repeat_count: None,
        cron_expression: Some("*/10 * * * * *".to_string()),
    };
    if let Err(e) = engine.create_job(&sample).await {
        error!(error = %e, "Failed to register sample job");
    }

    info!("Scheduler running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating graceful shutdown");
    engine.shutdown().await;

    info!("Scheduler stopped");
    Ok(())
}
