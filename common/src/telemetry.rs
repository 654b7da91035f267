// Telemetry: structured logging and Prometheus metrics

use crate::models::JobKey;
use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting. Log levels come from
/// `RUST_LOG` when set, otherwise from configuration.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level = log_level, "Structured logging initialized");
    Ok(())
}

/// Install the Prometheus exporter and register the scheduler's metrics.
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!("job_dispatched_total", "Total number of job fires dispatched");
    describe_counter!("job_success_total", "Total number of successful job runs");
    describe_counter!("job_failed_total", "Total number of failed job runs");
    describe_counter!(
        "job_skipped_total",
        "Fires dropped because the job was still running"
    );
    describe_histogram!("job_duration_seconds", "Duration of job runs in seconds");
    describe_gauge!("jobs_running", "Number of job bodies currently executing");

    tracing::info!(metrics_port = metrics_port, "Prometheus metrics exporter initialized");
    Ok(())
}

#[inline]
pub fn record_job_dispatched(key: &JobKey) {
    counter!(
        "job_dispatched_total",
        "job_name" => key.name.clone(),
        "job_group" => key.group.clone()
    )
    .increment(1);
}

#[inline]
pub fn record_job_success(key: &JobKey) {
    counter!(
        "job_success_total",
        "job_name" => key.name.clone(),
        "job_group" => key.group.clone()
    )
    .increment(1);
}

#[inline]
pub fn record_job_failure(key: &JobKey) {
    counter!(
        "job_failed_total",
        "job_name" => key.name.clone(),
        "job_group" => key.group.clone()
    )
    .increment(1);
}

#[inline]
pub fn record_job_skipped(key: &JobKey) {
    counter!(
        "job_skipped_total",
        "job_name" => key.name.clone(),
        "job_group" => key.group.clone()
    )
    .increment(1);
}

#[inline]
pub fn record_job_duration(key: &JobKey, duration_seconds: f64) {
    histogram!(
        "job_duration_seconds",
        "job_name" => key.name.clone(),
        "job_group" => key.group.clone()
    )
    .record(duration_seconds);
}

#[inline]
pub fn update_running_jobs(count: usize) {
    gauge!("jobs_running").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_does_not_panic() {
        let key = JobKey::new("metrics", "test");
        record_job_dispatched(&key);
        record_job_success(&key);
        record_job_failure(&key);
        record_job_skipped(&key);
        record_job_duration(&key, 1.5);
        update_running_jobs(3);
    }

    #[test]
    fn test_init_logging_with_valid_level() {
        // May already be initialized by another test in the same process.
        let result = init_logging("info");
        assert!(result.is_ok() || result.is_err());
    }
}
