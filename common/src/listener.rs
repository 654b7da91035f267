// Job lifecycle listeners
//
// Listeners observe the two lifecycle points around every fire: before the
// body is dispatched and after it completes. The engine invokes them
// synchronously in registration order; a failing hook is logged and never
// aborts the tick loop or the dispatch.

use crate::errors::{ListenerError, ListenerPhase};
use crate::models::{FireContext, JobOutcome};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Observer of job lifecycle events.
#[async_trait]
pub trait JobListener: Send + Sync {
    fn name(&self) -> &str;

    async fn before_job(&self, _ctx: &FireContext) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn after_job(
        &self,
        _ctx: &FireContext,
        _outcome: &JobOutcome,
    ) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Ordered collection of registered listeners.
#[derive(Default)]
pub struct ListenerSet {
    listeners: tokio::sync::RwLock<Vec<Arc<dyn JobListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, listener: Arc<dyn JobListener>) {
        self.listeners.write().await.push(listener);
    }

    pub async fn notify_before(&self, ctx: &FireContext) {
        for listener in self.snapshot().await {
            if let Err(e) = listener.before_job(ctx).await {
                warn!(
                    listener = listener.name(),
                    job_key = %ctx.key,
                    phase = %ListenerPhase::BeforeJob,
                    error = %e,
                    "Listener hook failed"
                );
            }
        }
    }

    pub async fn notify_after(&self, ctx: &FireContext, outcome: &JobOutcome) {
        for listener in self.snapshot().await {
            if let Err(e) = listener.after_job(ctx, outcome).await {
                warn!(
                    listener = listener.name(),
                    job_key = %ctx.key,
                    phase = %ListenerPhase::AfterJob,
                    error = %e,
                    "Listener hook failed"
                );
            }
        }
    }

    async fn snapshot(&self) -> Vec<Arc<dyn JobListener>> {
        self.listeners.read().await.clone()
    }
}

/// Default listener: logs the fire lifecycle the same way for every job.
pub struct LoggingJobListener;

#[async_trait]
impl JobListener for LoggingJobListener {
    fn name(&self) -> &str {
        "logging"
    }

    async fn before_job(&self, ctx: &FireContext) -> Result<(), ListenerError> {
        info!(
            job_key = %ctx.key,
            execution_id = %ctx.execution_id,
            scheduled_fire_time = %ctx.scheduled_fire_time,
            "Job starting"
        );
        Ok(())
    }

    async fn after_job(
        &self,
        ctx: &FireContext,
        outcome: &JobOutcome,
    ) -> Result<(), ListenerError> {
        match outcome {
            JobOutcome::Success => {
                info!(
                    job_key = %ctx.key,
                    execution_id = %ctx.execution_id,
                    finished_at = %Utc::now(),
                    "Job finished"
                );
            }
            JobOutcome::Failed { error: reason } => {
                error!(
                    job_key = %ctx.key,
                    execution_id = %ctx.execution_id,
                    error = %reason,
                    "Job failed"
                );
            }
        }
        Ok(())
    }
}
