// Demo batch pipeline executed as the scheduled unit of work
//
// A directed sequence of named steps sharing one execution context and
// ending in a terminal status. The scheduling core only ever sees the
// pipeline through the JobRunner trait; nothing in here leaks back into it.

use async_trait::async_trait;
use common::executor::JobRunner;
use common::models::FireContext;
use std::collections::HashMap;
use tracing::{error, info};

/// Mutable context shared by every step of one pipeline run.
#[derive(Default)]
pub struct StepContext {
    values: HashMap<String, String>,
}

impl StepContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Failed,
}

/// A single named unit within a pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &mut StepContext) -> anyhow::Result<()>;
}

/// Ordered sequence of steps. The first failing step ends the run.
pub struct Pipeline {
    name: String,
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub async fn execute(&self, run_id: &str) -> BatchStatus {
        let mut ctx = StepContext::new();
        ctx.set("run_id", run_id);

        info!(pipeline = %self.name, run_id, "Pipeline starting");
        for step in &self.steps {
            info!(pipeline = %self.name, step = step.name(), "Step starting");
            if let Err(e) = step.execute(&mut ctx).await {
                error!(
                    pipeline = %self.name,
                    step = step.name(),
                    error = %e,
                    "Step failed"
                );
                return BatchStatus::Failed;
            }
            info!(pipeline = %self.name, step = step.name(), "Step finished");
        }
        info!(pipeline = %self.name, run_id, "Pipeline finished");
        BatchStatus::Completed
    }
}

#[async_trait]
impl JobRunner for Pipeline {
    async fn run(&self, ctx: &FireContext) -> anyhow::Result<()> {
        match self.execute(&ctx.execution_id.to_string()).await {
            BatchStatus::Completed => Ok(()),
            BatchStatus::Failed => Err(anyhow::anyhow!("pipeline '{}' failed", self.name)),
        }
    }
}

/// Step that only writes a log line. Stands in for real work in the sample
/// pipeline.
pub struct LogStep {
    name: String,
}

impl LogStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step for LogStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut StepContext) -> anyhow::Result<()> {
        info!(
            step = %self.name,
            run_id = ctx.get("run_id").unwrap_or(""),
            "Executing tasklet"
        );
        Ok(())
    }
}
