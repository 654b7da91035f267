// Error types for trigger construction, registry mutation, and listener hooks

use crate::models::JobKey;
use thiserror::Error;

/// Trigger construction and fire-time calculation errors
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Cron expression '{expression}' has no future fire time")]
    NoFutureFireTime { expression: String },

    #[error("Repeat interval must be positive when repeat count is {repeat_count}")]
    InvalidRepeatInterval { repeat_count: u32 },

    #[error("Simple trigger requires a start time")]
    MissingStartTime,

    #[error("Start time {start_at} does not exist in time zone {timezone}")]
    UnrepresentableStartTime { start_at: String, timezone: String },
}

/// Scheduling engine errors surfaced to the calling boundary
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Job already exists: {0}")]
    DuplicateJob(JobKey),

    #[error("Job not found: {0}")]
    JobNotFound(JobKey),

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(#[from] TriggerError),

    #[error("Scheduler is shut down")]
    ShutDown,
}

/// A listener hook failure. Logged by the engine and never propagated to the
/// caller of create/delete/status.
#[derive(Error, Debug)]
#[error("Listener '{listener}' failed in {phase} hook: {reason}")]
pub struct ListenerError {
    pub listener: String,
    pub phase: ListenerPhase,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    BeforeJob,
    AfterJob,
}

impl std::fmt::Display for ListenerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerPhase::BeforeJob => write!(f, "before_job"),
            ListenerPhase::AfterJob => write!(f, "after_job"),
        }
    }
}
