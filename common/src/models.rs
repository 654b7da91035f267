use crate::executor::JobRunner;
use crate::trigger::TriggerSpec;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Job identity
// ============================================================================

/// Unique identity of a schedulable job: a (name, group) pair compared by
/// value. Ordered by group then name so ordered collections iterate
/// deterministically, grouped by group name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub name: String,
    pub group: String,
}

impl JobKey {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }
}

impl Ord for JobKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group
            .cmp(&other.group)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for JobKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

// ============================================================================
// Boundary payloads
// ============================================================================

/// Job creation payload as a thin request layer would submit it. A request
/// without a cron expression describes a simple (one-shot/interval) trigger;
/// `start_at` is a wall-clock time interpreted in the engine's configured
/// time zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_name: String,
    pub job_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

impl JobRequest {
    pub fn is_simple(&self) -> bool {
        self.cron_expression.is_none()
    }

    pub fn job_key(&self) -> JobKey {
        JobKey::new(self.job_name.clone(), self.job_group.clone())
    }
}

// ============================================================================
// Registry entries
// ============================================================================

/// A job definition: its key plus the opaque unit of work the engine invokes
/// when a trigger fires.
#[derive(Clone)]
pub struct JobDefinition {
    pub key: JobKey,
    pub runner: Arc<dyn JobRunner>,
}

impl JobDefinition {
    pub fn new(key: JobKey, runner: Arc<dyn JobRunner>) -> Self {
        Self { key, runner }
    }
}

impl fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDefinition")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of an entry's trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerState {
    Normal,
    Paused,
    Complete,
    Error,
    Blocked,
}

impl TriggerState {
    /// Status string reported for a non-running job. A normally scheduled
    /// trigger reads "SCHEDULED"; every other state passes through as its
    /// upper-cased name.
    pub fn status_label(&self) -> &'static str {
        match self {
            TriggerState::Normal => "SCHEDULED",
            TriggerState::Paused => "PAUSED",
            TriggerState::Complete => "COMPLETE",
            TriggerState::Error => "ERROR",
            TriggerState::Blocked => "BLOCKED",
        }
    }
}

/// The registry's unit of storage: a definition, its trigger (a durable job
/// may have none), and the mutable fire bookkeeping. Owned exclusively by
/// the registry; everything handed out is a snapshot.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub definition: JobDefinition,
    pub trigger: Option<TriggerSpec>,
    pub trigger_state: TriggerState,
    pub last_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    pub fn key(&self) -> &JobKey {
        &self.definition.key
    }
}

// ============================================================================
// Execution state
// ============================================================================

/// Transient record of a job body in flight. Created at dispatch, destroyed
/// at completion regardless of outcome.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub key: JobKey,
    pub started_at: DateTime<Utc>,
}

/// What the engine hands to listener hooks: the fire event's identity and
/// trigger metadata.
#[derive(Debug, Clone)]
pub struct FireContext {
    pub execution_id: Uuid,
    pub key: JobKey,
    pub scheduled_fire_time: DateTime<Utc>,
}

/// Terminal result of one job body run, delivered to after-hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed { error: String },
}

/// Engine run state. `ShutDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    ShutDown,
}

// ============================================================================
// Status reporting
// ============================================================================

/// Aggregate view over every registered job. Computed on demand, never
/// stored.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub num_of_all_jobs: usize,
    pub num_of_running_jobs: usize,
    pub num_of_groups: usize,
    pub jobs: Vec<JobStatusView>,
}

/// Per-job slice of a status summary. Time fields are absent for jobs with
/// no attached trigger.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub job_name: String,
    pub group_name: String,
    pub job_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fired_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_time: Option<DateTime<Utc>>,
}
