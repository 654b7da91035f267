// Execution tracking
//
// One transient record per job key while its body runs. The engine pairs
// every mark_running with a mark_idle on all completion paths, so a record
// can never outlive its run.

use crate::models::{ExecutionRecord, JobKey};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct ExecutionTracker {
    running: Mutex<HashMap<JobKey, ExecutionRecord>>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a run. Returns `None` when the key already has a
    /// record — at most one concurrent run per key.
    pub async fn mark_running(
        &self,
        key: &JobKey,
        now: DateTime<Utc>,
    ) -> Option<ExecutionRecord> {
        let mut running = self.running.lock().await;
        if running.contains_key(key) {
            return None;
        }
        let record = ExecutionRecord {
            id: Uuid::new_v4(),
            key: key.clone(),
            started_at: now,
        };
        running.insert(key.clone(), record.clone());
        Some(record)
    }

    /// Destroy the key's record, returning it for duration bookkeeping.
    pub async fn mark_idle(&self, key: &JobKey) -> Option<ExecutionRecord> {
        self.running.lock().await.remove(key)
    }

    pub async fn is_running(&self, key: &JobKey) -> bool {
        self.running.lock().await.contains_key(key)
    }

    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Snapshot of every currently running key.
    pub async fn running_keys(&self) -> HashSet<JobKey> {
        self.running.lock().await.keys().cloned().collect()
    }
}
