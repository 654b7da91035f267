// Job registry
//
// Owns the mapping from job key to schedule entry. Every mutation — create,
// delete, clear, and the tick loop's advance — goes through one mutex'd map,
// so a concurrent external request can never race an entry advance. Reads
// hand out snapshots; the map itself never escapes.

use crate::errors::SchedulerError;
use crate::models::{JobDefinition, JobKey, ScheduleEntry, TriggerState};
use crate::trigger::TriggerSpec;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct JobRegistry {
    entries: Mutex<BTreeMap<JobKey, ScheduleEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job with a trigger, armed with the trigger's first fire
    /// time. Fails when the key already has an active trigger; a durable
    /// entry without one gets the trigger attached instead.
    pub async fn create(
        &self,
        definition: JobDefinition,
        trigger: TriggerSpec,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(&definition.key) {
            if existing.trigger.is_some() {
                return Err(SchedulerError::DuplicateJob(definition.key.clone()));
            }
        }

        let key = definition.key.clone();
        let next_fire_time = trigger.first_fire_time(now);
        entries.insert(
            key.clone(),
            ScheduleEntry {
                definition,
                trigger: Some(trigger),
                trigger_state: TriggerState::Normal,
                last_fire_time: None,
                next_fire_time,
            },
        );
        debug!(job_key = %key, next_fire_time = ?next_fire_time, "Job registered");
        Ok(())
    }

    /// Register a durable definition with no trigger. It never fires but
    /// shows up in status reports.
    pub async fn add_job(&self, definition: JobDefinition) -> Result<(), SchedulerError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&definition.key) {
            return Err(SchedulerError::DuplicateJob(definition.key.clone()));
        }

        let key = definition.key.clone();
        entries.insert(
            key.clone(),
            ScheduleEntry {
                definition,
                trigger: None,
                trigger_state: TriggerState::Normal,
                last_fire_time: None,
                next_fire_time: None,
            },
        );
        debug!(job_key = %key, "Durable job registered without trigger");
        Ok(())
    }

    /// Remove a job. Other entries are untouched whether or not the key
    /// exists.
    pub async fn delete(&self, key: &JobKey) -> Result<(), SchedulerError> {
        let mut entries = self.entries.lock().await;
        match entries.remove(key) {
            Some(_) => {
                debug!(job_key = %key, "Job deleted");
                Ok(())
            }
            None => Err(SchedulerError::JobNotFound(key.clone())),
        }
    }

    /// Snapshot of every entry, ordered by group name then job name.
    pub async fn list(&self) -> Vec<ScheduleEntry> {
        self.entries.lock().await.values().cloned().collect()
    }

    /// Snapshots of entries whose next fire time has come due.
    pub async fn due_entries(&self, now: DateTime<Utc>) -> Vec<ScheduleEntry> {
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| matches!(entry.next_fire_time, Some(at) if at <= now))
            .cloned()
            .collect()
    }

    /// Record a completed fire and recompute the entry's next fire time.
    /// An exhausted trigger removes the entry; a key deleted mid-flight is a
    /// logged no-op. Returns the new next fire time, if any.
    pub async fn advance(&self, key: &JobKey, fired_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(key) else {
            debug!(job_key = %key, "Advance on unregistered job, ignoring");
            return None;
        };
        let Some(trigger) = entry.trigger.as_ref() else {
            return None;
        };

        entry.last_fire_time = Some(fired_at);
        match trigger.next_fire_time(fired_at) {
            Some(next) => {
                entry.next_fire_time = Some(next);
                Some(next)
            }
            None => {
                debug!(job_key = %key, "Trigger exhausted, removing job");
                entries.remove(key);
                None
            }
        }
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        debug!(removed, "Registry cleared");
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn contains(&self, key: &JobKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}
