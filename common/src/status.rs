// Status aggregation
//
// A pure function over registry and tracker snapshots. Nothing here is
// stored; the summary is recomputed on every request.

use crate::models::{JobKey, JobStatusView, ScheduleEntry, StatusSummary};
use std::collections::HashSet;

/// Compose registry and tracker snapshots into an aggregate status report.
///
/// Per-job resolution: a job with no attached trigger reports
/// "NONE TRIGGER." and carries no schedule or fire times; a running job
/// reports "RUNNING" regardless of its trigger state; otherwise the
/// trigger-state label applies.
pub fn summarize(entries: &[ScheduleEntry], running: &HashSet<JobKey>) -> StatusSummary {
    let mut jobs = Vec::with_capacity(entries.len());
    let mut num_of_running_jobs = 0;
    let mut groups: HashSet<&str> = HashSet::new();

    for entry in entries {
        let key = entry.key();
        groups.insert(key.group.as_str());

        let view = match &entry.trigger {
            None => JobStatusView {
                job_name: key.name.clone(),
                group_name: key.group.clone(),
                job_status: "NONE TRIGGER.".to_string(),
                schedule_time: None,
                last_fired_time: None,
                next_fire_time: None,
            },
            Some(trigger) => {
                let job_status = if running.contains(key) {
                    num_of_running_jobs += 1;
                    "RUNNING".to_string()
                } else {
                    entry.trigger_state.status_label().to_string()
                };
                JobStatusView {
                    job_name: key.name.clone(),
                    group_name: key.group.clone(),
                    job_status,
                    schedule_time: Some(trigger.start_time()),
                    last_fired_time: entry.last_fire_time,
                    next_fire_time: entry.next_fire_time,
                }
            }
        };
        jobs.push(view);
    }

    StatusSummary {
        num_of_all_jobs: entries.len(),
        num_of_running_jobs,
        num_of_groups: groups.len(),
        jobs,
    }
}
