// Scheduler engine implementation
//
// The ticking coordinator. A spawned loop polls the registry for due
// entries once per tick and dispatches each body into its own task; the
// loop itself never waits on a body. Entry advancement happens on body
// completion, through the registry's serialized mutation path.

use crate::errors::SchedulerError;
use crate::executor::JobRunner;
use crate::listener::{JobListener, ListenerSet};
use crate::models::{
    EngineState, FireContext, JobDefinition, JobKey, JobOutcome, JobRequest, StatusSummary,
};
use crate::registry::JobRegistry;
use crate::status;
use crate::telemetry;
use crate::tracker::ExecutionTracker;
use crate::trigger::{self, CronTrigger, SimpleTrigger, TriggerSpec};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the scheduler engine
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the tick loop polls for due entries
    pub tick_interval: Duration,
    /// Fixed IANA zone every trigger is evaluated in
    pub timezone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            timezone: chrono_tz::Asia::Seoul,
        }
    }
}

/// The scheduling engine. Owned by the process composition root and handed
/// by reference to whatever request layer sits in front of it.
pub struct SchedulerEngine {
    config: SchedulerConfig,
    registry: Arc<JobRegistry>,
    tracker: Arc<ExecutionTracker>,
    listeners: Arc<ListenerSet>,
    default_runner: Arc<dyn JobRunner>,
    state: Mutex<EngineState>,
    shutdown_tx: broadcast::Sender<()>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerEngine {
    /// Create a new engine. `default_runner` is the unit of work attached to
    /// jobs created through [`create_job`](Self::create_job).
    pub fn new(config: SchedulerConfig, default_runner: Arc<dyn JobRunner>) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            tracker: Arc::new(ExecutionTracker::new()),
            listeners: Arc::new(ListenerSet::new()),
            default_runner,
            state: Mutex::new(EngineState::Stopped),
            shutdown_tx,
            loop_handle: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    pub async fn state(&self) -> EngineState {
        *self.state.lock().await
    }

    /// Register a lifecycle listener. Listeners run in registration order at
    /// both lifecycle points.
    pub async fn add_listener(&self, listener: Arc<dyn JobListener>) {
        self.listeners.add(listener).await;
    }

    /// Start the tick loop. A no-op when already running; rejected once shut
    /// down.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        match *state {
            EngineState::Running => {
                debug!("Scheduler already running");
                return Ok(());
            }
            EngineState::ShutDown => return Err(SchedulerError::ShutDown),
            EngineState::Stopped => {}
        }
        *state = EngineState::Running;

        let registry = Arc::clone(&self.registry);
        let tracker = Arc::clone(&self.tracker);
        let listeners = Arc::clone(&self.listeners);
        let tick_interval = self.config.tick_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(tick_interval_ms = tick_interval.as_millis() as u64, "Tick loop started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let dispatched =
                            dispatch_due_jobs(&registry, &tracker, &listeners, Utc::now()).await;
                        if dispatched > 0 {
                            debug!(dispatched, "Dispatched due jobs");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Shutdown signal received, stopping tick loop");
                        break;
                    }
                }
            }
        });
        *self.loop_handle.lock().await = Some(handle);

        info!("Scheduler started");
        Ok(())
    }

    /// Stop the tick loop. Idempotent; in-flight job bodies are left to
    /// finish asynchronously.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock().await;
            if *state == EngineState::ShutDown {
                debug!("Scheduler already shut down");
                return;
            }
            *state = EngineState::ShutDown;
        }

        // No receiver when the loop never started; nothing to signal then.
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Tick loop task failed");
            }
        }
        info!("Scheduler shut down");
    }

    /// Remove every schedule entry. Permitted while running or stopped; the
    /// run state is unchanged.
    pub async fn clear(&self) -> Result<(), SchedulerError> {
        self.ensure_not_shut_down().await?;
        self.registry.clear().await;
        Ok(())
    }

    /// Create a job from a boundary request, attaching the engine's default
    /// runner. The trigger kind follows the request: a cron expression makes
    /// a cron trigger, otherwise a simple one.
    #[instrument(skip(self, request), fields(job_key = %request.job_key()))]
    pub async fn create_job(&self, request: &JobRequest) -> Result<(), SchedulerError> {
        self.ensure_not_shut_down().await?;
        let now = Utc::now();
        let spec = self.build_trigger(request, now)?;
        let definition =
            JobDefinition::new(request.job_key(), Arc::clone(&self.default_runner));
        self.registry.create(definition, spec, now).await
    }

    /// Register a durable definition with no trigger.
    pub async fn add_job(&self, definition: JobDefinition) -> Result<(), SchedulerError> {
        self.ensure_not_shut_down().await?;
        self.registry.add_job(definition).await
    }

    #[instrument(skip(self))]
    pub async fn delete_job(&self, name: &str, group: &str) -> Result<(), SchedulerError> {
        self.ensure_not_shut_down().await?;
        self.registry.delete(&JobKey::new(name, group)).await
    }

    /// Aggregate status over every registered job.
    pub async fn status(&self) -> StatusSummary {
        let entries = self.registry.list().await;
        let running = self.tracker.running_keys().await;
        status::summarize(&entries, &running)
    }

    /// Run one tick's worth of dispatching against the given instant.
    /// Returns the number of job bodies dispatched.
    pub async fn process_due_jobs(&self, now: DateTime<Utc>) -> usize {
        dispatch_due_jobs(&self.registry, &self.tracker, &self.listeners, now).await
    }

    fn build_trigger(
        &self,
        request: &JobRequest,
        now: DateTime<Utc>,
    ) -> Result<TriggerSpec, SchedulerError> {
        if request.is_simple() {
            let start_local = request
                .start_at
                .ok_or(crate::errors::TriggerError::MissingStartTime)?;
            let start_at = trigger::local_to_utc(start_local, self.config.timezone)?;
            let simple = SimpleTrigger::new(
                start_at,
                request.repeat_interval_seconds.unwrap_or(0),
                request.repeat_count,
            )?;
            Ok(TriggerSpec::Simple(simple))
        } else {
            let expression = request.cron_expression.as_deref().unwrap_or_default();
            let cron = CronTrigger::new(expression, self.config.timezone, now)?;
            Ok(TriggerSpec::Cron(cron))
        }
    }

    async fn ensure_not_shut_down(&self) -> Result<(), SchedulerError> {
        if *self.state.lock().await == EngineState::ShutDown {
            return Err(SchedulerError::ShutDown);
        }
        Ok(())
    }
}

/// One tick: dispatch every due entry whose key is not already running.
///
/// Per entry: mark running, fire before-hooks, spawn the body. The
/// completion path fires after-hooks, advances the entry, and releases the
/// tracker record — on success, failure, and panic alike.
async fn dispatch_due_jobs(
    registry: &Arc<JobRegistry>,
    tracker: &Arc<ExecutionTracker>,
    listeners: &Arc<ListenerSet>,
    now: DateTime<Utc>,
) -> usize {
    let due = registry.due_entries(now).await;
    let mut dispatched = 0;

    for entry in due {
        let key = entry.key().clone();
        let Some(scheduled_fire_time) = entry.next_fire_time else {
            continue;
        };

        let Some(record) = tracker.mark_running(&key, now).await else {
            // Previous fire still executing: drop this one and let the
            // trigger pick up again at a later tick.
            warn!(job_key = %key, "Job still running, skipping overlapping fire");
            telemetry::record_job_skipped(&key);
            continue;
        };
        telemetry::update_running_jobs(tracker.running_count().await);

        let ctx = FireContext {
            execution_id: record.id,
            key: key.clone(),
            scheduled_fire_time,
        };
        listeners.notify_before(&ctx).await;
        telemetry::record_job_dispatched(&key);
        dispatched += 1;

        let runner = Arc::clone(&entry.definition.runner);
        let registry = Arc::clone(registry);
        let tracker = Arc::clone(tracker);
        let listeners = Arc::clone(listeners);
        let fired_at = now;

        tokio::spawn(async move {
            // The body gets its own task so a panic inside it still reaches
            // the completion path below as a failed outcome.
            let body = tokio::spawn({
                let runner = Arc::clone(&runner);
                let ctx = ctx.clone();
                async move { runner.run(&ctx).await }
            });
            let outcome = match body.await {
                Ok(Ok(())) => JobOutcome::Success,
                Ok(Err(e)) => JobOutcome::Failed {
                    error: format!("{:#}", e),
                },
                Err(e) => JobOutcome::Failed {
                    error: format!("job body panicked: {e}"),
                },
            };

            listeners.notify_after(&ctx, &outcome).await;

            // The entry must move past its consumed fire time before the key
            // is released; releasing first lets a tick re-dispatch the same
            // slot.
            registry.advance(&ctx.key, fired_at).await;
            if let Some(record) = tracker.mark_idle(&ctx.key).await {
                let elapsed = (Utc::now() - record.started_at).num_milliseconds();
                telemetry::record_job_duration(&ctx.key, elapsed as f64 / 1000.0);
            }
            telemetry::update_running_jobs(tracker.running_count().await);

            match &outcome {
                JobOutcome::Success => telemetry::record_job_success(&ctx.key),
                JobOutcome::Failed { error } => {
                    error!(job_key = %ctx.key, error = %error, "Job body failed");
                    telemetry::record_job_failure(&ctx.key);
                }
            }
        });
    }

    dispatched
}
