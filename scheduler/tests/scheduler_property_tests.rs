// Property-based tests for engine configuration and job lifecycle

use async_trait::async_trait;
use chrono::Utc;
use common::executor::JobRunner;
use common::models::{FireContext, JobRequest};
use common::scheduler::{SchedulerConfig, SchedulerEngine};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct NoopRunner;

#[async_trait]
impl JobRunner for NoopRunner {
    async fn run(&self, _ctx: &FireContext) -> anyhow::Result<()> {
        Ok(())
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn engine() -> SchedulerEngine {
    SchedulerEngine::new(SchedulerConfig::default(), Arc::new(NoopRunner))
}

fn simple_request(name: &str, group: &str) -> JobRequest {
    JobRequest {
        job_name: name.to_string(),
        job_group: group.to_string(),
        start_at: Some(
            Utc::now()
                .with_timezone(&chrono_tz::Asia::Seoul)
                .naive_local(),
        ),
        repeat_interval_seconds: None,
        repeat_count: None,
        cron_expression: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// *For any* positive tick interval, the engine configuration holds it
    /// unchanged.
    #[test]
    fn property_config_preserves_tick_interval(tick_ms in 1u64..60_000) {
        let config = SchedulerConfig {
            tick_interval: Duration::from_millis(tick_ms),
            timezone: chrono_tz::Asia::Seoul,
        };
        prop_assert_eq!(config.tick_interval, Duration::from_millis(tick_ms));
    }

    /// *For any* job key, create → delete round-trips: the job is listed
    /// after create and gone after delete, and a second delete fails.
    #[test]
    fn property_create_delete_round_trip(
        name in "[a-z]{1,8}",
        group in "[a-z]{1,4}",
    ) {
        runtime().block_on(async {
            let engine = engine();
            engine.create_job(&simple_request(&name, &group)).await.unwrap();
            assert_eq!(engine.status().await.num_of_all_jobs, 1);

            engine.delete_job(&name, &group).await.unwrap();
            assert_eq!(engine.status().await.num_of_all_jobs, 0);
            assert!(engine.delete_job(&name, &group).await.is_err());
        });
    }

    /// *For any* nonzero repeat count with a zero interval, job creation is
    /// rejected; with a positive interval it succeeds.
    #[test]
    fn property_interval_validation(count in 1u32..100) {
        runtime().block_on(async {
            let engine = engine();

            let mut invalid = simple_request("tick", "g");
            invalid.repeat_count = Some(count);
            assert!(engine.create_job(&invalid).await.is_err());

            let mut valid = simple_request("tick", "g");
            valid.repeat_count = Some(count);
            valid.repeat_interval_seconds = Some(30);
            assert!(engine.create_job(&valid).await.is_ok());
        });
    }
}
