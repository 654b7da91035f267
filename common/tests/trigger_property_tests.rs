// Property-based tests for trigger fire-time calculation

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::trigger::{CronTrigger, SimpleTrigger, TriggerSpec};
use proptest::prelude::*;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

proptest! {
    /// *For any* valid simple trigger and any advancing reference instant,
    /// successive next-fire computations never move backwards and every
    /// computed fire is strictly after its reference.
    #[test]
    fn property_simple_trigger_next_fire_monotonic(
        start_offset in 0i64..86_400,
        interval in 1u64..3_600,
        count in 0u32..50,
        advances in proptest::collection::vec(1i64..600, 1..40),
    ) {
        let start = base_time() + Duration::seconds(start_offset);
        let spec = TriggerSpec::Simple(
            SimpleTrigger::new(start, interval, Some(count)).unwrap(),
        );

        let mut reference = base_time();
        let mut last = spec.next_fire_time(reference);
        for step in advances {
            reference += Duration::seconds(step);
            let next = spec.next_fire_time(reference);

            if let (Some(prev), Some(next)) = (last, next) {
                prop_assert!(next >= prev);
            }
            // Exhaustion is terminal under an advancing reference.
            if last.is_none() {
                prop_assert!(next.is_none());
            }
            if let Some(next) = next {
                prop_assert!(next > reference);
            }
            last = next;
        }
    }

    /// *For any* bounded simple trigger, walking the fire chain yields
    /// exactly repeat_count + 1 fires, each a whole interval apart.
    #[test]
    fn property_bounded_trigger_fire_count(
        interval in 1u64..3_600,
        count in 0u32..100,
    ) {
        let start = base_time();
        let spec = TriggerSpec::Simple(
            SimpleTrigger::new(start, interval, Some(count)).unwrap(),
        );

        let mut fires = Vec::new();
        let mut reference = start - Duration::seconds(1);
        while let Some(next) = spec.next_fire_time(reference) {
            fires.push(next);
            reference = next;
        }

        prop_assert_eq!(fires.len() as u32, count + 1);
        for pair in fires.windows(2) {
            prop_assert_eq!(pair[1] - pair[0], Duration::seconds(interval as i64));
        }
    }

    /// *For any* one-shot trigger, there is exactly one fire, at the start
    /// instant — whether that instant lies in the past or the future.
    #[test]
    fn property_one_shot_fires_exactly_once(start_offset in -86_400i64..86_400) {
        let start = base_time() + Duration::seconds(start_offset);
        let spec = TriggerSpec::Simple(SimpleTrigger::new(start, 0, Some(0)).unwrap());

        prop_assert_eq!(spec.first_fire_time(base_time()), Some(start));
        prop_assert_eq!(spec.next_fire_time(start - Duration::seconds(1)), Some(start));
        prop_assert_eq!(spec.next_fire_time(start), None);
    }

    /// *For any* of a set of recurring cron expressions and any reference
    /// instant, the fire sequence is strictly increasing and monotone in the
    /// reference.
    #[test]
    fn property_cron_trigger_monotonic(
        expression in prop_oneof![
            Just("0 0 * * * ?"),
            Just("*/5 * * * * *"),
            Just("0 30 9 * * *"),
            Just("*/10 * * * *"),
        ],
        offset in 0i64..604_800,
        advances in proptest::collection::vec(1i64..7_200, 1..20),
    ) {
        let created = base_time() + Duration::seconds(offset);
        let spec = TriggerSpec::Cron(
            CronTrigger::new(expression, chrono_tz::Asia::Seoul, created).unwrap(),
        );

        let mut reference = created;
        let mut last = spec.next_fire_time(reference);
        prop_assert!(last.is_some());
        for step in advances {
            reference += Duration::seconds(step);
            let next = spec.next_fire_time(reference);
            prop_assert!(next.is_some());
            if let (Some(prev), Some(next)) = (last, next) {
                prop_assert!(next >= prev);
                prop_assert!(next > reference);
            }
            last = next;
        }
    }
}
