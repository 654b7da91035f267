// Trigger fire-time calculation
//
// A trigger is either a fixed-time one-shot/interval trigger or a cron-style
// recurring trigger. All cron evaluation happens in the engine's configured
// time zone so fire times stay stable across deployment moves; instants are
// stored and compared in UTC.

use crate::errors::TriggerError;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;

/// Rule determining when a job fires.
#[derive(Debug, Clone)]
pub enum TriggerSpec {
    Simple(SimpleTrigger),
    Cron(CronTrigger),
}

impl TriggerSpec {
    /// The instant a freshly created entry is armed with. A simple trigger
    /// arms at its start time even when that is already in the past (the
    /// engine fires it at the next tick, no misfire suppression); a cron
    /// trigger arms at its first occurrence after `now`.
    pub fn first_fire_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TriggerSpec::Simple(t) => Some(t.start_at),
            TriggerSpec::Cron(t) => t.next_fire_time(now),
        }
    }

    /// Earliest fire instant strictly after `after`, or `None` once the
    /// trigger is exhausted.
    pub fn next_fire_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TriggerSpec::Simple(t) => t.next_fire_time(after),
            TriggerSpec::Cron(t) => t.next_fire_time(after),
        }
    }

    /// The trigger's schedule time: a simple trigger's start instant, or the
    /// instant a cron trigger was created.
    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            TriggerSpec::Simple(t) => t.start_at,
            TriggerSpec::Cron(t) => t.start_at,
        }
    }
}

/// Fixed-time trigger: fires at `start_at + k * interval` for
/// `k = 0..=repeat_count`. A repeat count of zero fires exactly once; `None`
/// repeats indefinitely.
#[derive(Debug, Clone)]
pub struct SimpleTrigger {
    pub start_at: DateTime<Utc>,
    pub repeat_interval_seconds: u64,
    pub repeat_count: Option<u32>,
}

impl SimpleTrigger {
    pub fn new(
        start_at: DateTime<Utc>,
        repeat_interval_seconds: u64,
        repeat_count: Option<u32>,
    ) -> Result<Self, TriggerError> {
        if repeat_interval_seconds == 0 {
            if let Some(count) = repeat_count.filter(|c| *c > 0) {
                return Err(TriggerError::InvalidRepeatInterval {
                    repeat_count: count,
                });
            }
        }
        Ok(Self {
            start_at,
            repeat_interval_seconds,
            repeat_count,
        })
    }

    fn next_fire_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.repeat_interval_seconds == 0 || self.repeat_count == Some(0) {
            // One-shot: a single fire at the start instant.
            return (self.start_at > after).then_some(self.start_at);
        }

        if after < self.start_at {
            return Some(self.start_at);
        }

        let interval = self.repeat_interval_seconds as i64;
        let elapsed = (after - self.start_at).num_seconds();
        let k = elapsed / interval + 1;
        if let Some(count) = self.repeat_count {
            if k > count as i64 {
                return None;
            }
        }
        Some(self.start_at + Duration::seconds(k * interval))
    }
}

/// Cron-style recurring trigger evaluated in a pinned time zone. Rejected at
/// construction when the expression does not parse or yields no future fire
/// instant.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    pub expression: String,
    schedule: CronSchedule,
    timezone: Tz,
    pub start_at: DateTime<Utc>,
}

impl CronTrigger {
    pub fn new(expression: &str, timezone: Tz, now: DateTime<Utc>) -> Result<Self, TriggerError> {
        let schedule = parse_cron_expression(expression)?;

        let trigger = Self {
            expression: expression.to_string(),
            schedule,
            timezone,
            start_at: now,
        };
        if trigger.next_fire_time(now).is_none() {
            return Err(TriggerError::NoFutureFireTime {
                expression: expression.to_string(),
            });
        }
        Ok(trigger)
    }

    fn next_fire_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let after_in_tz = after.with_timezone(&self.timezone);
        self.schedule
            .after(&after_in_tz)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }
}

/// Parse and validate a cron expression. Five-field expressions get a
/// seconds field prepended so both five- and six-field syntax are accepted.
pub fn parse_cron_expression(expression: &str) -> Result<CronSchedule, TriggerError> {
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    };

    CronSchedule::from_str(&normalized).map_err(|e| TriggerError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Interpret a wall-clock time in the engine's pinned zone as a UTC instant.
/// The single construction path for user-supplied start times.
pub fn local_to_utc(local: NaiveDateTime, timezone: Tz) -> Result<DateTime<Utc>, TriggerError> {
    timezone
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TriggerError::UnrepresentableStartTime {
            start_at: local.to_string(),
            timezone: timezone.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seoul() -> Tz {
        chrono_tz::Asia::Seoul
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_valid_cron_expression() {
        assert!(parse_cron_expression("0 0 12 * * *").is_ok());
        assert!(parse_cron_expression("0 0 * * * ?").is_ok());
    }

    #[test]
    fn test_parse_five_field_cron_expression() {
        assert!(parse_cron_expression("*/5 * * * *").is_ok());
    }

    #[test]
    fn test_parse_invalid_cron_expression() {
        let result = parse_cron_expression("not a cron");
        assert!(matches!(
            result,
            Err(TriggerError::InvalidCronExpression { .. })
        ));
    }

    #[test]
    fn test_one_shot_fires_once_at_start() {
        let start = at(10, 0, 0);
        let trigger = SimpleTrigger::new(start, 0, Some(0)).unwrap();
        assert_eq!(trigger.next_fire_time(at(9, 0, 0)), Some(start));
        assert_eq!(trigger.next_fire_time(start), None);
        assert_eq!(trigger.next_fire_time(at(11, 0, 0)), None);
    }

    #[test]
    fn test_one_shot_in_the_past_still_arms() {
        let start = at(8, 0, 0);
        let spec = TriggerSpec::Simple(SimpleTrigger::new(start, 0, Some(0)).unwrap());
        assert_eq!(spec.first_fire_time(at(12, 0, 0)), Some(start));
    }

    #[test]
    fn test_interval_trigger_fire_sequence() {
        let start = at(10, 0, 0);
        let trigger = SimpleTrigger::new(start, 30, Some(2)).unwrap();
        // Fires at start, start+30s, start+60s.
        assert_eq!(trigger.next_fire_time(at(9, 0, 0)), Some(start));
        assert_eq!(trigger.next_fire_time(start), Some(at(10, 0, 30)));
        assert_eq!(trigger.next_fire_time(at(10, 0, 30)), Some(at(10, 1, 0)));
        assert_eq!(trigger.next_fire_time(at(10, 1, 0)), None);
    }

    #[test]
    fn test_interval_trigger_skips_elapsed_fires() {
        let start = at(10, 0, 0);
        let trigger = SimpleTrigger::new(start, 30, Some(10)).unwrap();
        assert_eq!(trigger.next_fire_time(at(10, 1, 10)), Some(at(10, 1, 30)));
    }

    #[test]
    fn test_unbounded_interval_trigger_never_exhausts() {
        let start = at(10, 0, 0);
        let trigger = SimpleTrigger::new(start, 60, None).unwrap();
        let far = at(23, 59, 0);
        assert_eq!(trigger.next_fire_time(far), Some(at(0, 0, 0) + Duration::days(1)));
    }

    #[test]
    fn test_zero_interval_with_repeats_rejected() {
        let result = SimpleTrigger::new(at(10, 0, 0), 0, Some(3));
        assert!(matches!(
            result,
            Err(TriggerError::InvalidRepeatInterval { repeat_count: 3 })
        ));
    }

    #[test]
    fn test_cron_next_fire_is_top_of_next_hour() {
        // 03:30 UTC is 12:30 in Seoul; the next hourly fire is 13:00 Seoul,
        // which is 04:00 UTC.
        let now = at(3, 30, 0);
        let trigger = CronTrigger::new("0 0 * * * ?", seoul(), now).unwrap();
        assert_eq!(trigger.next_fire_time(now), Some(at(4, 0, 0)));
    }

    #[test]
    fn test_cron_is_strictly_after_reference() {
        let on_the_hour = at(4, 0, 0);
        let trigger = CronTrigger::new("0 0 * * * ?", seoul(), at(3, 0, 0)).unwrap();
        assert_eq!(trigger.next_fire_time(on_the_hour), Some(at(5, 0, 0)));
    }

    #[test]
    fn test_cron_never_exhausts() {
        let now = at(3, 0, 0);
        let spec = TriggerSpec::Cron(CronTrigger::new("0 0 * * * ?", seoul(), now).unwrap());
        let mut reference = now;
        for _ in 0..24 {
            let next = spec.next_fire_time(reference).expect("cron should keep firing");
            assert!(next > reference);
            reference = next;
        }
    }

    #[test]
    fn test_invalid_cron_rejected_at_construction() {
        let result = CronTrigger::new("61 * * * * *", seoul(), at(3, 0, 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_next_fire_time_monotonic_over_advancing_reference() {
        let start = at(10, 0, 0);
        let spec = TriggerSpec::Simple(SimpleTrigger::new(start, 45, Some(20)).unwrap());
        let mut reference = at(9, 0, 0);
        let mut last_seen = spec.next_fire_time(reference).unwrap();
        while reference < at(10, 20, 0) {
            reference += Duration::seconds(17);
            match spec.next_fire_time(reference) {
                Some(next) => {
                    assert!(next >= last_seen);
                    assert!(next > reference);
                    last_seen = next;
                }
                None => break,
            }
        }
    }

    #[test]
    fn test_local_to_utc_pins_zone() {
        let local = NaiveDateTime::parse_from_str("2026-08-05 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let utc = local_to_utc(local, seoul()).unwrap();
        assert_eq!(utc, at(3, 0, 0));
    }
}
