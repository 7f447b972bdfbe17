//! Logfile rollover decisions.
//!
//! The policy is pure: it only decides *when* the logfile must be rotated.
//! Closing and reopening files is the logfile sink's job.

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use std::time::Duration;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// When to start a new logfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverConfig {
    /// Once a day, at this local time.
    Fixed(NaiveTime),
    /// After this much time has passed since the last rollover.
    Period(Duration),
}

/// Mutable rollover bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RolloverState {
    pub enabled: bool,
    pub last_rollover_instant: Option<DateTime<Local>>,
    /// Start of the fixed window already rolled over in.
    pub last_window: Option<NaiveDateTime>,
}

/// Decides, once per cycle, whether the logfile must be rotated.
#[derive(Debug, Clone)]
pub struct RolloverPolicy {
    config: Option<RolloverConfig>,
    cycle: Duration,
    state: RolloverState,
}

impl RolloverPolicy {
    pub fn new(config: Option<RolloverConfig>, cycle: Duration, start: DateTime<Local>) -> Self {
        let enabled = config.is_some();
        Self {
            config,
            cycle,
            state: RolloverState {
                enabled,
                last_rollover_instant: enabled.then_some(start),
                last_window: None,
            },
        }
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled
    }

    #[cfg(test)]
    pub fn state(&self) -> &RolloverState {
        &self.state
    }

    /// Returns true if a rollover is due at `now`, recording it.
    pub fn evaluate(&mut self, now: DateTime<Local>) -> bool {
        let due = match self.config {
            None => false,
            Some(RolloverConfig::Fixed(at)) => self.enter_window(at, now),
            Some(RolloverConfig::Period(period)) => self.elapsed(now) >= Some(period),
        };
        if due {
            self.mark(now);
        }
        due
    }

    /// Records a rollover performed at `now`, whatever triggered it.
    pub fn mark(&mut self, now: DateTime<Local>) {
        self.state.last_rollover_instant = Some(now);
    }

    fn elapsed(&self, now: DateTime<Local>) -> Option<Duration> {
        let last = self.state.last_rollover_instant?;
        now.signed_duration_since(last).to_std().ok()
    }

    /// True on the first evaluation inside `[at, at + cycle)`.
    fn enter_window(&mut self, at: NaiveTime, now: DateTime<Local>) -> bool {
        let now_ms = i64::from(now.num_seconds_from_midnight()) * 1000
            + i64::from(now.nanosecond() / 1_000_000);
        let at_ms = i64::from(at.num_seconds_from_midnight()) * 1000;
        let offset = (now_ms - at_ms).rem_euclid(MILLIS_PER_DAY);
        let cycle_ms = i64::try_from(self.cycle.as_millis()).unwrap_or(i64::MAX);

        if offset >= cycle_ms {
            return false;
        }

        let window = now.naive_local() - TimeDelta::milliseconds(offset);
        if self.state.last_window == Some(window) {
            return false;
        }
        self.state.last_window = Some(window);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn local(day: u32, h: u32, m: u32, s: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap();
        Local.from_local_datetime(&naive).unwrap()
    }

    fn fixed(h: u32, m: u32, s: u32) -> Option<RolloverConfig> {
        Some(RolloverConfig::Fixed(NaiveTime::from_hms_opt(h, m, s).unwrap()))
    }

    #[test]
    fn test_disabled_never_triggers() {
        let start = local(10, 0, 0, 0);
        let mut policy = RolloverPolicy::new(None, Duration::from_secs(60), start);
        assert!(!policy.enabled());
        assert_eq!(policy.state().last_rollover_instant, None);
        for i in 0..2000 {
            assert!(!policy.evaluate(start + TimeDelta::seconds(i * 60)));
        }
    }

    #[test]
    fn test_fixed_window_membership() {
        let start = local(10, 0, 0, 0);
        for (h, m, s, inside) in [
            (12, 0, 0, true),
            (12, 0, 59, true),
            (12, 1, 0, false),
            (11, 59, 59, false),
            (0, 0, 0, false),
        ] {
            let mut policy = RolloverPolicy::new(fixed(12, 0, 0), Duration::from_secs(60), start);
            assert_eq!(policy.evaluate(local(10, h, m, s)), inside, "{h}:{m}:{s}");
        }
    }

    #[test]
    fn test_fixed_window_wraps_past_midnight() {
        let start = local(10, 0, 0, 0);
        let mut policy = RolloverPolicy::new(fixed(23, 59, 30), Duration::from_secs(60), start);
        assert!(!policy.evaluate(local(10, 23, 59, 29)));
        assert!(policy.evaluate(local(11, 0, 0, 15)));

        let mut policy = RolloverPolicy::new(fixed(23, 59, 30), Duration::from_secs(60), start);
        assert!(policy.evaluate(local(10, 23, 59, 45)));
        assert!(!policy.evaluate(local(11, 0, 0, 20)));
        assert!(!policy.evaluate(local(11, 0, 0, 30)));
    }

    #[test]
    fn test_fixed_window_at_most_once() {
        let start = local(10, 0, 0, 0);
        let mut policy = RolloverPolicy::new(fixed(0, 0, 0), Duration::from_secs(60), start);
        assert!(policy.evaluate(local(11, 0, 0, 5)));
        assert!(!policy.evaluate(local(11, 0, 0, 35)));
        assert!(!policy.evaluate(local(11, 0, 0, 59)));
        // Next day's window fires again.
        assert!(policy.evaluate(local(12, 0, 0, 10)));
    }

    #[test]
    fn test_fixed_window_over_a_day_of_cycles() {
        let start = local(10, 0, 0, 7);
        let mut policy = RolloverPolicy::new(fixed(6, 30, 0), Duration::from_secs(60), start);
        let fired = (0..1440)
            .filter(|i| policy.evaluate(start + TimeDelta::seconds(i * 60)))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_period_elapsed_resets() {
        let start = local(10, 8, 0, 0);
        let period = Duration::from_secs(3600);
        let mut policy = RolloverPolicy::new(
            Some(RolloverConfig::Period(period)),
            Duration::from_secs(60),
            start,
        );
        assert_eq!(policy.state().last_rollover_instant, Some(start));

        assert!(!policy.evaluate(start + TimeDelta::seconds(3599)));
        assert!(policy.evaluate(start + TimeDelta::seconds(3600)));
        assert_eq!(
            policy.state().last_rollover_instant,
            Some(start + TimeDelta::seconds(3600))
        );
        assert!(!policy.evaluate(start + TimeDelta::seconds(7000)));
        assert!(policy.evaluate(start + TimeDelta::seconds(7200)));
    }

    #[test]
    fn test_mark_resets_period() {
        let start = local(10, 8, 0, 0);
        let mut policy = RolloverPolicy::new(
            Some(RolloverConfig::Period(Duration::from_secs(3600))),
            Duration::from_secs(60),
            start,
        );
        policy.mark(start + TimeDelta::seconds(1800));
        assert!(!policy.evaluate(start + TimeDelta::seconds(3600)));
        assert!(policy.evaluate(start + TimeDelta::seconds(5400)));
    }

    #[test]
    fn test_clock_stepping_back_does_not_trigger() {
        let start = local(10, 8, 0, 0);
        let mut policy = RolloverPolicy::new(
            Some(RolloverConfig::Period(Duration::from_secs(60))),
            Duration::from_secs(60),
            start,
        );
        assert!(!policy.evaluate(start - TimeDelta::seconds(3600)));
    }
}
