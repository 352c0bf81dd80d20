use crate::error::{ReportError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime};
use std::str::FromStr;
use std::time::Duration;

/// When the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run immediately, then stop
    Once,
    /// Fixed interval, first run at start
    Every(Duration),
    /// Once per day at a local wall-clock time
    Daily(NaiveTime),
}

impl FromStr for Schedule {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ReportError::InvalidSchedule(s.to_string(), reason.to_string());
        let mut parts = s.split_whitespace();

        match (parts.next(), parts.next(), parts.next()) {
            (Some("once"), None, _) => Ok(Schedule::Once),
            (Some("every"), Some(interval), None) => parse_interval(interval)
                .map(Schedule::Every)
                .ok_or_else(|| invalid("expected an interval like 30s, 15m or 6h")),
            (Some("daily"), Some(time), None) => NaiveTime::parse_from_str(time, "%H:%M")
                .map(Schedule::Daily)
                .map_err(|_| invalid("expected a time like 06:00")),
            _ => Err(invalid("use once, every <N><s|m|h> or daily <HH:MM>")),
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Once => write!(f, "once"),
            Schedule::Every(interval) => {
                let secs = interval.as_secs();
                if secs % 3600 == 0 {
                    write!(f, "every {}h", secs / 3600)
                } else if secs % 60 == 0 {
                    write!(f, "every {}m", secs / 60)
                } else {
                    write!(f, "every {}s", secs)
                }
            }
            Schedule::Daily(time) => write!(f, "daily {}", time.format("%H:%M")),
        }
    }
}

fn parse_interval(s: &str) -> Option<Duration> {
    let unit = s.chars().last()?;
    let count: u64 = s[..s.len() - unit.len_utf8()].parse().ok()?;
    if count == 0 {
        return None;
    }
    let secs = match unit {
        's' => count,
        'm' => count.checked_mul(60)?,
        'h' => count.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

impl Schedule {
    /// Time to wait before the next run, or `None` when the schedule is done.
    ///
    /// Interval ticks that fell inside a long run are skipped rather than
    /// fired back to back.
    ///
    /// # Arguments
    /// * `now` - Current local time
    /// * `last_start` - Start time of the previous run, if any
    pub fn next_delay(
        &self,
        now: DateTime<Local>,
        last_start: Option<DateTime<Local>>,
    ) -> Option<Duration> {
        match (self, last_start) {
            (Schedule::Once, None) => Some(Duration::ZERO),
            (Schedule::Once, Some(_)) => None,
            (Schedule::Every(_), None) => Some(Duration::ZERO),
            (Schedule::Every(interval), Some(last)) => {
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                if elapsed < *interval {
                    return Some(*interval - elapsed);
                }
                let into_tick = Duration::from_nanos(
                    (elapsed.as_nanos() % interval.as_nanos().max(1)) as u64,
                );
                if into_tick.is_zero() {
                    Some(Duration::ZERO)
                } else {
                    Some(*interval - into_tick)
                }
            }
            (Schedule::Daily(at), last) => {
                // A run that started after `now` (clock stepped back) must not repeat today
                let base = match last {
                    Some(last) if last > now => last,
                    _ => now,
                }
                .naive_local();

                let today = base.date().and_time(*at);
                let next = if today > base {
                    today
                } else {
                    today + ChronoDuration::days(1)
                };
                (next - now.naive_local()).to_std().ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!("once".parse::<Schedule>().unwrap(), Schedule::Once);
        assert_eq!(
            "every 15m".parse::<Schedule>().unwrap(),
            Schedule::Every(Duration::from_secs(900))
        );
        assert_eq!(
            "every 30s".parse::<Schedule>().unwrap(),
            Schedule::Every(Duration::from_secs(30))
        );
        assert_eq!(
            "  daily   06:30 ".parse::<Schedule>().unwrap(),
            Schedule::Daily(NaiveTime::from_hms_opt(6, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for expr in ["", "hourly", "every", "every 0m", "every 5d", "every m", "daily 25:00", "once now"] {
            assert!(
                matches!(expr.parse::<Schedule>(), Err(ReportError::InvalidSchedule(_, _))),
                "accepted {:?}",
                expr
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for expr in ["once", "every 2h", "every 15m", "every 45s", "daily 06:00"] {
            assert_eq!(expr.parse::<Schedule>().unwrap().to_string(), expr);
        }
    }

    #[test]
    fn test_once_runs_exactly_once() {
        let now = at(10, 0, 0);
        assert_eq!(Schedule::Once.next_delay(now, None), Some(Duration::ZERO));
        assert_eq!(Schedule::Once.next_delay(now, Some(now)), None);
    }

    #[test]
    fn test_every_first_run_is_immediate() {
        let schedule = Schedule::Every(Duration::from_secs(600));
        assert_eq!(schedule.next_delay(at(10, 0, 0), None), Some(Duration::ZERO));
    }

    #[test]
    fn test_every_waits_remaining_interval() {
        let schedule = Schedule::Every(Duration::from_secs(600));
        let delay = schedule.next_delay(at(10, 2, 0), Some(at(10, 0, 0)));
        assert_eq!(delay, Some(Duration::from_secs(480)));
    }

    #[test]
    fn test_every_skips_missed_ticks() {
        let schedule = Schedule::Every(Duration::from_secs(600));
        // Run started 10:00 and took 25 minutes: 10:10 and 10:20 are skipped
        let delay = schedule.next_delay(at(10, 25, 0), Some(at(10, 0, 0)));
        assert_eq!(delay, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_daily_later_today() {
        let schedule = Schedule::Daily(NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        let delay = schedule.next_delay(at(5, 30, 0), None);
        assert_eq!(delay, Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_daily_tomorrow_after_run() {
        let schedule = Schedule::Daily(NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        let delay = schedule.next_delay(at(6, 0, 5), Some(at(6, 0, 0)));
        assert_eq!(delay, Some(Duration::from_secs(24 * 3600 - 5)));
    }
}
