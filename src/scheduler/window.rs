//! Publishing window gate
//!
//! A civil-time-of-day rule: publishing is allowed when the hour in the
//! configured time zone falls inside `[start_hour, end_hour)`. The host
//! process time zone never participates; the instant is converted into the
//! window's own zone before the comparison.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::error::{SchedulerError, SchedulerResult};

/// Publishing-hours policy plus the per-tick quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingWindow {
    /// First hour (inclusive) of the window, 0-24.
    pub start_hour: u32,

    /// End hour (exclusive) of the window, 0-24.
    pub end_hour: u32,

    /// Maximum items published per tick.
    pub quota_per_tick: usize,

    /// IANA zone the hours are evaluated in, e.g. "Europe/Istanbul".
    pub timezone: String,
}

impl Default for PublishingWindow {
    fn default() -> Self {
        Self {
            start_hour: 12,
            end_hour: 19,
            quota_per_tick: 1,
            timezone: "Europe/Istanbul".to_string(),
        }
    }
}

impl PublishingWindow {
    /// Validate the window invariants.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(SchedulerError::invalid_window(
                self.start_hour,
                self.end_hour,
            ));
        }

        if self.quota_per_tick == 0 {
            return Err(SchedulerError::invalid_quota());
        }

        self.tz()?;
        Ok(())
    }

    /// Parse the configured zone.
    pub fn tz(&self) -> SchedulerResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| SchedulerError::invalid_timezone(&self.timezone))
    }

    /// True if unscheduled publishing is permitted at `now`.
    pub fn allowed(&self, now: DateTime<Utc>) -> SchedulerResult<bool> {
        let local = self.tz()?.from_utc_datetime(&now.naive_utc());
        let hour = local.hour();
        Ok(self.start_hour <= hour && hour < self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(start: u32, end: u32, tz: &str) -> PublishingWindow {
        PublishingWindow {
            start_hour: start,
            end_hour: end,
            quota_per_tick: 1,
            timezone: tz.to_string(),
        }
    }

    #[test]
    fn test_default_window_is_valid() {
        assert!(PublishingWindow::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_windows() {
        assert!(window(19, 12, "UTC").validate().is_err());
        assert!(window(12, 12, "UTC").validate().is_err());
        assert!(window(0, 25, "UTC").validate().is_err());
        assert!(window(12, 19, "Mars/Olympus").validate().is_err());

        let zero_quota = PublishingWindow {
            quota_per_tick: 0,
            ..Default::default()
        };
        assert!(zero_quota.validate().is_err());
    }

    #[test]
    fn test_boundary_hours() {
        let w = window(12, 19, "UTC");

        // start_hour is inclusive
        let at_start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(w.allowed(at_start).unwrap());

        // end_hour is exclusive
        let at_end = Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap();
        assert!(!w.allowed(at_end).unwrap());

        let just_before_end = Utc.with_ymd_and_hms(2024, 6, 1, 18, 59, 59).unwrap();
        assert!(w.allowed(just_before_end).unwrap());
    }

    #[test]
    fn test_configured_zone_not_host_zone() {
        // 10:00 UTC is 13:00 in Istanbul (UTC+3): inside a 12-19 window
        // there, outside the same window in UTC.
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();

        assert!(window(12, 19, "Europe/Istanbul").allowed(at).unwrap());
        assert!(!window(12, 19, "UTC").allowed(at).unwrap());
    }

    #[test]
    fn test_outside_window() {
        let w = window(12, 19, "UTC");

        let early = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();
        assert!(!w.allowed(early).unwrap());

        let late = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
        assert!(!w.allowed(late).unwrap());
    }
}
