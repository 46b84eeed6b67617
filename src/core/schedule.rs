//! Time-of-day parsing and calendar slot arithmetic.
//!
//! A booking window is a start and end wall-clock time on an event date. A window
//! whose end is not after its start is only accepted when the caller says it spans
//! midnight; otherwise it is rejected as a data-entry error. Windows are projected
//! onto absolute minutes so overnight bookings compare correctly against bookings
//! on the neighbouring date.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A wall-clock time with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minute_of_day: u32,
}

impl TimeOfDay {
    /// Builds a time from hour and minute.
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::validation(format!(
                "time {hour:02}:{minute:02} is out of range"
            )));
        }
        Ok(Self {
            minute_of_day: hour * 60 + minute,
        })
    }

    /// Minutes since midnight.
    #[must_use]
    pub const fn minute_of_day(self) -> u32 {
        self.minute_of_day
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    /// Parses strict `HH:mm` (24-hour, zero-padded).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("time '{s}' must be in HH:mm form"));
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}",
            self.minute_of_day / 60,
            self.minute_of_day % 60
        )
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A validated booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: TimeOfDay,
    end: TimeOfDay,
    spans_midnight: bool,
}

impl TimeWindow {
    /// Validates a window.
    ///
    /// Without `spans_midnight`, the end must be strictly after the start. With it,
    /// the end must be at or before the start (equal means a full 24 hours).
    pub fn new(start: TimeOfDay, end: TimeOfDay, spans_midnight: bool) -> Result<Self> {
        match (spans_midnight, end > start) {
            (false, false) => Err(Error::validation(format!(
                "end time {end} must be after start time {start}; \
                 set spans_midnight for overnight events"
            ))),
            (true, true) => Err(Error::validation(format!(
                "window {start}-{end} does not cross midnight but spans_midnight is set"
            ))),
            _ => Ok(Self {
                start,
                end,
                spans_midnight,
            }),
        }
    }

    /// Parses both ends from `HH:mm` strings and validates the window.
    pub fn parse(start: &str, end: &str, spans_midnight: bool) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?, spans_midnight)
    }

    /// Start time.
    #[must_use]
    pub const fn start(&self) -> TimeOfDay {
        self.start
    }

    /// End time.
    #[must_use]
    pub const fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Whether the window ends on the following day.
    #[must_use]
    pub const fn spans_midnight(&self) -> bool {
        self.spans_midnight
    }

    /// Length of the window in minutes; always positive.
    #[must_use]
    pub const fn duration_minutes(&self) -> u32 {
        if self.spans_midnight {
            MINUTES_PER_DAY - self.start.minute_of_day + self.end.minute_of_day
        } else {
            self.end.minute_of_day - self.start.minute_of_day
        }
    }

    /// Projects the window onto the absolute calendar for `date`.
    #[must_use]
    pub fn slot_on(&self, date: NaiveDate) -> Slot {
        let day_start = i64::from(date.num_days_from_ce()) * i64::from(MINUTES_PER_DAY);
        let start = day_start + i64::from(self.start.minute_of_day);
        Slot {
            start,
            end: start + i64::from(self.duration_minutes()),
        }
    }
}

/// A half-open `[start, end)` range of absolute minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// First occupied minute
    pub start: i64,
    /// First free minute after the slot
    pub end: i64,
}

impl Slot {
    /// Half-open overlap: touching endpoints do not overlap.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Day of week with Sunday as 0, matching how pricing rules are keyed.
#[must_use]
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use proptest::prelude::*;

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::parse(start, end, false).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        let t: TimeOfDay = "09:30".parse().unwrap();
        assert_eq!(t.minute_of_day(), 570);
        assert_eq!(t.to_string(), "09:30");

        assert!("9:30".parse::<TimeOfDay>().is_err());
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_window_requires_explicit_midnight_flag() {
        assert!(TimeWindow::parse("22:00", "02:00", false).is_err());
        assert!(TimeWindow::parse("10:00", "10:00", false).is_err());
        assert!(TimeWindow::parse("10:00", "12:00", true).is_err());

        let overnight = TimeWindow::parse("22:00", "02:00", true).unwrap();
        assert_eq!(overnight.duration_minutes(), 240);

        let full_day = TimeWindow::parse("08:00", "08:00", true).unwrap();
        assert_eq!(full_day.duration_minutes(), MINUTES_PER_DAY);
    }

    #[test]
    fn test_half_open_overlap_examples() {
        let d = date();
        let base = window("09:00", "11:00").slot_on(d);

        assert!(!base.overlaps(&window("11:00", "13:00").slot_on(d)));
        assert!(base.overlaps(&window("10:00", "12:00").slot_on(d)));
        assert!(base.overlaps(&window("09:00", "11:00").slot_on(d)));
        assert!(!base.overlaps(&window("09:00", "11:00").slot_on(d.succ_opt().unwrap())));
    }

    #[test]
    fn test_overnight_slot_reaches_next_day() {
        let d = date();
        let overnight = TimeWindow::parse("22:00", "02:00", true).unwrap().slot_on(d);
        let next_morning = window("01:00", "03:00").slot_on(d.succ_opt().unwrap());
        let next_late = window("02:00", "04:00").slot_on(d.succ_opt().unwrap());

        assert!(overnight.overlaps(&next_morning));
        assert!(!overnight.overlaps(&next_late));
    }

    #[test]
    fn test_day_of_week_sunday_is_zero() {
        // 2025-03-16 is a Sunday
        assert_eq!(day_of_week(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap()), 0);
        assert_eq!(day_of_week(date()), 5);
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(a in 0u32..1439, la in 1u32..600, b in 0u32..1439, lb in 1u32..600) {
            let d = date();
            let mk = |start: u32, len: u32| {
                let s = TimeOfDay::new(start / 60, start % 60).unwrap();
                let end_min = (start + len) % MINUTES_PER_DAY;
                let e = TimeOfDay::new(end_min / 60, end_min % 60).unwrap();
                TimeWindow::new(s, e, start + len >= MINUTES_PER_DAY).unwrap().slot_on(d)
            };
            let x = mk(a, la);
            let y = mk(b, lb);
            prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
            prop_assert_eq!(x.overlaps(&y), x.start < y.end && x.end > y.start);
        }
    }
}
