//! Quarter and week arithmetic.
//!
//! Weeks run Sunday through Saturday, matching the weekly reporting period of
//! the upstream report. Week 1 of a quarter starts on the first Sunday on or
//! after the quarter's first day; a quarter tracks at most
//! [`WEEKS_PER_QUARTER`] weeks.

use std::fmt;

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const WEEKS_PER_QUARTER: u8 = 13;

/// Column/label form of a week index, e.g. `W03`.
pub fn week_label(index: u8) -> String { format!("W{index:02}") }

// ─── Quarter ─────────────────────────────────────────────────────────────────

/// A calendar quarter, identified by year and quarter number (1–4).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Quarter {
  year:   i32,
  number: u8,
}

impl Quarter {
  pub fn new(year: i32, number: u8) -> Result<Self> {
    if !(1..=4).contains(&number) {
      return Err(Error::InvalidQuarter(number));
    }
    Ok(Self { year, number })
  }

  /// The quarter a date falls in: Jan–Mar is Q1, Apr–Jun Q2, and so on.
  pub fn containing(date: NaiveDate) -> Self {
    Self { year: date.year(), number: (date.month0() / 3) as u8 + 1 }
  }

  pub fn year(&self) -> i32 { self.year }

  pub fn number(&self) -> u8 { self.number }

  pub fn first_day(&self) -> Option<NaiveDate> {
    let month = u32::from(self.number - 1) * 3 + 1;
    NaiveDate::from_ymd_opt(self.year, month, 1)
  }

  /// The Sunday that opens week 1.
  fn first_sunday(&self) -> Option<NaiveDate> {
    let first = self.first_day()?;
    let offset = (7 - first.weekday().num_days_from_sunday()) % 7;
    first.checked_add_days(Days::new(u64::from(offset)))
  }

  /// The span of week `index` (1-based). `None` outside 1..=13.
  ///
  /// Weeks are laid out from the first Sunday on or after the quarter's
  /// first day, so week 13 usually ends after the quarter does. It only
  /// lies fully inside the quarter when the quarter opens on a Sunday.
  pub fn week(&self, index: u8) -> Option<WeekSpan> {
    if !(1..=WEEKS_PER_QUARTER).contains(&index) {
      return None;
    }
    let start = self
      .first_sunday()?
      .checked_add_days(Days::new(u64::from(index - 1) * 7))?;
    let end = start.checked_add_days(Days::new(6))?;
    Some(WeekSpan { index, start, end })
  }

  /// All weeks of this quarter whose seven days have fully elapsed by
  /// `today`, in order. A week ending on `today` is not yet complete.
  pub fn complete_weeks(&self, today: NaiveDate) -> Vec<WeekSpan> {
    (1..=WEEKS_PER_QUARTER)
      .map_while(|i| self.week(i))
      .take_while(|w| w.is_complete(today))
      .collect()
  }

  /// Index of the most recent complete week, if any.
  pub fn last_complete_week(&self, today: NaiveDate) -> Option<u8> {
    self.complete_weeks(today).last().map(|w| w.index)
  }
}

impl fmt::Display for Quarter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Q{} {}", self.number, self.year)
  }
}

// ─── WeekSpan ────────────────────────────────────────────────────────────────

/// One Sunday–Saturday reporting week within a quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSpan {
  pub index: u8,
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl WeekSpan {
  pub fn label(&self) -> String { week_label(self.index) }

  pub fn is_complete(&self, today: NaiveDate) -> bool { today > self.end }
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of "today". The engine never reads the wall clock directly.
pub trait Clock: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// The local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate { Local::now().date_naive() }
}

/// A fixed date is its own clock.
impl Clock for NaiveDate {
  fn today(&self) -> NaiveDate { *self }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn quarter_from_month() {
    assert_eq!(Quarter::containing(d(2026, 1, 1)).number(), 1);
    assert_eq!(Quarter::containing(d(2026, 3, 31)).number(), 1);
    assert_eq!(Quarter::containing(d(2026, 4, 1)).number(), 2);
    assert_eq!(Quarter::containing(d(2026, 9, 30)).number(), 3);
    assert_eq!(Quarter::containing(d(2026, 12, 31)).number(), 4);
    assert_eq!(Quarter::containing(d(2026, 12, 31)).year(), 2026);
  }

  #[test]
  fn quarter_number_is_validated() {
    assert!(Quarter::new(2026, 0).is_err());
    assert!(Quarter::new(2026, 5).is_err());
    assert_eq!(Quarter::new(2026, 4).unwrap().to_string(), "Q4 2026");
  }

  #[test]
  fn week_one_starts_on_first_sunday() {
    // 2026-10-01 is a Thursday.
    let q = Quarter::new(2026, 4).unwrap();
    let w1 = q.week(1).unwrap();
    assert_eq!(w1.start, d(2026, 10, 4));
    assert_eq!(w1.end, d(2026, 10, 10));
    assert_eq!(q.week(13).unwrap().start, d(2026, 12, 27));
    assert!(q.week(0).is_none());
    assert!(q.week(14).is_none());
  }

  #[test]
  fn quarter_starting_on_sunday_uses_that_day() {
    // 2023-10-01 is a Sunday.
    let q = Quarter::new(2023, 4).unwrap();
    assert_eq!(q.week(1).unwrap().start, d(2023, 10, 1));
  }

  #[test]
  fn week_thirteen_usually_ends_after_the_quarter() {
    let q = Quarter::new(2026, 4).unwrap();
    assert_eq!(q.week(13).unwrap().end, d(2027, 1, 2));
    // Never complete while the quarter is still the current one.
    assert_eq!(q.last_complete_week(d(2026, 12, 31)), Some(12));

    let sunday_start = Quarter::new(2023, 4).unwrap();
    assert_eq!(sunday_start.week(13).unwrap().end, d(2023, 12, 30));
    assert_eq!(sunday_start.last_complete_week(d(2023, 12, 31)), Some(13));
  }

  #[test]
  fn only_fully_elapsed_weeks_are_complete() {
    let q = Quarter::new(2026, 4).unwrap();

    // Saturday 2026-10-10 closes week 1; it is not complete until Sunday.
    assert!(q.complete_weeks(d(2026, 10, 10)).is_empty());
    assert_eq!(q.last_complete_week(d(2026, 10, 11)), Some(1));

    let weeks = q.complete_weeks(d(2026, 10, 19));
    assert_eq!(weeks.iter().map(|w| w.index).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(weeks[1].label(), "W02");
  }

  #[test]
  fn complete_weeks_caps_at_thirteen() {
    let q = Quarter::new(2026, 1).unwrap();
    assert_eq!(q.complete_weeks(d(2026, 12, 1)).len(), 13);
  }
}
