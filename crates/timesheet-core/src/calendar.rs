//! Week and month arithmetic on plain calendar dates.
//!
//! Weeks start on Monday and week numbers follow ISO 8601 (week 1 holds
//! the first Thursday of the year). Two conventions sit on top of that,
//! kept as-is because stored timesheets are keyed on them:
//!
//! - `week_year` pairs a week number with the date's calendar year, not
//!   the ISO week-year.
//! - `week_range(n, year)` counts from the Monday on or before January
//!   1st. When January 1st is a Monday to Thursday that Monday opens ISO
//!   week 1 and the ranges match ISO weeks all year long. When it is a
//!   Friday, Saturday or Sunday (2021, 2022, 2023, 2027) the Monday still
//!   closes the previous year, so every `week_range(n, year)` of that
//!   year is ISO week `n - 1`.
//!
//! Anything starting from an actual date goes through
//! `WeekRange::containing` instead, which always yields the week holding
//! that date.
//!
//! Months are 0-indexed (`0` is January) across this module.

use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Weekday
};
use serde::Serialize;

use crate::clock::Clock;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize
)]
pub struct WeekId {
  pub week: u32,
  pub year: i32
}

impl WeekId {
  #[must_use]
  pub fn new(
    week: u32,
    year: i32
  ) -> Self {
    Self { week, year }
  }

}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
pub struct WeekRange {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl WeekRange {
  /// Monday through Sunday of the week.
  #[must_use]
  pub fn days(&self) -> [NaiveDate; 7] {
    week_days(self.start)
  }

  /// Monday-to-Sunday week holding `date`.
  #[must_use]
  pub fn containing(
    date: NaiveDate
  ) -> Self {
    Self {
      start: start_of_week(date),
      end:   end_of_week(date)
    }
  }

  #[must_use]
  pub fn shifted(
    self,
    weeks: i64
  ) -> Self {
    Self::containing(add_days(
      self.start,
      weeks.saturating_mul(7)
    ))
  }

  /// ISO week number with the calendar year of the week's Thursday,
  /// the same pairing the month grid uses.
  #[must_use]
  pub fn id(&self) -> WeekId {
    WeekId {
      week: week_number(self.start),
      year: add_days(self.start, 3)
        .year()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize
)]
pub struct MonthId {
  /// 0 = January, 11 = December.
  pub month: u32,
  pub year:  i32
}

impl MonthId {
  #[must_use]
  pub fn new(
    month: u32,
    year: i32
  ) -> Self {
    Self { month, year }
  }

  #[must_use]
  pub fn next(self) -> Self {
    next_month(self.month, self.year)
  }

  #[must_use]
  pub fn previous(self) -> Self {
    previous_month(self.month, self.year)
  }

  #[must_use]
  pub fn first_day(self) -> NaiveDate {
    first_day_of_month(
      self.month, self.year
    )
  }

  #[must_use]
  pub fn last_day(self) -> NaiveDate {
    last_day_of_month(
      self.month, self.year
    )
  }

  #[must_use]
  pub fn contains(
    self,
    date: NaiveDate
  ) -> bool {
    month_id(date) == self
  }
}

/// ISO 8601 week number, 1..=53.
#[must_use]
pub fn week_number(
  date: NaiveDate
) -> u32 {
  date.iso_week().week()
}

/// Year paired with `week_number(date)`.
///
/// This is the calendar year of `date`, not the ISO week-year, so the
/// last days of December that fall in week 1 report the old year and
/// the first days of January in week 52/53 report the new one. Use
/// `iso_week_year` when the strict pairing is needed.
#[must_use]
pub fn week_year(date: NaiveDate) -> i32 {
  date.year()
}

#[must_use]
pub fn iso_week_year(
  date: NaiveDate
) -> i32 {
  date.iso_week().year()
}

#[must_use]
pub fn week_id(date: NaiveDate) -> WeekId {
  WeekId {
    week: week_number(date),
    year: week_year(date)
  }
}

/// Seven-day range for `(week, year)`, counted from the Monday on or
/// before January 1st of `year`.
#[must_use]
pub fn week_range(
  week: u32,
  year: i32
) -> WeekRange {
  let calendar_start = start_of_week(
    first_day_of_month(0, year)
  );
  let start = add_days(
    calendar_start,
    (i64::from(week) - 1) * 7
  );
  WeekRange {
    start,
    end: add_days(start, 6)
  }
}

/// Range of ISO week `week` of ISO year `year`, if the year has it.
#[must_use]
pub fn iso_week_range(
  week: u32,
  year: i32
) -> Option<WeekRange> {
  NaiveDate::from_isoywd_opt(
    year,
    week,
    Weekday::Mon
  )
  .map(WeekRange::containing)
}

#[must_use]
pub fn next_week(
  week: u32,
  year: i32
) -> WeekId {
  shift_week(week, year, 7)
}

#[must_use]
pub fn previous_week(
  week: u32,
  year: i32
) -> WeekId {
  shift_week(week, year, -7)
}

fn shift_week(
  week: u32,
  year: i32,
  days: i64
) -> WeekId {
  let start =
    week_range(week, year).start;
  week_id(add_days(start, days))
}

#[must_use]
pub fn next_month(
  month: u32,
  year: i32
) -> MonthId {
  if month >= 11 {
    MonthId {
      month: 0,
      year:  year.saturating_add(1)
    }
  } else {
    MonthId {
      month: month + 1,
      year
    }
  }
}

#[must_use]
pub fn previous_month(
  month: u32,
  year: i32
) -> MonthId {
  if month == 0 {
    MonthId {
      month: 11,
      year:  year.saturating_sub(1)
    }
  } else {
    MonthId {
      month: month - 1,
      year
    }
  }
}

#[must_use]
pub fn month_id(date: NaiveDate) -> MonthId {
  MonthId {
    month: date.month0(),
    year:  date.year()
  }
}

#[tracing::instrument(skip(clock))]
pub fn current_week(
  clock: &impl Clock
) -> WeekId {
  let id = week_id(clock.today());
  tracing::debug!(
    week = id.week,
    year = id.year,
    "resolved current week"
  );
  id
}

#[tracing::instrument(skip(clock))]
pub fn current_month(
  clock: &impl Clock
) -> MonthId {
  month_id(clock.today())
}

/// Monday on or before `date`.
#[must_use]
pub fn start_of_week(
  date: NaiveDate
) -> NaiveDate {
  let offset = date
    .weekday()
    .num_days_from_monday();
  add_days(date, -i64::from(offset))
}

/// Sunday on or after `date`.
#[must_use]
pub fn end_of_week(
  date: NaiveDate
) -> NaiveDate {
  let offset = 6 - date
    .weekday()
    .num_days_from_monday();
  add_days(date, i64::from(offset))
}

#[must_use]
pub fn week_days(
  monday: NaiveDate
) -> [NaiveDate; 7] {
  let mut days = [monday; 7];
  for (idx, day) in
    days.iter_mut().enumerate()
  {
    *day = add_days(monday, idx as i64);
  }
  days
}

#[must_use]
pub fn first_day_of_month(
  month: u32,
  year: i32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year,
    month + 1,
    1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  month: u32,
  year: i32
) -> NaiveDate {
  let next = next_month(month, year);
  add_days(
    first_day_of_month(
      next.month, next.year
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  month: u32,
  year: i32
) -> u32 {
  last_day_of_month(month, year).day()
}

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

/// Shifts `date` by `days`, staying put at the edges of chrono's range.
pub(crate) fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}
