//! Month-as-weeks grid.
//!
//! A week is attributed to the month holding its Thursday, so each
//! Monday-to-Sunday week belongs to exactly one month and the grid never
//! shows clipped weeks.

use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;

use crate::calendar::{
  add_days,
  end_of_week,
  first_day_of_month,
  last_day_of_month,
  start_of_week,
  week_days,
  week_number
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthWeek {
  pub week_number:      u32,
  /// Calendar year of the week's Thursday.
  pub year:             i32,
  pub days:             [NaiveDate; 7],
  pub week_start:       NaiveDate,
  pub week_end:         NaiveDate,
  pub belongs_to_month: bool
}

impl MonthWeek {
  fn build(
    monday: NaiveDate,
    month: u32,
    year: i32
  ) -> Self {
    let thursday = add_days(monday, 3);
    let belongs_to_month = thursday
      .month0()
      == month
      && thursday.year() == year;

    Self {
      week_number: week_number(monday),
      year: thursday.year(),
      days: week_days(monday),
      week_start: monday,
      week_end: add_days(monday, 6),
      belongs_to_month
    }
  }

  #[must_use]
  pub fn thursday(&self) -> NaiveDate {
    self.days[3]
  }
}

/// Every whole week touching the month, flagged with
/// `belongs_to_month`. `month` is 0-indexed.
#[tracing::instrument]
pub fn calendar_grid(
  month: u32,
  year: i32
) -> Vec<MonthWeek> {
  let calendar_start = start_of_week(
    first_day_of_month(month, year)
  );
  let calendar_end = end_of_week(
    last_day_of_month(month, year)
  );

  let mut weeks = Vec::with_capacity(6);
  let mut monday = calendar_start;
  while monday <= calendar_end {
    weeks.push(MonthWeek::build(
      monday, month, year
    ));
    let next = add_days(monday, 7);
    if next == monday {
      break;
    }
    monday = next;
  }

  tracing::trace!(
    weeks = weeks.len(),
    "built calendar grid"
  );
  weeks
}

/// Weeks whose Thursday falls in `(month, year)`, in chronological
/// order. `month` is 0-indexed.
#[must_use]
pub fn month_weeks(
  month: u32,
  year: i32
) -> Vec<MonthWeek> {
  calendar_grid(month, year)
    .into_iter()
    .filter(|week| week.belongs_to_month)
    .collect()
}
