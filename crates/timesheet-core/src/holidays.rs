//! French public holidays.

use chrono::{
  Datelike,
  NaiveDate
};

use crate::calendar::add_days;
use crate::classify::Holiday;

/// (month, day, name)
const FIXED_HOLIDAYS: [(u32, u32, &str); 8] = [
  (1, 1, "Jour de l'an"),
  (5, 1, "Fête du Travail"),
  (5, 8, "Victoire 1945"),
  (7, 14, "Fête nationale"),
  (8, 15, "Assomption"),
  (11, 1, "Toussaint"),
  (11, 11, "Armistice 1918"),
  (12, 25, "Noël")
];

/// (days after Easter Sunday, name)
const EASTER_HOLIDAYS: [(i64, &str); 3] = [
  (1, "Lundi de Pâques"),
  (39, "Ascension"),
  (50, "Lundi de Pentecôte")
];

/// Easter Sunday in the Gregorian calendar (Meeus/Jones/Butcher).
#[must_use]
pub fn easter_sunday(year: i32) -> NaiveDate {
  let a = year % 19;
  let b = year / 100;
  let c = year % 100;
  let d = b / 4;
  let e = b % 4;
  let f = (b + 8) / 25;
  let g = (b - f + 1) / 3;
  let h = (19 * a + b - d - g + 15) % 30;
  let i = c / 4;
  let k = c % 4;
  let l = (32 + 2 * e + 2 * i - h - k) % 7;
  let m = (a + 11 * h + 22 * l) / 451;
  let month = (h + l - 7 * m + 114) / 31;
  let day = (h + l - 7 * m + 114) % 31 + 1;

  NaiveDate::from_ymd_opt(
    year,
    month as u32,
    day as u32
  )
  .unwrap_or(NaiveDate::MIN)
}

/// The eleven public holidays of `year`, sorted by date.
///
/// Ascension can land on May 1st or May 8th (2008 did); both entries
/// are returned and de-duplication is left to whoever stores them.
#[tracing::instrument]
pub fn generate_holidays(
  year: i32
) -> Vec<Holiday> {
  let easter = easter_sunday(year);

  let fixed = FIXED_HOLIDAYS
    .iter()
    .filter_map(|(month, day, name)| {
      NaiveDate::from_ymd_opt(
        year, *month, *day
      )
      .map(|date| Holiday::new(date, *name))
    });
  let movable = EASTER_HOLIDAYS
    .iter()
    .map(|(offset, name)| {
      Holiday::new(
        add_days(easter, *offset),
        *name
      )
    });

  let mut holidays: Vec<Holiday> =
    fixed.chain(movable).collect();
  holidays.sort_by_key(|holiday| holiday.date);

  tracing::debug!(
    %easter,
    count = holidays.len(),
    "generated public holidays"
  );
  holidays
}

/// Generated holidays falling within `[start, end]`.
#[must_use]
pub fn holidays_between(
  start: NaiveDate,
  end: NaiveDate
) -> Vec<Holiday> {
  if end < start {
    return vec![];
  }
  (start.year()..=end.year())
    .flat_map(generate_holidays)
    .filter(|holiday| {
      holiday.date >= start
        && holiday.date <= end
    })
    .collect()
}
