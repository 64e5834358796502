use chrono::{
  Datelike,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};

use crate::calendar::is_weekend;
use crate::clock::date_serde;

/// Public holiday. `year` always mirrors `date`.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(from = "HolidayRecord")]
pub struct Holiday {
  #[serde(with = "date_serde")]
  pub date: NaiveDate,
  pub name: String,
  pub year: i32
}

#[derive(Debug, Deserialize)]
struct HolidayRecord {
  #[serde(with = "date_serde")]
  date: NaiveDate,
  #[serde(default)]
  name: String
}

impl From<HolidayRecord> for Holiday {
  fn from(record: HolidayRecord) -> Self {
    Self::new(record.date, record.name)
  }
}

impl Holiday {
  pub fn new(
    date: NaiveDate,
    name: impl Into<String>
  ) -> Self {
    Self {
      date,
      name: name.into(),
      year: date.year()
    }
  }
}

/// Approved leave for one user on one day.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct LeaveDay {
  #[serde(with = "date_serde")]
  pub date:       NaiveDate,
  #[serde(alias = "userId")]
  pub user_id:    String,
  #[serde(rename = "type", default)]
  pub leave_type: String
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum DayKind {
  Weekend,
  Holiday(String),
  Leave(String),
  WorkDay
}

impl DayKind {
  #[must_use]
  pub fn is_billable(&self) -> bool {
    matches!(self, Self::WorkDay)
  }
}

#[must_use]
pub fn is_holiday(
  date: NaiveDate,
  holidays: &[Holiday]
) -> bool {
  holiday_on(date, holidays).is_some()
}

#[must_use]
pub fn holiday_on<'a>(
  date: NaiveDate,
  holidays: &'a [Holiday]
) -> Option<&'a Holiday> {
  holidays
    .iter()
    .find(|holiday| holiday.date == date)
}

#[must_use]
pub fn is_leave_day(
  date: NaiveDate,
  user_id: &str,
  leaves: &[LeaveDay]
) -> bool {
  leave_on(date, user_id, leaves)
    .is_some()
}

#[must_use]
pub fn leave_on<'a>(
  date: NaiveDate,
  user_id: &str,
  leaves: &'a [LeaveDay]
) -> Option<&'a LeaveDay> {
  leaves.iter().find(|leave| {
    leave.date == date
      && leave.user_id == user_id
  })
}

/// False on Saturday and Sunday only. Holidays are not consulted.
#[must_use]
pub fn is_work_day(
  date: NaiveDate
) -> bool {
  !is_weekend(date)
}

/// Weekend beats holiday, holiday beats leave.
#[must_use]
pub fn classify_day(
  date: NaiveDate,
  user_id: Option<&str>,
  holidays: &[Holiday],
  leaves: &[LeaveDay]
) -> DayKind {
  if !is_work_day(date) {
    return DayKind::Weekend;
  }
  if let Some(holiday) =
    holiday_on(date, holidays)
  {
    return DayKind::Holiday(
      holiday.name.clone()
    );
  }
  if let Some(leave) =
    user_id.and_then(|user| {
      leave_on(date, user, leaves)
    })
  {
    return DayKind::Leave(
      leave.leave_type.clone()
    );
  }
  DayKind::WorkDay
}

/// Number of days the user is expected to log hours for.
pub fn expected_work_days<I>(
  days: I,
  user_id: Option<&str>,
  holidays: &[Holiday],
  leaves: &[LeaveDay]
) -> usize
where
  I: IntoIterator<Item = NaiveDate>
{
  days
    .into_iter()
    .filter(|day| {
      classify_day(
        *day, user_id, holidays, leaves
      )
      .is_billable()
    })
    .count()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::calendar::week_range;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn leave(
    d: NaiveDate,
    user: &str
  ) -> LeaveDay {
    LeaveDay {
      date:       d,
      user_id:    user.to_string(),
      leave_type: "CP".to_string()
    }
  }

  #[test]
  fn work_day_is_monday_to_friday() {
    // 2024-05-13 is a Monday.
    let monday = date(2024, 5, 13);
    let flags: Vec<bool> = week_range(20, 2024)
      .days()
      .into_iter()
      .map(is_work_day)
      .collect();
    assert_eq!(
      week_range(20, 2024).start,
      monday
    );
    assert_eq!(flags, vec![
      true, true, true, true, true, false,
      false
    ]);
  }

  #[test]
  fn holiday_on_weekday_is_still_a_work_day() {
    let may_day = date(2024, 5, 1);
    let holidays =
      vec![Holiday::new(may_day, "Fête du Travail")];
    assert!(is_holiday(may_day, &holidays));
    assert!(is_work_day(may_day));
    assert!(!is_holiday(
      date(2024, 5, 2),
      &holidays
    ));
  }

  #[test]
  fn leave_matches_user_and_day() {
    let day = date(2024, 7, 16);
    let leaves = vec![leave(day, "alice")];
    assert!(is_leave_day(
      day, "alice", &leaves
    ));
    assert!(!is_leave_day(day, "bob", &leaves));
    assert!(!is_leave_day(
      date(2024, 7, 17),
      "alice",
      &leaves
    ));
  }

  #[test]
  fn classification_precedence() {
    let bastille = date(2024, 7, 14);
    let holidays = vec![
      Holiday::new(bastille, "Fête nationale"),
      Holiday::new(
        date(2024, 8, 15),
        "Assomption"
      ),
    ];
    let leaves = vec![
      leave(date(2024, 8, 15), "alice"),
      leave(date(2024, 8, 16), "alice"),
    ];

    // Bastille Day 2024 is a Sunday.
    assert_eq!(
      classify_day(
        bastille,
        Some("alice"),
        &holidays,
        &leaves
      ),
      DayKind::Weekend
    );
    assert_eq!(
      classify_day(
        date(2024, 8, 15),
        Some("alice"),
        &holidays,
        &leaves
      ),
      DayKind::Holiday(
        "Assomption".to_string()
      )
    );
    assert_eq!(
      classify_day(
        date(2024, 8, 16),
        Some("alice"),
        &holidays,
        &leaves
      ),
      DayKind::Leave("CP".to_string())
    );
    assert_eq!(
      classify_day(
        date(2024, 8, 16),
        None,
        &holidays,
        &leaves
      ),
      DayKind::WorkDay
    );
  }

  #[test]
  fn expected_days_skip_holidays_and_leave() {
    // Week of 2024-08-12: Thursday 15th is Assomption, Friday on leave.
    let holidays = vec![Holiday::new(
      date(2024, 8, 15),
      "Assomption"
    )];
    let leaves =
      vec![leave(date(2024, 8, 16), "alice")];
    let days = week_range(33, 2024).days();
    assert_eq!(days[0], date(2024, 8, 12));
    assert_eq!(
      expected_work_days(
        days,
        Some("alice"),
        &holidays,
        &leaves
      ),
      3
    );
    assert_eq!(
      expected_work_days(
        days, None, &holidays, &leaves
      ),
      4
    );
  }

  #[test]
  fn holiday_year_is_derived_from_date() {
    let parsed: Holiday = serde_json::from_str(
      r#"{"date":"2025-12-25","name":"Noël","year":1999}"#,
    )
    .expect("parse holiday");
    assert_eq!(parsed.year, 2025);
    assert_eq!(parsed.date, date(2025, 12, 25));
  }

  #[test]
  fn leave_accepts_camel_case_user_and_timestamp() {
    let parsed: LeaveDay = serde_json::from_str(
      r#"{"date":"2024-03-04 00:00:00","userId":"u1","type":"RTT"}"#,
    )
    .expect("parse leave");
    assert_eq!(parsed.date, date(2024, 3, 4));
    assert_eq!(parsed.user_id, "u1");
    assert_eq!(parsed.leave_type, "RTT");
  }
}
