use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "timesheet-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TIMESHEET_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TIMESHEET_TIME_CONFIG";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "Europe/Paris";

/// Source of "today" for the entry points that need it.
///
/// Calendar math never reads the wall clock itself; callers pass one of
/// these in instead.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate;
}

/// Wall clock, reporting dates in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  timezone: Tz
}

impl SystemClock {
  #[must_use]
  pub fn new(timezone: Tz) -> Self {
    Self { timezone }
  }

  #[must_use]
  pub fn project() -> Self {
    Self::new(*project_timezone())
  }
}

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn today(&self) -> NaiveDate {
    self
      .now()
      .with_timezone(&self.timezone)
      .date_naive()
  }
}

/// Clock frozen on one day, for tests and `--today`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
  today: NaiveDate
}

impl FixedClock {
  #[must_use]
  pub fn new(today: NaiveDate) -> Self {
    Self { today }
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self
      .today
      .and_hms_opt(12, 0, 0)
      .map(|noon| noon.and_utc())
      .unwrap_or_default()
  }

  fn today(&self) -> NaiveDate {
    self.today
  }
}

#[derive(Debug, Deserialize)]
struct TimezoneFile {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

impl TimezoneFile {
  fn timezone(self) -> Option<String> {
    self.timezone.or_else(|| {
      self.time.and_then(|section| {
        section.timezone
      })
    })
  }
}

/// Timezone used to turn timestamps into calendar days.
///
/// Resolved once per process: `$TIMESHEET_TIMEZONE`, then
/// `timesheet-time.toml`, then Europe/Paris.
pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(|| {
    resolve_timezone(
      std::env::var(TIMEZONE_ENV_VAR)
        .ok()
        .as_deref(),
      timezone_config_path().as_deref()
    )
  })
}

#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

#[tracing::instrument]
fn resolve_timezone(
  env_value: Option<&str>,
  config_file: Option<&Path>
) -> Tz {
  let from_env =
    env_value.and_then(|raw| {
      parse_timezone(
        raw,
        TIMEZONE_ENV_VAR
      )
    });
  if let Some(tz) = from_env {
    return tz;
  }

  if let Some(tz) = config_file
    .and_then(load_timezone_from_file)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "default"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let parsed = fs::read_to_string(path)
    .map_err(anyhow::Error::from)
    .and_then(|raw| {
      toml::from_str::<TimezoneFile>(
        &raw
      )
      .map_err(anyhow::Error::from)
    });

  let parsed = match parsed {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed loading timezone config file"
      );
      return None;
    }
  };

  let Some(timezone) =
    parsed.timezone()
  else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    &timezone,
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Parses a day given on the command line, relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(crate::calendar::add_days(
        today, 1
      ));
    }
    | "yesterday" => {
      return Ok(crate::calendar::add_days(
        today, -1
      ));
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    let days = if &caps["sign"] == "-" {
      -days
    } else {
      days
    };
    return today
      .checked_add_signed(
        Duration::days(days)
      )
      .ok_or_else(|| {
        anyhow!(
          "relative date out of \
           range: {input}"
        )
      });
  }

  parse_calendar_day(token)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized date: {input}"
      )
    })
    .with_context(|| {
      "supported formats: \
       today/tomorrow/yesterday, \
       weekday names (e.g. monday), \
       +Nd/-Nw, YYYY-MM-DD, RFC3339"
    })
}

/// Reduces a stored date or timestamp to its calendar day.
///
/// Timestamps carrying an offset are converted to the project timezone
/// first; naive timestamps keep their own date.
#[must_use]
pub fn parse_calendar_day(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Some(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(to_project_date(
      dt.with_timezone(&Utc)
    ));
  }

  for fmt in [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt.date());
    }
  }

  None
}

/// Parses `YYYY-MM` into a 0-indexed month.
pub fn parse_month_arg(
  input: &str
) -> anyhow::Result<crate::calendar::MonthId>
{
  let first = NaiveDate::parse_from_str(
    &format!("{}-01", input.trim()),
    "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid month {input}; \
       expected YYYY-MM"
    )
  })?;
  Ok(crate::calendar::month_id(first))
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  crate::calendar::add_days(from, delta)
}

/// Serde adapter for record dates: writes `YYYY-MM-DD`, reads anything
/// `parse_calendar_day` accepts.
pub mod date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &date
        .format("%Y-%m-%d")
        .to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_calendar_day(&raw)
      .ok_or_else(|| {
        serde::de::Error::custom(
          format!(
            "invalid date: {raw}"
          )
        )
      })
  }
}
