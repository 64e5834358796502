use std::io::Write;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::calendar::{self, MonthId, WeekId, WeekRange, iso_week_range};
use crate::classify::{DayKind, Holiday, LeaveDay, classify_day, expected_work_days};
use crate::cli::{Command, MonthArgs, WeekArgs};
use crate::clock::{Clock, date_serde, parse_date_arg, parse_month_arg};
use crate::config::Config;
use crate::holidays::{easter_sunday, generate_holidays};
use crate::month_grid::{MonthWeek, calendar_grid, month_weeks};
use crate::records::RecordStore;
use crate::render::{Renderer, month_label, week_label};

/// Everything a command needs besides its own arguments.
pub struct Session<'a, C: Clock> {
    pub cfg: &'a Config,
    pub store: &'a RecordStore,
    pub renderer: &'a Renderer,
    pub clock: &'a C,
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayEntry {
    #[serde(with = "date_serde")]
    pub date: NaiveDate,
    pub weekday: String,
    pub kind: DayKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekView {
    pub week: WeekId,
    pub range: WeekRange,
    pub label: String,
    pub user: Option<String>,
    pub days: Vec<DayEntry>,
    pub expected_days: usize,
    pub expected_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthWeekView {
    #[serde(flatten)]
    pub week: MonthWeek,
    pub label: String,
    pub entries: Vec<DayEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub month: MonthId,
    pub label: String,
    pub user: Option<String>,
    pub weeks: Vec<MonthWeekView>,
    pub expected_days: usize,
    pub expected_hours: f64,
}

#[instrument(skip(session, command, out))]
pub fn dispatch<C: Clock, W: Write>(
    session: &Session<'_, C>,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()> {
    debug!(?command, user = ?session.user, "dispatching command");

    match command {
        Command::Week(args) => cmd_week(session, &args, out),
        Command::Month(args) => cmd_month(session, &args, out),
        Command::Day { date } => cmd_day(session, &date, out),
        Command::Holidays { year } => cmd_holidays(session, year, out),
        Command::Easter { years } => cmd_easter(session, &years, out),
        Command::Config => session.renderer.write_config(out, session.cfg),
    }
}

#[instrument(skip(session, out))]
fn cmd_week<C: Clock, W: Write>(
    session: &Session<'_, C>,
    args: &WeekArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command week");

    let base = match (&args.date, args.week, args.year) {
        (Some(raw), _, _) => WeekRange::containing(parse_date_arg(raw, session.clock.today())?),
        (None, Some(week), Some(year)) => iso_week_range(week, year)
            .ok_or_else(|| anyhow!("{year} has no week {week}"))?,
        (None, None, None) => WeekRange::containing(session.clock.today()),
        _ => return Err(anyhow!("--week and --year must be given together")),
    };
    let range = base.shifted(args.offset);
    debug!(base = %base.start, target = %range.start, offset = args.offset, "resolved week");

    let view = build_week_view(session, range)?;
    session.renderer.write_week(out, &view)
}

#[instrument(skip(session, out))]
fn cmd_month<C: Clock, W: Write>(
    session: &Session<'_, C>,
    args: &MonthArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command month");

    let base = match &args.month {
        Some(raw) => parse_month_arg(raw)?,
        None => calendar::current_month(session.clock),
    };
    let id = step_months(base, args.offset);

    let view = build_month_view(session, id, args.all)?;
    session.renderer.write_month(out, &view)
}

#[instrument(skip(session, out))]
fn cmd_day<C: Clock, W: Write>(
    session: &Session<'_, C>,
    raw: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command day");

    let date = parse_date_arg(raw, session.clock.today())?;
    let holidays = session.store.holidays_for(date, date)?;
    let leaves = session.store.load_leaves()?;
    let entry = day_entry(date, session.user.as_deref(), &holidays, &leaves);
    session.renderer.write_day(out, &entry)
}

#[instrument(skip(session, out))]
fn cmd_holidays<C: Clock, W: Write>(
    session: &Session<'_, C>,
    year: Option<i32>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command holidays");

    let year = year.unwrap_or_else(|| calendar::current_month(session.clock).year);
    let holidays = generate_holidays(year);
    session.renderer.write_holidays(out, year, &holidays)
}

#[instrument(skip(session, out))]
fn cmd_easter<C: Clock, W: Write>(
    session: &Session<'_, C>,
    years: &[i32],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command easter");

    let years = if years.is_empty() {
        vec![calendar::current_month(session.clock).year]
    } else {
        years.to_vec()
    };
    let dates: Vec<(i32, NaiveDate)> =
        years.into_iter().map(|year| (year, easter_sunday(year))).collect();
    session.renderer.write_easter(out, &dates)
}

pub fn step_months(mut id: MonthId, offset: i64) -> MonthId {
    for _ in 0..offset.unsigned_abs() {
        id = if offset > 0 { id.next() } else { id.previous() };
    }
    id
}

#[instrument(skip(session))]
pub fn build_week_view<C: Clock>(
    session: &Session<'_, C>,
    range: WeekRange,
) -> anyhow::Result<WeekView> {
    let id = range.id();
    let user = session.user.as_deref();
    let holidays = session.store.holidays_for(range.start, range.end)?;
    let leaves = session.store.load_leaves()?;

    let days: Vec<DayEntry> = range
        .days()
        .into_iter()
        .map(|date| day_entry(date, user, &holidays, &leaves))
        .collect();
    let expected_days = expected_work_days(range.days(), user, &holidays, &leaves);

    Ok(WeekView {
        week: id,
        range,
        label: week_label(id, range),
        user: session.user.clone(),
        days,
        expected_days,
        expected_hours: expected_days as f64 * session.cfg.hours_per_day()?,
    })
}

#[instrument(skip(session))]
pub fn build_month_view<C: Clock>(
    session: &Session<'_, C>,
    id: MonthId,
    include_adjacent: bool,
) -> anyhow::Result<MonthView> {
    let weeks = if include_adjacent {
        calendar_grid(id.month, id.year)
    } else {
        month_weeks(id.month, id.year)
    };
    let (Some(first), Some(last)) = (weeks.first(), weeks.last()) else {
        return Err(anyhow!("no weeks for {}", month_label(id)));
    };

    let user = session.user.as_deref();
    let span_start = first.week_start.min(id.first_day());
    let span_end = last.week_end.max(id.last_day());
    let holidays = session.store.holidays_for(span_start, span_end)?;
    let leaves = session.store.load_leaves()?;

    let month_days = id.first_day().iter_days().take_while(|day| id.contains(*day));
    let expected_days = expected_work_days(month_days, user, &holidays, &leaves);

    let weeks = weeks
        .into_iter()
        .map(|week| {
            let label = week_label(
                WeekId::new(week.week_number, week.year),
                WeekRange {
                    start: week.week_start,
                    end: week.week_end,
                },
            );
            let entries = week
                .days
                .iter()
                .map(|date| day_entry(*date, user, &holidays, &leaves))
                .collect();
            MonthWeekView {
                week,
                label,
                entries,
            }
        })
        .collect();

    Ok(MonthView {
        month: id,
        label: month_label(id),
        user: session.user.clone(),
        weeks,
        expected_days,
        expected_hours: expected_days as f64 * session.cfg.hours_per_day()?,
    })
}

fn day_entry(
    date: NaiveDate,
    user: Option<&str>,
    holidays: &[Holiday],
    leaves: &[LeaveDay],
) -> DayEntry {
    DayEntry {
        date,
        weekday: date.format("%a").to_string(),
        kind: classify_day(date, user, holidays, leaves),
    }
}
