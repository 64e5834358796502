use std::fs;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tempfile::tempdir;
use timesheet_core::calendar::{WeekId, WeekRange, iso_week_range, next_week, previous_week, week_range};
use timesheet_core::classify::DayKind;
use timesheet_core::cli::{Command, MonthArgs, WeekArgs};
use timesheet_core::clock::FixedClock;
use timesheet_core::commands::{Session, build_month_view, build_week_view, dispatch};
use timesheet_core::config::Config;
use timesheet_core::month_grid::month_weeks;
use timesheet_core::records::RecordStore;
use timesheet_core::render::Renderer;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn plain_config() -> Config {
    let mut cfg = Config::default();
    cfg.apply_overrides([("color".to_string(), "off".to_string())]);
    cfg
}

fn run_command(session: &Session<'_, FixedClock>, command: Command) -> String {
    let mut buf = Vec::new();
    dispatch(session, command, &mut buf).expect("dispatch command");
    String::from_utf8(buf).expect("utf8 output")
}

#[test]
fn week_view_combines_generated_holidays_and_user_leave() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join("leaves.jsonl"),
        "{\"date\":\"2024-05-10\",\"userId\":\"alice\",\"type\":\"RTT\"}\n\
         {\"date\":\"2024-05-07\",\"userId\":\"bob\",\"type\":\"CP\"}\n",
    )
    .expect("write leaves");

    let cfg = plain_config();
    let store = RecordStore::open(&cfg, temp.path());
    let renderer = Renderer::new(&cfg, false);
    let clock = FixedClock::new(date(2024, 5, 8));
    let session = Session {
        cfg: &cfg,
        store: &store,
        renderer: &renderer,
        clock: &clock,
        user: Some("alice".to_string()),
    };

    // Week of Monday 2024-05-06: May 8 (Wednesday) and Ascension on May 9.
    let view = build_week_view(&session, WeekRange::containing(date(2024, 5, 8))).expect("week view");
    assert_eq!(view.range.start, date(2024, 5, 6));
    assert_eq!(view.week, WeekId::new(19, 2024));
    assert_eq!(view.label, "Week 19 (May 6 - May 12)");
    let kinds: Vec<&DayKind> = view.days.iter().map(|day| &day.kind).collect();
    assert_eq!(
        kinds,
        vec![
            &DayKind::WorkDay,
            &DayKind::WorkDay,
            &DayKind::Holiday("Victoire 1945".to_string()),
            &DayKind::Holiday("Ascension".to_string()),
            &DayKind::Leave("RTT".to_string()),
            &DayKind::Weekend,
            &DayKind::Weekend,
        ]
    );
    assert_eq!(view.expected_days, 2);
    assert_eq!(view.expected_hours, 14.0);

    let text = run_command(&session, Command::Week(WeekArgs::default()));
    assert!(text.starts_with("Week 19 (May 6 - May 12), 2024"));
    assert!(text.contains("holiday: Ascension"));
    assert!(text.contains("leave: RTT"));
    assert!(text.contains("expected: 2 days, 14.0 h"));
}

#[test]
fn month_command_uses_thursday_rule_and_offsets() {
    let temp = tempdir().expect("tempdir");
    let cfg = Config::default();
    let store = RecordStore::open(&cfg, temp.path());
    let renderer = Renderer::new(&cfg, true);
    let clock = FixedClock::new(date(2023, 12, 20));
    let session = Session {
        cfg: &cfg,
        store: &store,
        renderer: &renderer,
        clock: &clock,
        user: None,
    };

    let text = run_command(
        &session,
        Command::Month(MonthArgs {
            month: None,
            offset: 1,
            all: false,
        }),
    );
    let json: Value = serde_json::from_str(&text).expect("json output");
    assert_eq!(json["label"], "January 2024");
    assert_eq!(json["month"]["month"], 0);
    let starts: Vec<&str> = json["weeks"]
        .as_array()
        .expect("weeks array")
        .iter()
        .map(|week| week["week_start"].as_str().expect("week start"))
        .collect();
    assert_eq!(starts, vec!["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22"]);
    // 23 weekdays in January 2024 minus New Year's Day.
    assert_eq!(json["expected_days"], 22);

    let full = build_month_view(&session, timesheet_core::calendar::MonthId::new(0, 2024), true)
        .expect("full grid");
    assert_eq!(full.weeks.len(), 5);
    assert!(!full.weeks[4].week.belongs_to_month);
    assert_eq!(full.weeks[4].week.week_start, date(2024, 1, 29));
}

#[test]
fn holidays_and_easter_commands_print_generated_dates() {
    let temp = tempdir().expect("tempdir");
    let cfg = plain_config();
    let store = RecordStore::open(&cfg, temp.path());
    let renderer = Renderer::new(&cfg, false);
    let clock = FixedClock::new(date(2025, 6, 1));
    let session = Session {
        cfg: &cfg,
        store: &store,
        renderer: &renderer,
        clock: &clock,
        user: None,
    };

    let text = run_command(&session, Command::Holidays { year: None });
    assert!(text.starts_with("Public holidays 2025"));
    assert!(text.contains("2025-04-21 Mon Lundi de Pâques"));
    assert!(text.contains("2025-05-29 Thu Ascension"));
    assert!(text.contains("2025-06-09 Mon Lundi de Pentecôte"));

    let text = run_command(
        &session,
        Command::Easter {
            years: vec![2023, 2024],
        },
    );
    assert_eq!(text, "2023 2023-04-09\n2024 2024-03-31\n");

    let text = run_command(
        &session,
        Command::Day {
            date: "2025-07-14".to_string(),
        },
    );
    assert_eq!(text, "2025-07-14 Mon holiday: Fête nationale\n");
}

#[test]
fn week_command_shows_the_week_holding_the_date() {
    let temp = tempdir().expect("tempdir");
    let cfg = plain_config();
    let store = RecordStore::open(&cfg, temp.path());
    let renderer = Renderer::new(&cfg, false);
    // 2023 starts on a Sunday.
    let clock = FixedClock::new(date(2023, 3, 8));
    let session = Session {
        cfg: &cfg,
        store: &store,
        renderer: &renderer,
        clock: &clock,
        user: None,
    };

    let text = run_command(&session, Command::Week(WeekArgs::default()));
    assert!(text.starts_with("Week 10 (Mar 6 - Mar 12), 2023"));
    assert!(text.contains("2023-03-08"));

    let text = run_command(
        &session,
        Command::Week(WeekArgs {
            date: Some("2021-01-02".to_string()),
            ..WeekArgs::default()
        }),
    );
    assert!(text.starts_with("Week 53 (Dec 28 - Jan 3), 2020"));
    assert!(text.contains("2021-01-02"));

    let text = run_command(
        &session,
        Command::Week(WeekArgs {
            week: Some(52),
            year: Some(2024),
            offset: 2,
            ..WeekArgs::default()
        }),
    );
    assert!(text.starts_with("Week 2 (Jan 6 - Jan 12), 2025"));

    let text = run_command(
        &session,
        Command::Week(WeekArgs {
            offset: -10,
            ..WeekArgs::default()
        }),
    );
    assert!(text.starts_with("Week 52 (Dec 26 - Jan 1), 2022"));

    let mut buf = Vec::new();
    let err = dispatch(
        &session,
        Command::Week(WeekArgs {
            week: Some(53),
            year: Some(2024),
            ..WeekArgs::default()
        }),
        &mut buf,
    )
    .expect_err("2024 has 52 weeks");
    assert!(format!("{err:#}").contains("no week 53"));
}

#[test]
fn week_helpers_agree_with_month_grid() {
    // New Year on Monday (2024) through Sunday (2023).
    for year in [2024, 2019, 2020, 2026, 2021, 2022, 2023] {
        let late_new_year = date(year, 1, 1).weekday().number_from_monday() >= 5;
        for month in 0..12 {
            for week in month_weeks(month, year) {
                let range = WeekRange::containing(week.week_start);
                assert_eq!(range.end, week.week_end);
                assert_eq!(range.id(), WeekId::new(week.week_number, week.year));
                assert_eq!(iso_week_range(week.week_number, week.year), Some(range));

                if (2..=50).contains(&week.week_number) {
                    let anchored = week_range(week.week_number, year);
                    let expected = if late_new_year { range.shifted(-1) } else { range };
                    assert_eq!(anchored, expected, "week {} of {year}", week.week_number);
                }
            }
        }
    }
    assert_eq!(next_week(1, 2024), WeekId::new(2, 2024));
    assert_eq!(previous_week(2, 2024), WeekId::new(1, 2024));
}
