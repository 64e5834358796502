use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{MonthId, WeekId, WeekRange};
use crate::classify::{DayKind, Holiday};
use crate::commands::{DayEntry, MonthView, WeekView};
use crate::config::Config;

/// "Week 3 (Jan 15 - Jan 21)"
pub fn week_label(id: WeekId, range: WeekRange) -> String {
    format!(
        "Week {} ({} - {})",
        id.week,
        range.start.format("%b %-d"),
        range.end.format("%b %-d")
    )
}

/// "January 2024"
pub fn month_label(id: MonthId) -> String {
    id.first_day().format("%B %Y").to_string()
}

pub fn kind_label(kind: &DayKind) -> String {
    match kind {
        DayKind::Weekend => "weekend".to_string(),
        DayKind::Holiday(name) => format!("holiday: {name}"),
        DayKind::Leave(leave_type) if leave_type.is_empty() => "leave".to_string(),
        DayKind::Leave(leave_type) => format!("leave: {leave_type}"),
        DayKind::WorkDay => "work day".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    json: bool,
}

impl Renderer {
    pub fn new(cfg: &Config, json: bool) -> Self {
        let color = cfg.get_bool("color").unwrap_or(true);
        Self { color, json }
    }

    #[tracing::instrument(skip(self, out, view), fields(week = view.week.week, year = view.week.year))]
    pub fn write_week<W: Write>(&self, out: &mut W, view: &WeekView) -> anyhow::Result<()> {
        if self.json {
            return write_json(out, view);
        }

        writeln!(out, "{}, {}", view.label, view.week.year)?;
        writeln!(out)?;
        self.write_days(out, &view.days)?;
        writeln!(out)?;
        writeln!(
            out,
            "expected: {} days, {:.1} h",
            view.expected_days, view.expected_hours
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, view), fields(month = view.month.month, year = view.month.year))]
    pub fn write_month<W: Write>(&self, out: &mut W, view: &MonthView) -> anyhow::Result<()> {
        if self.json {
            return write_json(out, view);
        }

        writeln!(out, "{}", view.label)?;
        writeln!(out)?;

        let headers = ["Week", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun", "Days"]
            .map(str::to_string)
            .to_vec();
        let mut rows = Vec::with_capacity(view.weeks.len());
        for week in &view.weeks {
            let marker = if week.week.belongs_to_month { "" } else { "*" };
            let mut row = vec![format!("{}{}", week.week.week_number, marker)];
            for entry in &week.entries {
                row.push(self.paint_day(entry, &entry.date.format("%d").to_string()));
            }
            let billable = week.entries.iter().filter(|e| e.kind.is_billable()).count();
            row.push(billable.to_string());
            rows.push(row);
        }
        write_table(&mut *out, headers, rows)?;

        writeln!(out)?;
        if view.weeks.iter().any(|week| !week.week.belongs_to_month) {
            writeln!(out, "* week belongs to an adjacent month")?;
        }
        writeln!(
            out,
            "expected: {} days, {:.1} h",
            view.expected_days, view.expected_hours
        )?;
        Ok(())
    }

    pub fn write_day<W: Write>(&self, out: &mut W, entry: &DayEntry) -> anyhow::Result<()> {
        if self.json {
            return write_json(out, entry);
        }
        writeln!(
            out,
            "{} {} {}",
            entry.date.format("%Y-%m-%d"),
            entry.weekday,
            self.paint_day(entry, &kind_label(&entry.kind))
        )?;
        Ok(())
    }

    pub fn write_holidays<W: Write>(
        &self,
        out: &mut W,
        year: i32,
        holidays: &[Holiday],
    ) -> anyhow::Result<()> {
        if self.json {
            return write_json(out, holidays);
        }

        writeln!(out, "Public holidays {year}")?;
        writeln!(out)?;
        let headers = vec!["Date".to_string(), "Day".to_string(), "Name".to_string()];
        let rows = holidays
            .iter()
            .map(|holiday| {
                vec![
                    holiday.date.format("%Y-%m-%d").to_string(),
                    holiday.date.format("%a").to_string(),
                    holiday.name.clone(),
                ]
            })
            .collect();
        write_table(out, headers, rows)
    }

    pub fn write_easter<W: Write>(
        &self,
        out: &mut W,
        dates: &[(i32, NaiveDate)],
    ) -> anyhow::Result<()> {
        if self.json {
            #[derive(Serialize)]
            struct EasterRow {
                year: i32,
                easter: NaiveDate,
            }
            let rows: Vec<EasterRow> = dates
                .iter()
                .map(|(year, easter)| EasterRow {
                    year: *year,
                    easter: *easter,
                })
                .collect();
            return write_json(out, &rows);
        }

        for (year, easter) in dates {
            writeln!(out, "{year} {}", easter.format("%Y-%m-%d"))?;
        }
        Ok(())
    }

    pub fn write_config<W: Write>(&self, out: &mut W, cfg: &Config) -> anyhow::Result<()> {
        let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
        entries.sort();

        if self.json {
            let map: std::collections::BTreeMap<&String, &String> = entries.into_iter().collect();
            return write_json(out, &map);
        }

        for file in &cfg.loaded_files {
            writeln!(out, "# {}", file.display())?;
        }
        for (key, value) in entries {
            writeln!(out, "{key} = {value}")?;
        }
        Ok(())
    }

    fn write_days<W: Write>(&self, out: &mut W, days: &[DayEntry]) -> anyhow::Result<()> {
        let headers = vec!["Date".to_string(), "Day".to_string(), "Status".to_string()];
        let rows = days
            .iter()
            .map(|entry| {
                vec![
                    entry.date.format("%Y-%m-%d").to_string(),
                    entry.weekday.clone(),
                    self.paint_day(entry, &kind_label(&entry.kind)),
                ]
            })
            .collect();
        write_table(out, headers, rows)
    }

    fn paint_day(&self, entry: &DayEntry, text: &str) -> String {
        match entry.kind {
            DayKind::Weekend => self.paint(text, "2"),
            DayKind::Holiday(_) => self.paint(text, "31"),
            DayKind::Leave(_) => self.paint(text, "33"),
            DayKind::WorkDay => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect();
    writeln!(writer, "{}", header_line.join(" ").trim_end())?;

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(writer, "{}", rule.join(" "))?;

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible_width)))
            })
            .collect();
        writeln!(writer, "{}", cells.join(" ").trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Renderer, kind_label, month_label, strip_ansi, week_label, write_table};
    use crate::calendar::{MonthId, WeekId, week_range};
    use crate::classify::DayKind;
    use crate::config::Config;

    fn color_for(setting: &str) -> bool {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), setting.to_string())]);
        Renderer::new(&cfg, false).color
    }

    #[test]
    fn color_setting_reads_config_booleans() {
        assert!(Renderer::new(&Config::default(), false).color);
        assert!(color_for("yes"));
        assert!(color_for("On"));
        assert!(!color_for("off"));
        assert!(!color_for("0"));
    }

    #[test]
    fn labels() {
        assert_eq!(
            week_label(WeekId::new(3, 2024), week_range(3, 2024)),
            "Week 3 (Jan 15 - Jan 21)"
        );
        assert_eq!(month_label(MonthId::new(0, 2024)), "January 2024");
        assert_eq!(month_label(MonthId::new(11, 2023)), "December 2023");
        assert_eq!(kind_label(&DayKind::Holiday("Noël".to_string())), "holiday: Noël");
        assert_eq!(kind_label(&DayKind::Leave(String::new())), "leave");
    }

    #[test]
    fn table_aligns_on_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["Date".to_string(), "Name".to_string()],
            vec![
                vec!["\x1b[31m01\x1b[0m".to_string(), "Noël".to_string()],
                vec!["15".to_string(), "Fête nationale".to_string()],
            ],
        )
        .expect("write table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date Name");
        assert_eq!(lines[1], "---- --------------");
        assert_eq!(strip_ansi(lines[2]), "01   Noël");
        assert_eq!(lines[3], "15   Fête nationale");
    }
}
