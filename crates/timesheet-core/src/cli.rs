use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "timesheet",
    version,
    about = "Timesheet calendar: ISO weeks, month grids, French public holidays",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Pretend today is this day (YYYY-MM-DD).
    #[arg(long = "today", global = true)]
    pub today: Option<String>,

    /// User whose leave is taken into account.
    #[arg(short = 'u', long = "user", global = true)]
    pub user: Option<String>,

    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show one week, Monday to Sunday.
    Week(WeekArgs),
    /// Show the weeks attributed to a month.
    Month(MonthArgs),
    /// Classify a single day.
    Day { date: String },
    /// List the public holidays of a year.
    Holidays { year: Option<i32> },
    /// Print Easter Sunday for each year.
    Easter { years: Vec<i32> },
    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WeekArgs {
    /// Any day inside the week (today, monday, +1w, 2024-05-13, ...).
    #[arg(conflicts_with_all = ["week", "year"])]
    pub date: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=53))]
    pub week: Option<u32>,

    #[arg(long)]
    pub year: Option<i32>,

    /// Weeks to step forward (negative steps back).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MonthArgs {
    /// Month as YYYY-MM; defaults to the current month.
    pub month: Option<String>,

    /// Months to step forward (negative steps back).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i64,

    /// Include the adjacent weeks that belong to other months.
    #[arg(long)]
    pub all: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};

    #[test]
    fn parses_week_by_number_with_global_flags() {
        let cli = GlobalCli::try_parse_from([
            "timesheet",
            "week",
            "--week",
            "3",
            "--year",
            "2024",
            "--offset",
            "-1",
            "--json",
            "--rc",
            "hours.per_day=8",
        ])
        .expect("parse cli");

        assert!(cli.json);
        assert_eq!(cli.rc_overrides[0].key, "hours.per_day");
        assert_eq!(cli.rc_overrides[0].value, "8");
        let Some(Command::Week(args)) = cli.command else {
            panic!("expected week command");
        };
        assert_eq!(args.week, Some(3));
        assert_eq!(args.year, Some(2024));
        assert_eq!(args.offset, -1);
    }

    #[test]
    fn rejects_week_out_of_range_and_date_with_number() {
        assert!(GlobalCli::try_parse_from(["timesheet", "week", "--week", "54", "--year", "2024"]).is_err());
        assert!(
            GlobalCli::try_parse_from(["timesheet", "week", "today", "--week", "3"]).is_err()
        );
    }

    #[test]
    fn parses_easter_years() {
        let cli = GlobalCli::try_parse_from(["timesheet", "easter", "2024", "2025"])
            .expect("parse cli");
        let Some(Command::Easter { years }) = cli.command else {
            panic!("expected easter command");
        };
        assert_eq!(years, vec![2024, 2025]);
    }
}
