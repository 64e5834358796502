pub mod calendar;
pub mod classify;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod holidays;
pub mod month_grid;
pub mod records;
pub mod render;

use std::ffi::OsString;
use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::clock::{
  Clock,
  FixedClock,
  SystemClock
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting timesheet CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;
  let store =
    records::RecordStore::open(
      &cfg, &data_dir
    );
  let renderer =
    render::Renderer::new(
      &cfg, cli.json
    );

  let user = cli
    .user
    .or_else(|| cfg.get("default.user"));
  let command = cli.command.unwrap_or(
    cli::Command::Week(
      cli::WeekArgs::default()
    )
  );
  debug!(?command, ?user, "resolved invocation");

  let mut out = std::io::stdout().lock();
  match cli.today {
    | Some(raw) => {
      let today =
        clock::parse_calendar_day(&raw)
          .with_context(|| {
            format!(
              "invalid --today value: \
               {raw}"
            )
          })?;
      execute(
        &cfg,
        &store,
        &renderer,
        &FixedClock::new(today),
        user,
        command,
        &mut out
      )?;
    }
    | None => {
      execute(
        &cfg,
        &store,
        &renderer,
        &SystemClock::project(),
        user,
        command,
        &mut out
      )?;
    }
  }
  out.flush()?;

  info!("done");
  Ok(())
}

fn execute<C: Clock, W: Write>(
  cfg: &config::Config,
  store: &records::RecordStore,
  renderer: &render::Renderer,
  clock: &C,
  user: Option<String>,
  command: cli::Command,
  out: &mut W
) -> anyhow::Result<()> {
  let session = commands::Session {
    cfg,
    store,
    renderer,
    clock,
    user
  };
  commands::dispatch(
    &session, command, out
  )
}
