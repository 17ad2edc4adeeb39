pub mod board;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod ordering;
pub mod render;
pub mod snapshot;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use chrono::{
  NaiveDate,
  Utc
};
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use calendar::{
  MonthGrid,
  build_month_grid,
  tasks_due_on
};
pub use error::CoreError;
pub use ordering::{
  is_overdue,
  sort_for_display
};
pub use task::{
  Priority,
  Task
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args);
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daybook CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let now = Utc::now();
  let today = match cli.today.as_deref()
  {
    | Some(raw) => {
      NaiveDate::parse_from_str(
        raw.trim(),
        "%Y-%m-%d"
      )
      .with_context(|| {
        format!(
          "invalid --today date: {raw}"
        )
      })?
    }
    | None => {
      let tz = datetime::resolve_timezone(
        cfg.timezone()
      );
      datetime::today_in(tz, now)
    }
  };

  let tasks = match cli.tasks.as_deref() {
    | Some(path) => {
      snapshot::load_snapshot(path)
        .with_context(|| {
          format!(
            "failed to load task \
             snapshot {}",
            path.display()
          )
        })?
    }
    | None => {
      debug!(
        "no --tasks given; using sample \
         tasks"
      );
      board::sample_tasks(today, now)
    }
  };

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    commands::Session {
      tasks,
      today,
      now
    },
    &renderer,
    inv
  )?;

  info!("done");
  Ok(())
}
