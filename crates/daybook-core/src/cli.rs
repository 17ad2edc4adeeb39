use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

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
    name = "daybook",
    version,
    about = "Daybook: tasks with due dates and a month calendar",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// JSON Lines task snapshot; `-` reads stdin.
    #[arg(long = "tasks")]
    pub tasks: Option<PathBuf>,

    /// Reference date (YYYY-MM-DD) used instead of the clock.
    #[arg(long = "today")]
    pub today: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

/// Filter used when `RUST_LOG` is unset. `-q` wins over `-v`.
fn default_log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let level = default_log_level(verbose, quiet);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    // Tests and embedders may already have a subscriber installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
    Ok(())
}

/// Moves positional `rc.KEY=VALUE` (or `rc.KEY:VALUE`) words out of the
/// argument list so clap never sees them. The program name is kept as is.
#[tracing::instrument(skip_all, fields(count = raw.len()))]
pub fn preprocess_args(raw: &[OsString]) -> PreprocessedArgs {
    let mut cleaned_args = Vec::with_capacity(raw.len());
    let mut rc_overrides = Vec::new();

    for (idx, arg) in raw.iter().enumerate() {
        let parsed = if idx == 0 {
            None
        } else {
            arg.to_str().and_then(parse_rc_word)
        };

        match parsed {
            Some((key, value)) => {
                debug!(key = %key, value = %value, "captured positional rc override");
                rc_overrides.push((key, value));
            }
            None => cleaned_args.push(arg.clone()),
        }
    }

    PreprocessedArgs {
        cleaned_args,
        rc_overrides,
    }
}

fn parse_rc_word(word: &str) -> Option<(String, String)> {
    let rest = word.strip_prefix("rc.")?;
    let (key, value) = rest.split_once(['=', ':'])?;
    if key.trim().is_empty() {
        return None;
    }
    Some((key.trim().to_string(), value.trim().to_string()))
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list", "overdue", "calendar", "day", "add", "modify", "toggle", "done", "delete",
        "export", "help", "version",
    ]
}

/// Resolves an exact name or an unambiguous prefix of one.
pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let Some((first, args)) = tokens.split_first() else {
            let cmd = cfg.default_command().to_string();
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                command_args: vec![],
            });
        };

        let known = known_command_names();
        let command = expand_command_abbrev(first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            command_args: args.to_vec(),
        })
    }
}
