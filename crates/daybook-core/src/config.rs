//! `~/.daybookrc`: one `key = value` per
//! line, `#` starts a comment. daybook
//! reads three keys; anything else is
//! kept but logged as unknown.

use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  warn
};

const RC_ENV_VAR: &str = "DAYBOOKRC";
const RC_FILE_NAME: &str = ".daybookrc";

const KEY_DEFAULT_COMMAND: &str =
  "default.command";
const KEY_COLOR: &str = "color";
const KEY_TIMEZONE: &str = "timezone";
const KNOWN_KEYS: [&str; 3] = [
  KEY_DEFAULT_COMMAND,
  KEY_COLOR,
  KEY_TIMEZONE
];

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>
}

impl Default for Config {
  fn default() -> Self {
    let map = [
      (KEY_DEFAULT_COMMAND, "list"),
      (KEY_COLOR, "on")
    ]
    .into_iter()
    .map(|(k, v)| {
      (k.to_string(), v.to_string())
    })
    .collect();
    Self { map }
  }
}

impl Config {
  /// Defaults merged with the rc file
  /// named by `--config`, `DAYBOOKRC`
  /// (`/dev/null` disables it) or
  /// `~/.daybookrc`, first hit wins.
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let Some(path) =
      resolve_rc_path(rc_override)
    else {
      debug!(
        "no daybookrc found; using \
         defaults"
      );
      return Ok(cfg);
    };

    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    cfg.merge_rc(&text, &path)?;
    info!(
      rc = %path.display(),
      keys = cfg.map.len(),
      "loaded daybookrc"
    );
    Ok(cfg)
  }

  /// Applies `rc.key=value` style
  /// overrides; the `rc.` prefix is
  /// optional.
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.set(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<&str> {
    self.map.get(key).map(String::as_str)
  }

  pub fn default_command(&self) -> &str {
    self
      .get(KEY_DEFAULT_COMMAND)
      .filter(|cmd| !cmd.is_empty())
      .unwrap_or("list")
  }

  pub fn timezone(&self) -> Option<&str> {
    self
      .get(KEY_TIMEZONE)
      .filter(|tz| !tz.is_empty())
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let raw =
      self.get(KEY_COLOR).unwrap_or("on");
    match raw
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        Ok(true)
      }
      | "off" | "no" | "false" | "0" => {
        Ok(false)
      }
      | other => {
        Err(anyhow!(
          "invalid color setting: \
           {other}"
        ))
      }
    }
  }

  fn set(
    &mut self,
    key: String,
    value: String
  ) {
    if !KNOWN_KEYS
      .contains(&key.as_str())
    {
      warn!(key = %key, "unknown daybookrc key");
    }
    self.map.insert(key, value);
  }

  fn merge_rc(
    &mut self,
    text: &str,
    path: &Path
  ) -> anyhow::Result<()> {
    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map_or(raw_line, |(before, _)| {
          before
        })
        .trim();
      if line.is_empty() {
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            idx + 1,
            raw_line
          )
        })?;
      self.set(
        k.trim().to_string(),
        v.trim().to_string()
      );
    }

    Ok(())
  }
}

fn resolve_rc_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    return (rc_env != "/dev/null")
      .then(|| PathBuf::from(rc_env));
  }

  let home = dirs::home_dir()?;
  let candidate = home.join(RC_FILE_NAME);
  candidate.exists().then_some(candidate)
}
