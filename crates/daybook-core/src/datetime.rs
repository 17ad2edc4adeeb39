use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::calendar::YearMonth;

const TIMEZONE_ENV_VAR: &str =
  "DAYBOOK_TIMEZONE";

/// Resolves the zone used to decide what
/// "today" is: `DAYBOOK_TIMEZONE`, then
/// the rc `timezone` key, then UTC. An
/// unparsable source is logged and
/// skipped.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  let from_env =
    std::env::var(TIMEZONE_ENV_VAR).ok();
  let sources = [
    (TIMEZONE_ENV_VAR, from_env.as_deref()),
    ("rc.timezone", configured)
  ];

  sources
    .into_iter()
    .find_map(|(source, raw)| {
      parse_timezone(raw?, source)
    })
    .unwrap_or_else(|| {
      tracing::debug!(
        "no timezone configured; using UTC"
      );
      chrono_tz::UTC
    })
}

#[must_use]
pub fn today_in(
  tz: Tz,
  now: DateTime<Utc>
) -> NaiveDate {
  now.with_timezone(&tz).date_naive()
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "using timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "ignoring unknown timezone"
      );
      None
    }
  }
}

/// Parses a calendar date relative to
/// `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return add_days(today, 1);
    }
    | "yesterday" => {
      return add_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let days = match unit {
      | "d" => num,
      | "w" => num.saturating_mul(7),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return add_days(
      today,
      if sign == "-" { -days } else { days }
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, weekday \
     names (e.g. monday), +Nd/-Nd, \
     +Nw/-Nw, YYYY-MM-DD"
  })
}

/// Parses a month selection for the
/// calendar view relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_month_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<YearMonth> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let current = YearMonth::of(today);

  let shift = match lower.as_str() {
    | "" | "this" | "current" => {
      Some(0)
    }
    | "next" => Some(1),
    | "prev" | "previous" | "last" => {
      Some(-1)
    }
    | _ => {
      if let Some(rest) =
        lower.strip_prefix('+')
      {
        Some(rest.parse::<i32>().with_context(
          || format!("invalid month offset: {input}")
        )?)
      } else if let Some(rest) =
        lower.strip_prefix('-')
      {
        Some(-rest.parse::<i32>().with_context(
          || format!("invalid month offset: {input}")
        )?)
      } else {
        None
      }
    }
  };

  if let Some(months) = shift {
    return Ok(current.shift(months)?);
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    return Ok(YearMonth::new(
      current.year(),
      month
    )?);
  }

  if let Some((year, month)) =
    token.split_once('-')
  {
    let year: i32 = year
      .parse()
      .with_context(|| {
        format!(
          "invalid year in month \
           expression: {input}"
        )
      })?;
    let month: u32 = month
      .parse()
      .with_context(|| {
        format!(
          "invalid month in month \
           expression: {input}"
        )
      })?;
    return Ok(YearMonth::new(
      year, month
    )?);
  }

  Err(anyhow!(
    "unrecognized month expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: YYYY-MM, month \
     names (e.g. march), next/prev, \
     +N/-N"
  })
}

fn add_days(
  date: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {date} \
         {days:+} days"
      )
    })
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
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}


pub mod compact_utc_serde {
  use chrono::{
    DateTime,
    NaiveDateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  const FORMAT: &str = "%Y%m%dT%H%M%SZ";

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt.format(FORMAT).to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
            .map_err(serde::de::Error::custom)
  }
}
