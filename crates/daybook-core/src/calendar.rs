use std::fmt;

use chrono::{
  Datelike,
  Months,
  NaiveDate
};
use tracing::debug;

use crate::error::{
  CoreError,
  CoreResult
};
use crate::task::Task;

pub const WEEKDAY_LABELS: [&str; 7] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

const DAYS_PER_WEEK: usize = 7;

/// A calendar month, always holding a
/// month in `1..=12` and a year chrono
/// can represent.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct YearMonth {
  year:  i32,
  month: u32
}

impl YearMonth {
  pub fn new(
    year: i32,
    month: u32
  ) -> CoreResult<Self> {
    first_day_of_month(year, month)?;
    Ok(Self { year, month })
  }

  #[must_use]
  pub fn of(date: NaiveDate) -> Self {
    Self {
      year:  date.year(),
      month: date.month()
    }
  }

  #[must_use]
  pub fn year(self) -> i32 {
    self.year
  }

  #[must_use]
  pub fn month(self) -> u32 {
    self.month
  }

  #[must_use]
  pub fn first_day(self) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      self.year, self.month, 1
    )
    .unwrap_or(NaiveDate::MIN)
  }

  pub fn shift(
    self,
    months: i32
  ) -> CoreResult<Self> {
    let index = i64::from(self.year)
      * 12
      + i64::from(self.month - 1)
      + i64::from(months);
    let year = i32::try_from(
      index.div_euclid(12)
    )
    .map_err(|_| {
      CoreError::InvalidYear {
        year: if months < 0 {
          i32::MIN
        } else {
          i32::MAX
        }
      }
    })?;
    let month =
      index.rem_euclid(12) as u32 + 1;
    Self::new(year, month)
  }

  pub fn previous(
    self
  ) -> CoreResult<Self> {
    self.shift(-1)
  }

  pub fn next(self) -> CoreResult<Self> {
    self.shift(1)
  }
}

impl fmt::Display for YearMonth {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-{:02}",
      self.year, self.month
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
  pub date:       NaiveDate,
  pub day:        u32,
  pub tasks:      Vec<Task>,
  pub task_count: usize
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum GridCell {
  #[default]
  Blank,
  Day(DayCell)
}

impl GridCell {
  #[must_use]
  pub fn as_day(
    &self
  ) -> Option<&DayCell> {
    match self {
      | Self::Day(cell) => Some(cell),
      | Self::Blank => None
    }
  }

  #[must_use]
  pub fn is_blank(&self) -> bool {
    matches!(self, Self::Blank)
  }
}

/// Week rows of a month, Sunday in
/// column 0. Rows stop once the last day
/// is placed, so there are 4 to 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
  pub year:                 i32,
  pub month:                u32,
  pub days_in_month:        u32,
  pub first_weekday_offset: u32,
  pub weeks: Vec<[GridCell; DAYS_PER_WEEK]>
}

impl MonthGrid {
  #[must_use]
  pub fn row_count(&self) -> usize {
    self.weeks.len()
  }

  #[must_use]
  pub fn position_of(
    &self,
    day: u32
  ) -> Option<(usize, usize)> {
    if day == 0
      || day > self.days_in_month
    {
      return None;
    }
    let index = (self.first_weekday_offset
      + day
      - 1) as usize;
    Some((
      index / DAYS_PER_WEEK,
      index % DAYS_PER_WEEK
    ))
  }

  #[must_use]
  pub fn day(
    &self,
    day: u32
  ) -> Option<&DayCell> {
    let (row, col) =
      self.position_of(day)?;
    self.weeks.get(row)?[col].as_day()
  }

  pub fn days(
    &self
  ) -> impl Iterator<Item = &DayCell> {
    self
      .weeks
      .iter()
      .flat_map(|week| week.iter())
      .filter_map(GridCell::as_day)
  }

  #[must_use]
  pub fn total_tasks(&self) -> usize {
    self
      .days()
      .map(|cell| cell.task_count)
      .sum()
  }

  #[must_use]
  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    date.year() == self.year
      && date.month() == self.month
  }
}

#[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
pub fn build_month_grid(
  year: i32,
  month: u32,
  tasks: &[Task]
) -> CoreResult<MonthGrid> {
  let first =
    first_day_of_month(year, month)?;
  let days_in_month =
    days_in_month(year, month)?;
  let offset =
    first.weekday().num_days_from_sunday();

  let mut weeks = Vec::with_capacity(6);
  let mut day_counter = 1_u32;

  while day_counter <= days_in_month {
    let row = weeks.len();
    let mut week: [GridCell;
      DAYS_PER_WEEK] =
      std::array::from_fn(|_| {
        GridCell::Blank
      });

    for (col, cell) in
      week.iter_mut().enumerate()
    {
      if row == 0
        && (col as u32) < offset
      {
        continue;
      }
      if day_counter > days_in_month {
        break;
      }

      let date = first
        .with_day(day_counter)
        .ok_or(CoreError::InvalidYear {
          year
        })?;
      let day_tasks =
        tasks_due_on(tasks, date);
      *cell = GridCell::Day(DayCell {
        date,
        day: day_counter,
        task_count: day_tasks.len(),
        tasks: day_tasks
      });
      day_counter += 1;
    }

    weeks.push(week);
  }

  debug!(
    year,
    month,
    days_in_month,
    offset,
    rows = weeks.len(),
    "built month grid"
  );

  Ok(MonthGrid {
    year,
    month,
    days_in_month,
    first_weekday_offset: offset,
    weeks
  })
}

/// Tasks due on `date`, in input order.
pub fn tasks_due_on(
  tasks: &[Task],
  date: NaiveDate
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|task| task.is_due_on(date))
    .cloned()
    .collect()
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> CoreResult<u32> {
  Ok(last_day_of_month(year, month)?.day())
}

/// Weekday of day 1, 0 = Sunday.
pub fn first_weekday_offset(
  year: i32,
  month: u32
) -> CoreResult<u32> {
  Ok(
    first_day_of_month(year, month)?
      .weekday()
      .num_days_from_sunday()
  )
}

/// Moves `date` by whole months, clamping
/// the day to the target month's length.
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let Ok(target) =
    YearMonth::of(date).shift(months)
  else {
    return date;
  };
  let last = days_in_month(
    target.year,
    target.month
  )
  .unwrap_or(28);
  NaiveDate::from_ymd_opt(
    target.year,
    target.month,
    date.day().min(last)
  )
  .unwrap_or(date)
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> CoreResult<NaiveDate> {
  validate_month(month)?;
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .ok_or(CoreError::InvalidYear { year })
}

fn last_day_of_month(
  year: i32,
  month: u32
) -> CoreResult<NaiveDate> {
  let first =
    first_day_of_month(year, month)?;
  let last = first
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt());
  // December of chrono's last year has
  // no following month.
  last
    .or_else(|| {
      NaiveDate::from_ymd_opt(
        year, 12, 31
      )
      .filter(|_| month == 12)
    })
    .ok_or(CoreError::InvalidYear { year })
}

fn validate_month(
  month: u32
) -> CoreResult<()> {
  if (1..=12).contains(&month) {
    Ok(())
  } else {
    Err(CoreError::InvalidMonth {
      month
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::*;
  use crate::task::Task;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn due_task(
    id: u64,
    due: Option<NaiveDate>
  ) -> Task {
    let now = Utc
      .with_ymd_and_hms(
        2026, 1, 1, 12, 0, 0
      )
      .single()
      .expect("valid now");
    Task::new(id, format!("task {id}"), now)
      .with_due_date(due)
  }

  #[test]
  fn leap_february_spans_five_rows() {
    let grid = build_month_grid(
      2024,
      2,
      &[]
    )
    .expect("valid month");

    assert_eq!(grid.days_in_month, 29);
    assert_eq!(
      grid.first_weekday_offset,
      4
    );
    assert_eq!(grid.row_count(), 5);
    assert_eq!(
      grid.position_of(1),
      Some((0, 4))
    );
    assert_eq!(
      grid.position_of(29),
      Some((4, 4))
    );
    assert_eq!(
      grid.weeks[4][4]
        .as_day()
        .map(|cell| cell.day),
      Some(29)
    );
  }

  #[test]
  fn february_2023_has_no_trailing_blank_row(
  ) {
    let grid = build_month_grid(
      2023,
      2,
      &[]
    )
    .expect("valid month");

    assert_eq!(grid.days_in_month, 28);
    assert_eq!(
      grid.first_weekday_offset,
      3
    );
    assert_eq!(grid.row_count(), 5);
    let last_row = grid
      .weeks
      .last()
      .expect("at least one row");
    assert!(
      last_row
        .iter()
        .any(|cell| !cell.is_blank())
    );
  }

  #[test]
  fn sunday_start_february_fills_exactly_four_rows(
  ) {
    let grid = build_month_grid(
      2026,
      2,
      &[]
    )
    .expect("valid month");

    assert_eq!(
      grid.first_weekday_offset,
      0
    );
    assert_eq!(grid.row_count(), 4);
    assert!(grid.weeks.iter().all(
      |week| {
        week
          .iter()
          .all(|cell| !cell.is_blank())
      }
    ));
  }

  #[test]
  fn saturday_start_puts_day_one_in_last_column(
  ) {
    let grid = build_month_grid(
      2025,
      11,
      &[]
    )
    .expect("valid month");

    assert_eq!(
      grid.first_weekday_offset,
      6
    );
    assert!(
      grid.weeks[0][..6]
        .iter()
        .all(GridCell::is_blank)
    );
    assert_eq!(
      grid.weeks[0][6]
        .as_day()
        .map(|cell| cell.day),
      Some(1)
    );
    assert_eq!(grid.row_count(), 6);
    assert_eq!(
      grid.position_of(30),
      Some((5, 0))
    );
  }

  #[test]
  fn every_day_is_placed_once_in_order() {
    for month in 1..=12 {
      let grid = build_month_grid(
        2027,
        month,
        &[]
      )
      .expect("valid month");
      let days: Vec<u32> = grid
        .days()
        .map(|cell| cell.day)
        .collect();
      let expected: Vec<u32> =
        (1..=grid.days_in_month)
          .collect();
      assert_eq!(days, expected);
      assert!(grid.row_count() <= 6);
    }
  }

  #[test]
  fn attaches_tasks_to_their_due_day() {
    let march_15 = date(2026, 3, 15);
    let tasks = vec![
      due_task(1, Some(march_15)),
      due_task(2, Some(date(2026, 4, 15))),
      due_task(3, None),
    ];

    let due = tasks_due_on(&tasks, march_15);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, 1);

    let grid = build_month_grid(
      2026, 3, &tasks
    )
    .expect("valid month");
    let cell =
      grid.day(15).expect("day 15");
    assert_eq!(cell.task_count, 1);
    assert_eq!(cell.date, march_15);
    assert_eq!(grid.total_tasks(), 1);
    assert_eq!(
      grid.day(16).map(|c| c.task_count),
      Some(0)
    );
  }

  #[test]
  fn tasks_due_on_preserves_input_order() {
    let day = date(2026, 6, 1);
    let tasks = vec![
      due_task(5, Some(day)),
      due_task(2, None),
      due_task(9, Some(day)).toggled(),
      due_task(1, Some(day)),
    ];

    let ids: Vec<u64> =
      tasks_due_on(&tasks, day)
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![5, 9, 1]);
    assert!(tasks_due_on(&[], day)
      .is_empty());
  }

  #[test]
  fn rejects_months_outside_range() {
    assert_eq!(
      build_month_grid(2026, 13, &[]),
      Err(CoreError::InvalidMonth {
        month: 13
      })
    );
    assert_eq!(
      build_month_grid(2026, 0, &[]),
      Err(CoreError::InvalidMonth {
        month: 0
      })
    );
  }

  #[test]
  fn gregorian_month_lengths() {
    assert_eq!(days_in_month(2026, 1), Ok(31));
    assert_eq!(days_in_month(2026, 4), Ok(30));
    assert_eq!(days_in_month(1900, 2), Ok(28));
    assert_eq!(days_in_month(2000, 2), Ok(29));
    assert_eq!(days_in_month(2024, 2), Ok(29));
    assert_eq!(days_in_month(2026, 12), Ok(31));
    assert_eq!(
      days_in_month(
        NaiveDate::MAX.year(),
        12
      ),
      Ok(31)
    );
    assert_eq!(
      days_in_month(2024, 14),
      Err(CoreError::InvalidMonth {
        month: 14
      })
    );
  }

  #[test]
  fn year_month_navigation_wraps_years() {
    let jan = YearMonth::new(2026, 1)
      .expect("valid month");
    let dec = jan
      .previous()
      .expect("previous month");
    assert_eq!(
      (dec.year(), dec.month()),
      (2025, 12)
    );
    assert_eq!(
      dec.next().expect("next month"),
      jan
    );
    assert_eq!(
      jan
        .shift(-25)
        .expect("shifted")
        .to_string(),
      "2023-12"
    );
  }

  #[test]
  fn shift_months_clamps_day() {
    assert_eq!(
      shift_months(date(2026, 1, 31), 1),
      date(2026, 2, 28)
    );
    assert_eq!(
      shift_months(date(2024, 3, 31), -1),
      date(2024, 2, 29)
    );
    assert_eq!(
      shift_months(date(2026, 5, 10), 12),
      date(2027, 5, 10)
    );
  }
}
