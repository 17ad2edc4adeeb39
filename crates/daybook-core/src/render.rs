use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{GridCell, MonthGrid, WEEKDAY_LABELS};
use crate::config::Config;
use crate::ordering::is_overdue;
use crate::task::Task;

const CELL_WIDTH: usize = 5;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&self, tasks: &[Task], today: NaiveDate) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks, today)
    }

    #[tracing::instrument(skip(self, grid), fields(year = grid.year, month = grid.month))]
    pub fn print_month_grid(&self, grid: &MonthGrid, today: NaiveDate) -> anyhow::Result<()> {
        self.write_month_grid(io::stdout().lock(), grid, today)
    }

    pub fn write_task_table<W: Write>(
        &self,
        mut writer: W,
        tasks: &[Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(writer, "No tasks.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Done".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let due = task
                .due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let due = if is_overdue(task, today) {
                self.paint(&due, "31")
            } else {
                due
            };

            let id = self.paint(&task.id.to_string(), "33");
            let done = if task.is_done { "x" } else { "" }.to_string();

            rows.push(vec![id, due, task.priority.to_string(), done, task.title.clone()]);
        }

        write_table(&mut writer, headers, rows)?;
        Ok(())
    }

    pub fn write_month_grid<W: Write>(
        &self,
        mut writer: W,
        grid: &MonthGrid,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let title = NaiveDate::from_ymd_opt(grid.year, grid.month, 1)
            .map(|first| first.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{:04}-{:02}", grid.year, grid.month));
        let total_width = CELL_WIDTH * WEEKDAY_LABELS.len();
        let title_width = UnicodeWidthStr::width(title.as_str());
        let indent = total_width.saturating_sub(title_width) / 2;
        writeln!(writer, "{}{}", " ".repeat(indent), title)?;

        for label in WEEKDAY_LABELS {
            write!(writer, "{label:>width$}", width = CELL_WIDTH)?;
        }
        writeln!(writer)?;

        for week in &grid.weeks {
            let mut days = String::new();
            let mut counts = String::new();
            for cell in week {
                match cell {
                    GridCell::Blank => {
                        days.push_str(&" ".repeat(CELL_WIDTH));
                        counts.push_str(&" ".repeat(CELL_WIDTH));
                    }
                    GridCell::Day(day) => {
                        let number = format!("{:>width$}", day.day, width = CELL_WIDTH);
                        let number = if day.date == today {
                            self.paint(&number, "7")
                        } else if day.task_count > 0 {
                            self.paint(&number, "36")
                        } else {
                            number
                        };
                        days.push_str(&number);

                        let badge = if day.task_count > 0 {
                            format!("({})", day.task_count)
                        } else {
                            String::new()
                        };
                        counts.push_str(&format!("{badge:>width$}", width = CELL_WIDTH));
                    }
                }
            }
            writeln!(writer, "{}", days.trim_end())?;
            if !counts.trim().is_empty() {
                writeln!(writer, "{}", counts.trim_end())?;
            }
        }

        Ok(())
    }

    pub fn write_day_listing<W: Write>(
        &self,
        mut writer: W,
        date: NaiveDate,
        tasks: &[Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let heading = date.format("%b %d, %Y");
        if tasks.is_empty() {
            writeln!(writer, "No tasks for {heading}")?;
            return Ok(());
        }

        writeln!(writer, "Tasks for {heading}")?;
        for task in tasks {
            let title = if is_overdue(task, today) {
                self.paint(&task.title, "31")
            } else {
                task.title.clone()
            };
            let mark = if task.is_done { "x" } else { " " };
            writeln!(writer, "  [{mark}] {title} ({})", task.priority.label())?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
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
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
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
