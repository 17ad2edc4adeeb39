use std::io;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::board::{self, TaskDraft};
use crate::calendar::{YearMonth, build_month_grid, tasks_due_on};
use crate::cli::Invocation;
use crate::datetime::{parse_date_expr, parse_month_expr};
use crate::ordering::{overdue_tasks, sort_for_display};
use crate::render::Renderer;
use crate::snapshot::write_jsonl;
use crate::task::{Priority, Task};

/// Per-invocation inputs, resolved once at the CLI boundary.
#[derive(Debug, Clone)]
pub struct Session {
    pub tasks: Vec<Task>,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

#[instrument(skip(session, renderer, inv), fields(command = %inv.command))]
pub fn dispatch(session: Session, renderer: &Renderer, inv: Invocation) -> anyhow::Result<()> {
    let args = inv.command_args.as_slice();
    debug!(args = ?args, today = %session.today, tasks = session.tasks.len(), "dispatching command");

    match inv.command.as_str() {
        "list" => cmd_list(&session, renderer),
        "overdue" => cmd_overdue(&session, renderer),
        "calendar" => cmd_calendar(&session, renderer, args),
        "day" => cmd_day(&session, renderer, args),
        "add" => cmd_add(session, args),
        "modify" => cmd_modify(session, args),
        "toggle" | "done" => cmd_toggle(session, args),
        "delete" => cmd_delete(session, args),
        "export" => write_jsonl(io::stdout().lock(), &session.tasks),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_list(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    let rows = sort_for_display(&session.tasks);
    renderer.print_task_table(&rows, session.today)
}

fn cmd_overdue(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    let rows = overdue_tasks(&session.tasks, session.today);
    info!(count = rows.len(), "overdue tasks");
    renderer.print_task_table(&rows, session.today)
}

fn cmd_calendar(session: &Session, renderer: &Renderer, args: &[String]) -> anyhow::Result<()> {
    let target = match args.first() {
        Some(expr) => parse_month_expr(expr, session.today)?,
        None => YearMonth::of(session.today),
    };

    let grid = build_month_grid(target.year(), target.month(), &session.tasks)?;
    renderer.print_month_grid(&grid, session.today)?;

    if grid.contains(session.today) {
        let due_today = tasks_due_on(&session.tasks, session.today);
        println!();
        renderer.write_day_listing(io::stdout().lock(), session.today, &due_today, session.today)?;
    }
    Ok(())
}

fn cmd_day(session: &Session, renderer: &Renderer, args: &[String]) -> anyhow::Result<()> {
    let date = match args.first() {
        Some(expr) => parse_date_expr(expr, session.today)?,
        None => session.today,
    };
    let due = tasks_due_on(&session.tasks, date);
    renderer.write_day_listing(io::stdout().lock(), date, &due, session.today)
}

fn cmd_add(session: Session, args: &[String]) -> anyhow::Result<()> {
    let mut draft = TaskDraft::default();
    let title = apply_field_args(&mut draft, args, session.today)?;
    draft.title = title.unwrap_or_default();

    let tasks = board::add_task(session.tasks, draft, session.now)?;
    if let Some(added) = tasks.last() {
        info!(id = added.id, "added task");
    }
    write_jsonl(io::stdout().lock(), &tasks)
}

fn cmd_modify(session: Session, args: &[String]) -> anyhow::Result<()> {
    let tasks = modify_tasks(session.tasks, args, session.today)?;
    write_jsonl(io::stdout().lock(), &tasks)
}

fn cmd_toggle(session: Session, args: &[String]) -> anyhow::Result<()> {
    let id = single_task_id(args)?;
    let tasks = board::toggle_done(session.tasks, id)?;
    info!(id, "toggled task");
    write_jsonl(io::stdout().lock(), &tasks)
}

fn cmd_delete(session: Session, args: &[String]) -> anyhow::Result<()> {
    let id = single_task_id(args)?;
    let tasks = board::delete_task(session.tasks, id)?;
    info!(id, "deleted task");
    write_jsonl(io::stdout().lock(), &tasks)
}

/// `<id> [title words] [due:D] [pri:P]`; fields not named keep their value.
fn modify_tasks(tasks: Vec<Task>, args: &[String], today: NaiveDate) -> anyhow::Result<Vec<Task>> {
    let (id, rest) = split_task_id(args)?;
    let mut draft = TaskDraft::from(board::find_task(&tasks, id)?);
    if let Some(title) = apply_field_args(&mut draft, rest, today)? {
        draft.title = title;
    }

    let tasks = board::edit_task(tasks, id, draft)?;
    info!(id, "modified task");
    Ok(tasks)
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "usage: daybook [--tasks FILE|-] [--today YYYY-MM-DD] <command> [args]\n\n\
         commands:\n  \
         list                           tasks sorted by due date, then priority\n  \
         overdue                        open tasks past their due date\n  \
         calendar [MONTH]               month grid (YYYY-MM, march, next, prev, +N, -N)\n  \
         day [DATE]                     tasks due on a date\n  \
         add <title> [due:D] [pri:P]    print the snapshot with a new task\n  \
         modify <id> [title] [due:D] [pri:P]\n  \
         toggle <id>                    flip completion\n  \
         delete <id>\n  \
         export                         print the snapshot as JSON Lines"
    );
    Ok(())
}

fn single_task_id(args: &[String]) -> anyhow::Result<u64> {
    match split_task_id(args)? {
        (id, []) => Ok(id),
        (_, extra) => Err(anyhow!("expected a single task id, got extra arguments: {}", extra.join(" "))),
    }
}

fn split_task_id(args: &[String]) -> anyhow::Result<(u64, &[String])> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("a task id is required"))?;
    let id = first
        .parse::<u64>()
        .with_context(|| format!("invalid task id: {first}"))?;
    Ok((id, rest))
}

/// Applies `due:` and `pri:` modifiers to `draft`; the remaining words form
/// the title, returned when there are any.
fn apply_field_args(
    draft: &mut TaskDraft,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<Option<String>> {
    let mut words = Vec::new();

    for arg in args {
        if let Some(raw) = arg.strip_prefix("due:") {
            draft.due_date = if raw.trim().is_empty() {
                None
            } else {
                Some(parse_date_expr(raw, today)?)
            };
        } else if let Some(raw) = arg.strip_prefix("pri:").or_else(|| arg.strip_prefix("priority:")) {
            draft.priority =
                Priority::parse(raw).ok_or_else(|| anyhow!("invalid priority: {raw}"))?;
        } else {
            words.push(arg.as_str());
        }
    }

    if words.is_empty() {
        Ok(None)
    } else {
        Ok(Some(words.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use chrono::{TimeZone, Utc};

    use super::{apply_field_args, modify_tasks, single_task_id, split_task_id};
    use crate::board::{TaskDraft, sample_tasks};
    use crate::error::CoreError;
    use crate::task::Priority;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn field_args_split_title_and_modifiers() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date");
        let mut draft = TaskDraft::default();
        let title = apply_field_args(
            &mut draft,
            &strings(&["Renew", "passport", "due:+2d", "pri:H"]),
            today,
        )
        .expect("parse args");

        assert_eq!(title.as_deref(), Some("Renew passport"));
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2026, 7, 3));
        assert_eq!(draft.priority, Priority::High);
    }

    #[test]
    fn empty_due_clears_date() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date");
        let mut draft = TaskDraft {
            due_date: Some(today),
            ..TaskDraft::default()
        };
        let title = apply_field_args(&mut draft, &strings(&["due:"]), today).expect("parse args");
        assert_eq!(title, None);
        assert_eq!(draft.due_date, None);
    }

    #[test]
    fn rejects_unknown_priority() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date");
        let mut draft = TaskDraft::default();
        assert!(apply_field_args(&mut draft, &strings(&["pri:urgent"]), today).is_err());
    }

    #[test]
    fn task_id_must_be_numeric() {
        let args = strings(&["7", "extra"]);
        let (id, rest) = split_task_id(&args).expect("parse id");
        assert_eq!(id, 7);
        assert_eq!(rest, &args[1..]);
        assert!(split_task_id(&strings(&["seven"])).is_err());
        assert!(split_task_id(&[]).is_err());
    }

    #[test]
    fn toggle_and_delete_take_exactly_one_id() {
        assert_eq!(single_task_id(&strings(&["3"])).expect("single id"), 3);
        let err = single_task_id(&strings(&["3", "4"])).expect_err("extra id");
        assert!(err.to_string().contains("extra arguments: 4"));
        assert!(single_task_id(&[]).is_err());
    }

    #[test]
    fn modify_keeps_unnamed_fields() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date");
        let now = Utc
            .with_ymd_and_hms(2026, 7, 1, 8, 0, 0)
            .single()
            .expect("valid now");

        let tasks = modify_tasks(sample_tasks(today, now), &strings(&["3", "pri:L"]), today)
            .expect("modify task 3");
        let task = &tasks[2];
        assert_eq!(task.id, 3);
        assert_eq!(task.title, "Design the workshop poster");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 7, 6));
    }

    #[test]
    fn modify_unknown_id_reports_task_not_found() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date");
        let now = Utc
            .with_ymd_and_hms(2026, 7, 1, 8, 0, 0)
            .single()
            .expect("valid now");

        let err = modify_tasks(sample_tasks(today, now), &strings(&["42", "New title"]), today)
            .expect_err("missing task");
        assert_eq!(
            err.downcast_ref::<CoreError>(),
            Some(&CoreError::TaskNotFound { id: 42 })
        );
    }
}
