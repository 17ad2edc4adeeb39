//! Snapshot-in, snapshot-out mutations over a task collection.
//!
//! Every function takes ownership of the current collection and returns the
//! next one; nothing here keeps state between calls.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, instrument};

use crate::error::{CoreError, CoreResult};
use crate::task::{Priority, Task};

/// Editable fields of a task, as collected by an add or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn validated_title(&self) -> CoreResult<String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CoreError::BlankTitle);
        }
        Ok(title.to_string())
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            priority: task.priority,
            due_date: task.due_date,
        }
    }
}

/// One past the largest id in use, or 1 for an empty collection.
pub fn next_id(tasks: &[Task]) -> CoreResult<u64> {
    let Some(max) = tasks.iter().map(|t| t.id).max() else {
        return Ok(1);
    };
    max.checked_add(1).ok_or(CoreError::IdSpaceExhausted { max })
}

pub fn find_task(tasks: &[Task], id: u64) -> CoreResult<&Task> {
    tasks
        .iter()
        .find(|t| t.id == id)
        .ok_or(CoreError::TaskNotFound { id })
}

#[instrument(skip(tasks, draft, now), fields(count = tasks.len()))]
pub fn add_task(mut tasks: Vec<Task>, draft: TaskDraft, now: DateTime<Utc>) -> CoreResult<Vec<Task>> {
    let title = draft.validated_title()?;
    let id = next_id(&tasks)?;
    let task = Task::new(id, title, now)
        .with_priority(draft.priority)
        .with_due_date(draft.due_date);

    debug!(id, priority = %task.priority, due = ?task.due_date, "adding task");
    tasks.push(task);
    Ok(tasks)
}

#[instrument(skip(tasks, draft), fields(count = tasks.len()))]
pub fn edit_task(tasks: Vec<Task>, id: u64, draft: TaskDraft) -> CoreResult<Vec<Task>> {
    let title = draft.validated_title()?;
    replace_by_id(tasks, id, |task| {
        task.with_title(title)
            .with_priority(draft.priority)
            .with_due_date(draft.due_date)
    })
}

#[instrument(skip(tasks), fields(count = tasks.len()))]
pub fn toggle_done(tasks: Vec<Task>, id: u64) -> CoreResult<Vec<Task>> {
    replace_by_id(tasks, id, Task::toggled)
}

#[instrument(skip(tasks), fields(count = tasks.len()))]
pub fn delete_task(mut tasks: Vec<Task>, id: u64) -> CoreResult<Vec<Task>> {
    let idx = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or(CoreError::TaskNotFound { id })?;
    let removed = tasks.remove(idx);
    debug!(id, title = %removed.title, "deleted task");
    Ok(tasks)
}

fn replace_by_id<F>(mut tasks: Vec<Task>, id: u64, update: F) -> CoreResult<Vec<Task>>
where
    F: FnOnce(Task) -> Task,
{
    let idx = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or(CoreError::TaskNotFound { id })?;
    let current = tasks.remove(idx);
    tasks.insert(idx, update(current));
    Ok(tasks)
}

/// Starter collection with due dates spread around `today`.
pub fn sample_tasks(today: NaiveDate, now: DateTime<Utc>) -> Vec<Task> {
    let offset = |days: i64| today.checked_add_signed(Duration::days(days));

    vec![
        Task::new(1, "Finish the quarterly forecast model", now)
            .with_priority(Priority::High)
            .with_due_date(offset(3)),
        Task::new(2, "Prepare the project demo", now)
            .with_priority(Priority::High)
            .with_due_date(offset(1)),
        Task::new(3, "Design the workshop poster", now)
            .with_priority(Priority::Medium)
            .with_due_date(offset(5)),
        Task::new(4, "Study for the security competition", now)
            .with_priority(Priority::Low)
            .toggled(),
        Task::new(5, "Submit the web development assignment", now)
            .with_priority(Priority::Medium)
            .with_due_date(offset(-1))
            .toggled(),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::ordering::{is_overdue, sort_for_display};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0)
            .single()
            .expect("valid now")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date")
    }

    #[test]
    fn next_id_starts_at_one_and_follows_max() {
        assert_eq!(next_id(&[]), Ok(1));
        let tasks = vec![Task::new(4, "a", now()), Task::new(2, "b", now())];
        assert_eq!(next_id(&tasks), Ok(5));
    }

    #[test]
    fn add_fails_when_largest_id_is_taken() {
        let tasks = vec![Task::new(u64::MAX, "last", now())];
        assert_eq!(
            next_id(&tasks),
            Err(CoreError::IdSpaceExhausted { max: u64::MAX })
        );

        let err = add_task(tasks.clone(), TaskDraft::new("one more"), now()).expect_err("no id left");
        assert_eq!(err, CoreError::IdSpaceExhausted { max: u64::MAX });
        assert!(!tasks.iter().any(|t| t.id == 0));
    }

    #[test]
    fn find_task_reports_missing_id() {
        let tasks = sample_tasks(today(), now());
        let found = find_task(&tasks, 3).expect("task 3");
        assert_eq!(TaskDraft::from(found).priority, Priority::Medium);
        assert_eq!(find_task(&tasks, 9), Err(CoreError::TaskNotFound { id: 9 }));
    }

    #[test]
    fn add_assigns_next_id_and_trims_title() {
        let tasks = sample_tasks(today(), now());
        let draft = TaskDraft {
            title: "  Book dentist  ".to_string(),
            priority: Priority::Low,
            due_date: Some(today()),
        };

        let tasks = add_task(tasks, draft, now()).expect("add task");
        let added = tasks.last().expect("added task");
        assert_eq!(added.id, 6);
        assert_eq!(added.title, "Book dentist");
        assert_eq!(added.priority, Priority::Low);
        assert!(!added.is_done);
    }

    #[test]
    fn add_rejects_blank_title() {
        let err = add_task(vec![], TaskDraft::new("   "), now()).expect_err("blank title");
        assert_eq!(err, CoreError::BlankTitle);
    }

    #[test]
    fn edit_replaces_fields_in_place() {
        let tasks = sample_tasks(today(), now());
        let draft = TaskDraft {
            title: "Demo rehearsal".to_string(),
            priority: Priority::Low,
            due_date: None,
        };

        let tasks = edit_task(tasks, 2, draft).expect("edit task");
        assert_eq!(tasks[1].id, 2);
        assert_eq!(tasks[1].title, "Demo rehearsal");
        assert_eq!(tasks[1].priority, Priority::Low);
        assert_eq!(tasks[1].due_date, None);
        assert_eq!(tasks.len(), 5);
    }

    #[test]
    fn edit_unknown_id_fails() {
        let err = edit_task(vec![], 42, TaskDraft::new("x")).expect_err("missing task");
        assert_eq!(err, CoreError::TaskNotFound { id: 42 });
    }

    #[test]
    fn toggle_targets_id_not_display_position() {
        let tasks = sample_tasks(today(), now());
        let first_displayed = sort_for_display(&tasks)[0].id;
        assert_eq!(first_displayed, 5);

        let tasks = toggle_done(tasks, first_displayed).expect("toggle");
        assert_eq!(tasks[4].id, 5);
        assert!(!tasks[4].is_done);
        assert!(!tasks[0].is_done);
        assert!(tasks[3].is_done);
    }

    #[test]
    fn delete_removes_only_matching_task() {
        let tasks = sample_tasks(today(), now());
        let tasks = delete_task(tasks, 3).expect("delete");
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 4, 5]);
        assert_eq!(
            delete_task(tasks, 3).expect_err("already deleted"),
            CoreError::TaskNotFound { id: 3 }
        );
    }

    #[test]
    fn sample_tasks_have_no_open_overdue_items() {
        let tasks = sample_tasks(today(), now());
        assert_eq!(tasks.len(), 5);
        assert!(tasks.iter().all(|t| !is_overdue(t, today())));
        assert_eq!(tasks[4].due_date, NaiveDate::from_ymd_opt(2026, 5, 3));
    }
}
