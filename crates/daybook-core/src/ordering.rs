//! Display ordering and overdue classification.

use std::cmp::Ordering;

use chrono::NaiveDate;
use tracing::instrument;

use crate::task::Task;

/// Returns the tasks ordered for display: earliest due date first, undated
/// tasks last, then by priority rank. The sort is stable, so tasks equal on
/// both keys keep their input order.
#[instrument(skip(tasks), fields(count = tasks.len()))]
pub fn sort_for_display(tasks: &[Task]) -> Vec<Task> {
    let mut rows = tasks.to_vec();
    rows.sort_by(compare_for_display);
    rows
}

pub fn compare_for_display(a: &Task, b: &Task) -> Ordering {
    cmp_due_last(a.due_date.as_ref(), b.due_date.as_ref())
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
}

/// True when the task is still open and its due date is strictly before `today`.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.is_done && task.due_date.is_some_and(|due| due < today)
}

#[instrument(skip(tasks), fields(count = tasks.len()))]
pub fn overdue_tasks(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    let overdue: Vec<Task> = tasks
        .iter()
        .filter(|task| is_overdue(task, today))
        .cloned()
        .collect();
    sort_for_display(&overdue)
}

// Absent values compare as the maximum date.
fn cmp_due_last<T: Ord>(left: Option<&T>, right: Option<&T>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
