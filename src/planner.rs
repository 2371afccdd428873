//! Builds day agendas and date-range plans on top of the recurrence resolver.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::warn;

use crate::models::{CompletionRecord, Task};
use crate::recurrence::{is_due, occurrences_by_day, RecurrenceError, TaskDefinition};
use crate::storage::find_completion;

/// Longest date range a plan may cover, in days.
pub const MAX_PLAN_DAYS: i64 = 366;

/// Display state of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceStatus {
    Completed,
    Pending,
    Missed,
}

impl OccurrenceStatus {
    pub fn marker(&self) -> &'static str {
        match self {
            OccurrenceStatus::Completed => "✓",
            OccurrenceStatus::Pending => "·",
            OccurrenceStatus::Missed => "✗",
        }
    }
}

/// A task due on the agenda date with its completion for that date, if any.
#[derive(Debug, Clone, Copy)]
pub struct DueTask<'a> {
    pub task: &'a Task,
    pub record: Option<&'a CompletionRecord>,
}

impl DueTask<'_> {
    pub fn is_completed(&self) -> bool {
        self.record.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlannedOccurrence<'a> {
    pub task: &'a Task,
    /// Completion for this date, if any.
    pub record: Option<&'a CompletionRecord>,
    pub status: OccurrenceStatus,
}

/// Date -> occurrences due that day. Days with nothing due are absent.
pub type Plan<'a> = BTreeMap<NaiveDate, Vec<PlannedOccurrence<'a>>>;

pub fn occurrence_status(date: NaiveDate, completed: bool, today: NaiveDate) -> OccurrenceStatus {
    if completed {
        OccurrenceStatus::Completed
    } else if date < today {
        OccurrenceStatus::Missed
    } else {
        OccurrenceStatus::Pending
    }
}

/// A task paired with the schedule it is resolved against.
struct Anchored<'a> {
    task: &'a Task,
    schedule: TaskDefinition,
}

impl AsRef<TaskDefinition> for Anchored<'_> {
    fn as_ref(&self) -> &TaskDefinition {
        &self.schedule
    }
}

/// Anchors each task on its start date, or on its creation date when the start
/// date is missing. Tasks with neither are left out with a warning.
fn schedulable(tasks: &[Task]) -> Vec<Anchored<'_>> {
    tasks
        .iter()
        .filter_map(|task| {
            let schedule = task.effective_schedule();
            match schedule.anchor() {
                Ok(_) => Some(Anchored { task, schedule }),
                Err(e) => {
                    warn!("skipping task {} ({}): {}", task.id, task.title, e);
                    None
                }
            }
        })
        .collect()
}

/// Orders time-window tasks first by start time; everything else keeps its order.
fn agenda_order(a: &Task, b: &Task) -> Ordering {
    match (&a.schedule.time_window, &b.schedule.time_window) {
        (Some(wa), Some(wb)) => wa.start.cmp(&wb.start),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lists the tasks due on `date`, each paired with its completion for that date.
pub fn day_agenda<'a>(
    tasks: &'a [Task],
    completions: &'a [CompletionRecord],
    date: NaiveDate,
) -> Vec<DueTask<'a>> {
    let mut due: Vec<DueTask<'a>> = schedulable(tasks)
        .into_iter()
        .filter(|a| is_due(&a.schedule, date).unwrap_or(false))
        .map(|a| DueTask {
            task: a.task,
            record: find_completion(completions, a.task.id, date),
        })
        .collect();
    due.sort_by(|a, b| agenda_order(a.task, b.task));
    due
}

/// Builds the occurrence plan for `[start, end]`, marking each occurrence's status
/// relative to `today`.
///
/// Ranges longer than [`MAX_PLAN_DAYS`] are rejected.
pub fn plan_range<'a>(
    tasks: &'a [Task],
    completions: &'a [CompletionRecord],
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<Plan<'a>, RecurrenceError> {
    if end >= start && (end - start).num_days() + 1 > MAX_PLAN_DAYS {
        return Err(RecurrenceError::InvalidArgument(format!(
            "range {start}..{end} is longer than {MAX_PLAN_DAYS} days"
        )));
    }
    let anchored = schedulable(tasks);
    let days = occurrences_by_day(&anchored, start, end)?;
    Ok(days
        .into_iter()
        .map(|(date, due)| {
            let mut due: Vec<&'a Task> = due.into_iter().map(|a| a.task).collect();
            due.sort_by(|a, b| agenda_order(a, b));
            let occurrences = due
                .into_iter()
                .map(|task| {
                    let record = find_completion(completions, task.id, date);
                    PlannedOccurrence {
                        task,
                        record,
                        status: occurrence_status(date, record.is_some(), today),
                    }
                })
                .collect();
            (date, occurrences)
        })
        .collect())
}

/// Returns the first and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), RecurrenceError> {
    let invalid = || RecurrenceError::InvalidArgument(format!("invalid month {year}-{month:02}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next.and_then(|d| d.pred_opt()).ok_or_else(invalid)?;
    Ok((first, last))
}

/// Builds the plan for one calendar month.
pub fn month_plan<'a>(
    tasks: &'a [Task],
    completions: &'a [CompletionRecord],
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Result<Plan<'a>, RecurrenceError> {
    let (start, end) = month_bounds(year, month)?;
    plan_range(tasks, completions, start, end, today)
}
