//! Application error types

use chrono::NaiveDate;
use thiserror::Error;

use crate::recurrence::RecurrenceError;

/// Errors surfaced by commands and storage.
#[derive(Debug, Error)]
pub enum QuestError {
    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid date `{input}`: {source}. Use {format}")]
    InvalidDate {
        input: String,
        format: &'static str,
        source: chrono::ParseError,
    },

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("reward {0} not found")]
    RewardNotFound(u64),

    #[error("task {task_id} is not due on {date}")]
    NotDue { task_id: u64, date: NaiveDate },

    #[error("task {task_id} was already completed on {date}")]
    AlreadyCompleted { task_id: u64, date: NaiveDate },

    #[error("not enough points: need {needed}, have {available}")]
    InsufficientPoints { needed: i64, available: i64 },
}

impl QuestError {
    /// True for errors caused by bad user input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, QuestError::Io(_) | QuestError::Json(_))
    }
}
