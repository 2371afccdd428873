//! Core library for LearnQuest: recurring learning tasks, completions and rewards.
//!
//! The [`recurrence`] module decides when a task is due; everything else is a thin
//! file-backed application around it.

pub mod commands;
pub mod error;
pub mod models;
pub mod planner;
pub mod recurrence;
pub mod stats;
pub mod storage;

pub use error::QuestError;
pub use recurrence::{
    is_due, occurrences_by_day, occurrences_in_range, RecurrenceError, RepeatPolicy,
    TaskDefinition, TimeWindow,
};
