use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::recurrence::{parse_stored_date, TaskDefinition};

/// Minutes assumed for a task that has neither an estimate nor a time window.
pub const DEFAULT_ESTIMATED_MINUTES: u32 = 30;

/// Represents a single learning task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: u64,
    /// Short title shown in listings.
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Points earned each time the task is completed.
    pub points: u32,
    /// Expected minutes per occurrence.
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: u32,
    /// Start date, repeat policy and optional time window.
    #[serde(flatten)]
    pub schedule: TaskDefinition,
    /// Timestamp when the task was created (RFC 3339).
    pub created_at: String,
}

fn default_estimated_minutes() -> u32 {
    DEFAULT_ESTIMATED_MINUTES
}

impl Task {
    /// Calendar date of `created_at`, if it parses.
    pub fn created_on(&self) -> Option<NaiveDate> {
        parse_stored_date(&self.created_at)
    }

    /// The task's schedule, anchored on the creation date when no start date is set.
    pub fn effective_schedule(&self) -> TaskDefinition {
        let mut schedule = self.schedule.clone();
        if schedule.start_date.is_none() {
            schedule.start_date = self.created_on();
        }
        schedule
    }
}

impl AsRef<TaskDefinition> for Task {
    fn as_ref(&self) -> &TaskDefinition {
        &self.schedule
    }
}

/// Kind of evidence attached to a completion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    Photo,
    Audio,
    Note,
}

/// Evidence for a completion. `content` is a note or a reference supplied by the user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Proof {
    pub kind: ProofKind,
    pub content: String,
}

/// One completed occurrence of a task. Unique per `(task_id, completion_date)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    pub id: u64,
    pub task_id: u64,
    pub completion_date: NaiveDate,
    pub actual_minutes: u32,
    pub points_earned: u32,
    #[serde(default)]
    pub proof: Option<Proof>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    #[default]
    Virtual,
    Physical,
}

/// Something points can be spent on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Reward {
    pub id: u64,
    pub name: String,
    /// Price in points.
    pub points: u32,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub kind: RewardKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RedemptionRecord {
    pub id: u64,
    pub reward_id: u64,
    /// Reward name at redemption time, kept for history after the reward is removed.
    pub reward_name: String,
    pub redemption_date: NaiveDate,
    pub points_spent: u32,
}
