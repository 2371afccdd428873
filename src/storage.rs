use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::QuestError;
use crate::models::{CompletionRecord, RedemptionRecord, Reward, Task};

/// Environment variable overriding the tasks file location.
pub const DB_ENV_VAR: &str = "LEARNQUEST_DB";

/// Returns the path to the tasks database file (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `LEARNQUEST_DB` environment variable.
/// 2. `~/.local/share/learnquest/tasks.json` (on Linux).
/// 3. `./tasks.json` (fallback).
fn db_path() -> PathBuf {
    std::env::var(DB_ENV_VAR).map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("learnquest");
        if !p.exists() {
            if let Err(e) = fs::create_dir_all(&p) {
                warn!("failed to create data directory {}: {}", p.display(), e);
            }
        }
        p.push("tasks.json");
        p
    })
}

/// Returns a file living next to the tasks database.
fn sibling_path(file_name: &str) -> PathBuf {
    let mut p = db_path();
    p.pop();
    p.push(file_name);
    p
}

fn completions_path() -> PathBuf {
    sibling_path("completions.json")
}

fn rewards_path() -> PathBuf {
    sibling_path("rewards.json")
}

fn redemptions_path() -> PathBuf {
    sibling_path("redemptions.json")
}

/// Reads a JSON array of records.
///
/// A missing file is an empty store. Unreadable or corrupt files are logged and
/// also treated as empty. A single malformed record is logged and skipped, the
/// rest still load.
fn load_records<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        return Vec::new();
    }
    let mut f = match OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("failed to open {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let mut s = String::new();
    if let Err(e) = f.read_to_string(&mut s) {
        warn!("failed to read {}: {}", path.display(), e);
        return Vec::new();
    }
    let values: Vec<Value> = match serde_json::from_str(&s) {
        Ok(values) => values,
        Err(e) => {
            warn!("ignoring corrupt store {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value(v) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping record {} in {}: {}", i, path.display(), e);
                None
            }
        })
        .collect()
}

/// Overwrites `path` with the pretty-printed records.
fn save_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), QuestError> {
    let s = serde_json::to_string_pretty(records)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    f.write_all(s.as_bytes())?;
    debug!("saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Loads all tasks from the storage file.
pub fn load_tasks() -> Vec<Task> {
    load_records(&db_path())
}

/// Loads a single task by its ID.
pub fn load_task(id: u64) -> Option<Task> {
    load_tasks().into_iter().find(|t| t.id == id)
}

/// Saves the given list of tasks, replacing the stored list.
pub fn save_tasks(tasks: &[Task]) -> Result<(), QuestError> {
    save_records(&db_path(), tasks)
}

pub fn load_completions() -> Vec<CompletionRecord> {
    load_records(&completions_path())
}

pub fn save_completions(records: &[CompletionRecord]) -> Result<(), QuestError> {
    save_records(&completions_path(), records)
}

/// Finds the completion of `task_id` on `date`, if any.
pub fn find_completion(
    records: &[CompletionRecord],
    task_id: u64,
    date: NaiveDate,
) -> Option<&CompletionRecord> {
    records
        .iter()
        .find(|r| r.task_id == task_id && r.completion_date == date)
}

/// Appends a completion record, assigning its id.
///
/// Rejects a second record for the same task and date.
pub fn add_completion(mut record: CompletionRecord) -> Result<CompletionRecord, QuestError> {
    let mut records = load_completions();
    if find_completion(&records, record.task_id, record.completion_date).is_some() {
        return Err(QuestError::AlreadyCompleted {
            task_id: record.task_id,
            date: record.completion_date,
        });
    }
    record.id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
    records.push(record.clone());
    save_completions(&records)?;
    Ok(record)
}

pub fn load_rewards() -> Vec<Reward> {
    load_records(&rewards_path())
}

pub fn save_rewards(rewards: &[Reward]) -> Result<(), QuestError> {
    save_records(&rewards_path(), rewards)
}

pub fn load_redemptions() -> Vec<RedemptionRecord> {
    load_records(&redemptions_path())
}

pub fn save_redemptions(records: &[RedemptionRecord]) -> Result<(), QuestError> {
    save_records(&redemptions_path(), records)
}

/// Deletes every database file.
pub fn delete_database() -> Result<(), QuestError> {
    for path in [db_path(), completions_path(), rewards_path(), redemptions_path()] {
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("removed {}", path.display());
        }
    }
    Ok(())
}
