use std::io::{self, Write};

use chrono::{Datelike, Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use log::{debug, info};

use crate::error::QuestError;
use crate::models::{CompletionRecord, Proof, RedemptionRecord, Reward, RewardKind, Task, DEFAULT_ESTIMATED_MINUTES};
use crate::planner::{day_agenda, month_bounds, month_plan, plan_range, OccurrenceStatus};
use crate::recurrence::{is_due, RepeatPolicy, TaskDefinition, TimeWindow};
use crate::stats::{day_stats, points_balance, range_stats};
use crate::storage::{
    add_completion, delete_database, load_completions, load_redemptions, load_rewards, load_task,
    load_tasks, save_redemptions, save_rewards, save_tasks,
};

/// Points a new task is worth unless told otherwise.
pub const DEFAULT_TASK_POINTS: u32 = 20;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Optional task fields shared by `add` and `edit`.
#[derive(Debug, Default, Clone)]
pub struct TaskFields {
    pub description: Option<String>,
    pub points: Option<u32>,
    /// Repeat policy tag, e.g. `daily` or `week_cross`.
    pub repeat: Option<String>,
    /// Start date in YYYY-MM-DD.
    pub start: Option<String>,
    /// Expected minutes, for tasks without a time slot.
    pub minutes: Option<u32>,
    /// Time slot in HH:MM-HH:MM.
    pub slot: Option<String>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a YYYY-MM-DD date.
pub fn parse_date(input: &str) -> Result<NaiveDate, QuestError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|source| QuestError::InvalidDate {
        input: input.to_string(),
        format: "YYYY-MM-DD",
        source,
    })
}

fn parse_date_or_today(input: Option<&str>) -> Result<NaiveDate, QuestError> {
    input.map(parse_date).unwrap_or_else(|| Ok(today()))
}

/// Parses a YYYY-MM month into `(year, month)`.
pub fn parse_month(input: &str) -> Result<(i32, u32), QuestError> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", input.trim()), DATE_FORMAT).map_err(
        |source| QuestError::InvalidDate {
            input: input.to_string(),
            format: "YYYY-MM",
            source,
        },
    )?;
    Ok((first.year(), first.month()))
}

fn parse_policy(tag: Option<&str>) -> Result<Option<RepeatPolicy>, QuestError> {
    Ok(tag.map(RepeatPolicy::parse_known).transpose()?)
}

fn parse_slot(slot: Option<&str>) -> Result<Option<TimeWindow>, QuestError> {
    Ok(slot.map(str::parse::<TimeWindow>).transpose()?)
}

/// Adds a new task and returns its id.
///
/// Defaults: repeats daily, starts today, worth [`DEFAULT_TASK_POINTS`]. A time slot
/// determines the estimated minutes; otherwise `minutes` or 30 is used.
pub fn cmd_add(title: String, fields: TaskFields, silent: bool) -> Result<u64, QuestError> {
    let repeat_type = parse_policy(fields.repeat.as_deref())?.unwrap_or_default();
    let start_date = parse_date_or_today(fields.start.as_deref())?;
    let time_window = parse_slot(fields.slot.as_deref())?;
    let estimated_minutes = time_window
        .map(|w| w.minutes())
        .or(fields.minutes)
        .unwrap_or(DEFAULT_ESTIMATED_MINUTES);

    let mut tasks = load_tasks();
    let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    let mut schedule = TaskDefinition::new(start_date, repeat_type);
    schedule.time_window = time_window;
    tasks.push(Task {
        id: next_id,
        title,
        description: fields.description,
        points: fields.points.unwrap_or(DEFAULT_TASK_POINTS),
        estimated_minutes,
        schedule,
        created_at: Local::now().to_rfc3339(),
    });
    save_tasks(&tasks)?;
    info!("added task {}", next_id);
    if !silent { println!("Task added (id = {})", next_id); }
    Ok(next_id)
}

/// Edits an existing task.
///
/// Setting a slot also sets the estimate from it; setting minutes drops any slot.
pub fn cmd_edit(id: u64, title: Option<String>, fields: TaskFields, silent: bool) -> Result<(), QuestError> {
    let repeat_type = parse_policy(fields.repeat.as_deref())?;
    let start_date = fields.start.as_deref().map(parse_date).transpose()?;
    let time_window = parse_slot(fields.slot.as_deref())?;

    let mut tasks = load_tasks();
    let t = tasks.iter_mut().find(|t| t.id == id).ok_or(QuestError::TaskNotFound(id))?;
    if let Some(v) = title { t.title = v; }
    if let Some(v) = fields.description { t.description = Some(v); }
    if let Some(v) = fields.points { t.points = v; }
    if let Some(v) = repeat_type { t.schedule.repeat_type = v; }
    if let Some(v) = start_date { t.schedule.start_date = Some(v); }
    if let Some(m) = fields.minutes {
        t.estimated_minutes = m;
        t.schedule.time_window = None;
    }
    if let Some(w) = time_window {
        t.estimated_minutes = w.minutes();
        t.schedule.time_window = Some(w);
    }
    save_tasks(&tasks)?;
    info!("updated task {}", id);
    if !silent { println!("Task {} updated.", id); }
    Ok(())
}

/// Removes a task. Its completion history is kept so earned points stay earned.
pub fn cmd_remove(id: u64, silent: bool) -> Result<(), QuestError> {
    let mut tasks = load_tasks();
    let len_before = tasks.len();
    tasks.retain(|t| t.id != id);
    if tasks.len() == len_before {
        return Err(QuestError::TaskNotFound(id));
    }
    save_tasks(&tasks)?;
    info!("removed task {}", id);
    if !silent { println!("Task {} removed.", id); }
    Ok(())
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).add_attribute(Attribute::Bold)).collect()
}

fn time_label(task: &Task) -> String {
    match &task.schedule.time_window {
        Some(w) => w.to_string(),
        None => format!("{} min", task.estimated_minutes),
    }
}

/// Lists every task with its schedule.
pub fn cmd_list() {
    let tasks = load_tasks();
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Title", "Points", "Repeat", "Start", "Time"]));
    for t in tasks {
        let start = t.effective_schedule().start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        let repeat = Cell::new(t.schedule.repeat_type.label());
        let repeat = if let RepeatPolicy::Unrecognized(tag) = &t.schedule.repeat_type {
            debug!("task {} has unrecognized repeat policy `{}`", t.id, tag);
            repeat.fg(Color::Yellow)
        } else {
            repeat
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.points),
            repeat,
            Cell::new(start),
            Cell::new(time_label(&t)),
        ]);
    }
    println!("{table}");
}

/// Shows the tasks due on a date with their completion status.
pub fn cmd_today(date: Option<String>) -> Result<(), QuestError> {
    let date = parse_date_or_today(date.as_deref())?;
    let tasks = load_tasks();
    let completions = load_completions();
    let agenda = day_agenda(&tasks, &completions, date);
    if agenda.is_empty() {
        println!("Nothing due on {}.", date.format("%a %Y-%m-%d"));
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Title", "Time", "Points", "Repeat", "Status"]));
    for due in &agenda {
        let (status, color) = match due.record {
            Some(r) => (format!("Done ({} min)", r.actual_minutes), Color::Green),
            None => ("Pending".to_string(), Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(due.task.id),
            Cell::new(&due.task.title),
            Cell::new(time_label(due.task)),
            Cell::new(due.task.points),
            Cell::new(due.task.schedule.repeat_type.label()),
            Cell::new(status).fg(color),
        ]);
    }
    let stats = day_stats(&agenda);
    println!("{}", date.format("%a %Y-%m-%d"));
    println!("{table}");
    println!(
        "{}/{} done ({}%), {} min logged",
        stats.completed, stats.total, stats.completion_rate, stats.total_minutes
    );
    Ok(())
}

/// Records a completion of task `id` and credits its points.
///
/// The task must be due on the date, and may be completed once per date.
pub fn cmd_complete(
    id: u64,
    date: Option<String>,
    minutes: Option<u32>,
    proof: Option<Proof>,
    silent: bool,
) -> Result<CompletionRecord, QuestError> {
    let date = parse_date_or_today(date.as_deref())?;
    let task = load_task(id).ok_or(QuestError::TaskNotFound(id))?;
    if !is_due(&task.effective_schedule(), date)? {
        return Err(QuestError::NotDue { task_id: id, date });
    }
    let record = add_completion(CompletionRecord {
        id: 0,
        task_id: id,
        completion_date: date,
        actual_minutes: minutes.unwrap_or(task.estimated_minutes),
        points_earned: task.points,
        proof,
        created_at: Local::now().to_rfc3339(),
    })?;
    info!("completed task {} on {} (+{} points)", id, date, record.points_earned);
    if !silent {
        println!("Task {} completed on {}. +{} points", id, date, record.points_earned);
    }
    Ok(record)
}

/// Prints a Monday-first calendar grid of one month's occurrences.
pub fn cmd_planner(month: Option<String>) -> Result<(), QuestError> {
    let today = today();
    let (year, month) = match month {
        Some(m) => parse_month(&m)?,
        None => (today.year(), today.month()),
    };
    let (first, last) = month_bounds(year, month)?;
    let tasks = load_tasks();
    let completions = load_completions();
    let plan = month_plan(&tasks, &completions, year, month, today)?;

    let mut cells: Vec<Cell> = (0..first.weekday().num_days_from_monday())
        .map(|_| Cell::new(""))
        .collect();
    for date in first.iter_days().take_while(|d| *d <= last) {
        let mut text = date.day().to_string();
        for occ in plan.get(&date).into_iter().flatten() {
            text.push_str(&format!("\n{} {}", occ.status.marker(), occ.task.title));
        }
        let cell = Cell::new(text);
        cells.push(if date == today { cell.add_attribute(Attribute::Bold).fg(Color::Cyan) } else { cell });
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]));
    let mut cells = cells.into_iter().peekable();
    while cells.peek().is_some() {
        let mut row: Vec<Cell> = cells.by_ref().take(7).collect();
        row.resize_with(7, || Cell::new(""));
        table.add_row(row);
    }
    println!("{}", first.format("%B %Y"));
    println!("{table}");
    println!(
        "{} done  {} pending  {} missed",
        OccurrenceStatus::Completed.marker(),
        OccurrenceStatus::Pending.marker(),
        OccurrenceStatus::Missed.marker()
    );
    Ok(())
}

/// Prints completion statistics for a date range (default: the current month).
pub fn cmd_stats(from: Option<String>, to: Option<String>) -> Result<(), QuestError> {
    let today = today();
    let (month_start, month_end) = month_bounds(today.year(), today.month())?;
    let start = from.as_deref().map(parse_date).transpose()?.unwrap_or(month_start);
    let end = to.as_deref().map(parse_date).transpose()?.unwrap_or(month_end);

    let tasks = load_tasks();
    let completions = load_completions();
    let plan = plan_range(&tasks, &completions, start, end, today)?;
    let stats = range_stats(&plan);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header(&["Metric", "Value"]));
    table.add_row(vec![Cell::new("Range"), Cell::new(format!("{} .. {}", start, end))]);
    table.add_row(vec![Cell::new("Due"), Cell::new(stats.due)]);
    table.add_row(vec![Cell::new("Completed"), Cell::new(stats.completed).fg(Color::Green)]);
    table.add_row(vec![Cell::new("Pending"), Cell::new(stats.pending).fg(Color::Yellow)]);
    table.add_row(vec![Cell::new("Missed"), Cell::new(stats.missed).fg(Color::Red)]);
    table.add_row(vec![Cell::new("Completion rate"), Cell::new(format!("{}%", stats.completion_rate))]);
    table.add_row(vec![Cell::new("Points earned"), Cell::new(stats.points_earned)]);
    println!("{table}");
    Ok(())
}

/// Returns and prints the current points balance.
pub fn cmd_points(silent: bool) -> i64 {
    let balance = points_balance(&load_completions(), &load_redemptions());
    if !silent { println!("{} points", balance); }
    balance
}

/// Adds a reward and returns its id.
pub fn cmd_reward_add(
    name: String,
    points: u32,
    icon: Option<String>,
    kind: RewardKind,
    silent: bool,
) -> Result<u64, QuestError> {
    let mut rewards = load_rewards();
    let next_id = rewards.iter().map(|r| r.id).max().unwrap_or(0) + 1;
    rewards.push(Reward { id: next_id, name: name.clone(), points, icon, kind });
    save_rewards(&rewards)?;
    info!("added reward {}", next_id);
    if !silent { println!("Reward '{}' added (id = {})", name, next_id); }
    Ok(next_id)
}

/// Lists rewards, cheapest first, with what the current balance can afford.
pub fn cmd_reward_list() {
    let mut rewards = load_rewards();
    if rewards.is_empty() {
        println!("No rewards found.");
        return;
    }
    rewards.sort_by_key(|r| r.points);
    let balance = points_balance(&load_completions(), &load_redemptions());
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header(&["ID", "Reward", "Kind", "Points", "Affordable"]));
    for r in rewards {
        let affordable = balance >= i64::from(r.points);
        let name = match &r.icon {
            Some(icon) => format!("{} {}", icon, r.name),
            None => r.name.clone(),
        };
        let kind = match r.kind {
            RewardKind::Virtual => "virtual",
            RewardKind::Physical => "physical",
        };
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(name),
            Cell::new(kind),
            Cell::new(r.points),
            if affordable {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new(format!("{} short", i64::from(r.points) - balance)).fg(Color::Red)
            },
        ]);
    }
    println!("{table}");
    println!("Balance: {} points", balance);
}

pub fn cmd_reward_remove(id: u64, silent: bool) -> Result<(), QuestError> {
    let mut rewards = load_rewards();
    let len_before = rewards.len();
    rewards.retain(|r| r.id != id);
    if rewards.len() == len_before {
        return Err(QuestError::RewardNotFound(id));
    }
    save_rewards(&rewards)?;
    info!("removed reward {}", id);
    if !silent { println!("Reward {} removed.", id); }
    Ok(())
}

/// Spends points on a reward.
pub fn cmd_reward_redeem(id: u64, date: Option<String>, silent: bool) -> Result<RedemptionRecord, QuestError> {
    let date = parse_date_or_today(date.as_deref())?;
    let reward = load_rewards()
        .into_iter()
        .find(|r| r.id == id)
        .ok_or(QuestError::RewardNotFound(id))?;
    let mut redemptions = load_redemptions();
    let balance = points_balance(&load_completions(), &redemptions);
    if balance < i64::from(reward.points) {
        return Err(QuestError::InsufficientPoints {
            needed: i64::from(reward.points),
            available: balance,
        });
    }
    let record = RedemptionRecord {
        id: redemptions.iter().map(|r| r.id).max().unwrap_or(0) + 1,
        reward_id: reward.id,
        reward_name: reward.name.clone(),
        redemption_date: date,
        points_spent: reward.points,
    };
    redemptions.push(record.clone());
    save_redemptions(&redemptions)?;
    info!("redeemed reward {} for {} points", reward.id, reward.points);
    if !silent {
        println!(
            "Redeemed '{}' for {} points. {} points left.",
            reward.name,
            reward.points,
            balance - i64::from(reward.points)
        );
    }
    Ok(record)
}

/// Lists past redemptions, newest first.
pub fn cmd_reward_history() {
    let mut redemptions = load_redemptions();
    if redemptions.is_empty() {
        println!("No redemptions yet.");
        return;
    }
    redemptions.sort_by(|a, b| b.redemption_date.cmp(&a.redemption_date).then(b.id.cmp(&a.id)));
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header(&["Date", "Reward", "Points"]));
    for r in redemptions {
        table.add_row(vec![
            Cell::new(r.redemption_date),
            Cell::new(r.reward_name),
            Cell::new(format!("-{}", r.points_spent)).fg(Color::Red),
        ]);
    }
    println!("{table}");
}

/// Resets the database by deleting all tasks, records and rewards.
pub fn cmd_reset(force: bool) -> Result<(), QuestError> {
    if !force {
        print!("Are you sure you want to delete all tasks, records and rewards? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    delete_database()?;
    println!("Database reset successfully.");
    Ok(())
}
