use crate::models::{CompletionRecord, RedemptionRecord};
use crate::planner::{DueTask, OccurrenceStatus, Plan};

/// Summary of a single day's agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayStats {
    pub total: usize,
    pub completed: usize,
    /// Rounded percentage, 0 when nothing is due.
    pub completion_rate: u32,
    /// Minutes logged across the day's completions.
    pub total_minutes: u32,
}

/// Summary of every occurrence in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeStats {
    pub due: usize,
    pub completed: usize,
    pub missed: usize,
    pub pending: usize,
    pub completion_rate: u32,
    /// Points recorded on the completed occurrences.
    pub points_earned: u64,
}

fn rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

/// Calculates completion statistics for a day's agenda.
pub fn day_stats(agenda: &[DueTask]) -> DayStats {
    let completed: Vec<&CompletionRecord> = agenda.iter().filter_map(|d| d.record).collect();
    DayStats {
        total: agenda.len(),
        completed: completed.len(),
        completion_rate: rate(completed.len(), agenda.len()),
        total_minutes: completed.iter().map(|r| r.actual_minutes).sum(),
    }
}

/// Calculates completion statistics over a date-range plan.
pub fn range_stats(plan: &Plan) -> RangeStats {
    let mut stats = RangeStats::default();
    for occurrence in plan.values().flatten() {
        stats.due += 1;
        match occurrence.status {
            OccurrenceStatus::Completed => {
                stats.completed += 1;
                stats.points_earned += occurrence.record.map_or(0, |r| u64::from(r.points_earned));
            }
            OccurrenceStatus::Missed => stats.missed += 1,
            OccurrenceStatus::Pending => stats.pending += 1,
        }
    }
    stats.completion_rate = rate(stats.completed, stats.due);
    stats
}

/// Points available to spend: everything earned minus everything redeemed.
pub fn points_balance(completions: &[CompletionRecord], redemptions: &[RedemptionRecord]) -> i64 {
    let earned: i64 = completions.iter().map(|r| i64::from(r.points_earned)).sum();
    let spent: i64 = redemptions.iter().map(|r| i64::from(r.points_spent)).sum();
    earned - spent
}
