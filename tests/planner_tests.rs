use chrono::NaiveDate;
use learnquest::models::{CompletionRecord, RedemptionRecord, Task};
use learnquest::planner::*;
use learnquest::recurrence::{RecurrenceError, RepeatPolicy, TaskDefinition, TimeWindow};
use learnquest::stats::{day_stats, points_balance, range_stats};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn task(id: u64, policy: RepeatPolicy, anchor: NaiveDate, slot: Option<&str>) -> Task {
    let mut schedule = TaskDefinition::new(anchor, policy);
    schedule.time_window = slot.map(|s| s.parse::<TimeWindow>().unwrap());
    Task {
        id,
        title: format!("Task {}", id),
        description: None,
        points: 10 * id as u32,
        estimated_minutes: 30,
        schedule,
        created_at: "2024-01-01T00:00:00+00:00".into(),
    }
}

fn done(id: u64, task_id: u64, date: NaiveDate, minutes: u32) -> CompletionRecord {
    CompletionRecord {
        id,
        task_id,
        completion_date: date,
        actual_minutes: minutes,
        points_earned: 10 * task_id as u32,
        proof: None,
        created_at: "2024-01-01T00:00:00+00:00".into(),
    }
}

#[test]
fn test_day_agenda_orders_slots_first() {
    let tasks = vec![
        task(1, RepeatPolicy::Daily, d(2024, 1, 1), None),
        task(2, RepeatPolicy::Daily, d(2024, 1, 1), Some("19:00-19:30")),
        task(3, RepeatPolicy::Weekly, d(2024, 1, 1), None),
        task(4, RepeatPolicy::Daily, d(2024, 1, 1), Some("07:00-07:30")),
    ];
    let agenda = day_agenda(&tasks, &[], d(2024, 1, 8));
    let ids: Vec<u64> = agenda.iter().map(|a| a.task.id).collect();
    assert_eq!(ids, vec![4, 2, 1, 3]);

    let agenda = day_agenda(&tasks, &[], d(2024, 1, 9));
    let ids: Vec<u64> = agenda.iter().map(|a| a.task.id).collect();
    assert_eq!(ids, vec![4, 2, 1]);
}

#[test]
fn test_day_agenda_anchors_on_creation_date() {
    let mut legacy = task(1, RepeatPolicy::Daily, d(2024, 1, 1), None);
    legacy.schedule.start_date = None;
    legacy.created_at = "2024-01-03T21:15:00+02:00".into();
    let tasks = vec![legacy, task(2, RepeatPolicy::Daily, d(2024, 1, 1), None)];

    let agenda = day_agenda(&tasks, &[], d(2024, 1, 2));
    let ids: Vec<u64> = agenda.iter().map(|a| a.task.id).collect();
    assert_eq!(ids, vec![2]);

    let agenda = day_agenda(&tasks, &[], d(2024, 1, 5));
    let ids: Vec<u64> = agenda.iter().map(|a| a.task.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let plan = month_plan(&tasks, &[], 2024, 1, d(2024, 1, 1)).unwrap();
    assert_eq!(plan[&d(2024, 1, 3)].len(), 2);
    assert_eq!(plan[&d(2024, 1, 2)].len(), 1);
}

#[test]
fn test_day_agenda_skips_tasks_without_any_date() {
    let mut broken = task(1, RepeatPolicy::Daily, d(2024, 1, 1), None);
    broken.schedule.start_date = None;
    broken.created_at = "sometime".into();
    let tasks = vec![broken, task(2, RepeatPolicy::Daily, d(2024, 1, 1), None)];
    let agenda = day_agenda(&tasks, &[], d(2024, 1, 2));
    assert_eq!(agenda.len(), 1);
    assert_eq!(agenda[0].task.id, 2);
}

#[test]
fn test_day_stats() {
    let tasks = vec![
        task(1, RepeatPolicy::Daily, d(2024, 1, 1), None),
        task(2, RepeatPolicy::Daily, d(2024, 1, 1), None),
        task(3, RepeatPolicy::Daily, d(2024, 1, 1), None),
    ];
    let completions = vec![done(1, 1, d(2024, 1, 2), 25), done(2, 3, d(2024, 1, 2), 40), done(3, 2, d(2024, 1, 1), 5)];
    let agenda = day_agenda(&tasks, &completions, d(2024, 1, 2));
    assert!(agenda[0].is_completed());
    assert!(!agenda[1].is_completed());

    let stats = day_stats(&agenda);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.completion_rate, 67);
    assert_eq!(stats.total_minutes, 65);

    assert_eq!(day_stats(&[]).completion_rate, 0);
}

#[test]
fn test_month_plan_statuses() {
    let tasks = vec![task(1, RepeatPolicy::Weekly, d(2024, 1, 1), None)];
    let completions = vec![done(1, 1, d(2024, 1, 8), 30)];
    let plan = month_plan(&tasks, &completions, 2024, 1, d(2024, 1, 15)).unwrap();

    let statuses: Vec<(NaiveDate, OccurrenceStatus)> = plan
        .iter()
        .map(|(date, occ)| (*date, occ[0].status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (d(2024, 1, 1), OccurrenceStatus::Missed),
            (d(2024, 1, 8), OccurrenceStatus::Completed),
            (d(2024, 1, 15), OccurrenceStatus::Pending),
            (d(2024, 1, 22), OccurrenceStatus::Pending),
            (d(2024, 1, 29), OccurrenceStatus::Pending),
        ]
    );

    let stats = range_stats(&plan);
    assert_eq!(stats.due, 5);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.missed, 1);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.completion_rate, 20);
    assert_eq!(stats.points_earned, 10);
}

#[test]
fn test_month_plan_agrees_with_agenda() {
    let tasks = vec![
        task(1, RepeatPolicy::Ebbinghaus, d(2024, 2, 20), None),
        task(2, RepeatPolicy::MonthlyCross, d(2024, 1, 31), Some("08:00-09:00")),
        task(3, RepeatPolicy::BiweeklyCross, d(2024, 2, 7), None),
        task(4, RepeatPolicy::WeekCrossOnce, d(2024, 2, 14), None),
    ];
    let plan = month_plan(&tasks, &[], 2024, 2, d(2024, 2, 1)).unwrap();
    let (first, last) = month_bounds(2024, 2).unwrap();
    for date in first.iter_days().take_while(|day| *day <= last) {
        let from_plan: Vec<u64> = plan
            .get(&date)
            .map(|occ| occ.iter().map(|o| o.task.id).collect())
            .unwrap_or_default();
        let from_agenda: Vec<u64> = day_agenda(&tasks, &[], date).iter().map(|a| a.task.id).collect();
        assert_eq!(from_plan, from_agenda, "disagreement on {}", date);
    }
    assert_eq!(plan[&d(2024, 2, 29)][0].task.id, 2);
}

#[test]
fn test_month_bounds() {
    assert_eq!(month_bounds(2024, 2).unwrap(), (d(2024, 2, 1), d(2024, 2, 29)));
    assert_eq!(month_bounds(2023, 12).unwrap(), (d(2023, 12, 1), d(2023, 12, 31)));
    assert!(matches!(month_bounds(2024, 13), Err(RecurrenceError::InvalidArgument(_))));
}

#[test]
fn test_plan_range_rejects_inverted_range() {
    let tasks = vec![task(1, RepeatPolicy::Daily, d(2024, 1, 1), None)];
    assert!(plan_range(&tasks, &[], d(2024, 2, 1), d(2024, 1, 1), d(2024, 1, 1)).is_err());
}

#[test]
fn test_plan_range_rejects_oversized_range() {
    let tasks = vec![task(1, RepeatPolicy::Daily, d(2024, 1, 1), None)];
    let err = plan_range(&tasks, &[], d(1, 1, 1), d(9999, 12, 31), d(2024, 1, 1)).unwrap_err();
    assert!(matches!(err, RecurrenceError::InvalidArgument(_)));

    // A full leap year still fits
    let plan = plan_range(&tasks, &[], d(2024, 1, 1), d(2024, 12, 31), d(2024, 1, 1)).unwrap();
    assert_eq!(plan.len(), MAX_PLAN_DAYS as usize);
    assert!(plan_range(&tasks, &[], d(2024, 1, 1), d(2025, 1, 1), d(2024, 1, 1)).is_err());
}

#[test]
fn test_range_stats_uses_recorded_points() {
    let mut t = task(1, RepeatPolicy::Daily, d(2024, 1, 1), None);
    let completions = vec![done(1, 1, d(2024, 1, 2), 30), done(2, 1, d(2024, 1, 3), 30)];
    // Points were raised after both completions were recorded
    t.points = 50;
    let tasks = vec![t];

    let plan = plan_range(&tasks, &completions, d(2024, 1, 1), d(2024, 1, 7), d(2024, 1, 8)).unwrap();
    assert_eq!(plan[&d(2024, 1, 2)][0].record.map(|r| r.id), Some(1));
    assert!(plan[&d(2024, 1, 4)][0].record.is_none());

    let stats = range_stats(&plan);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.points_earned, 20);
    assert_eq!(stats.points_earned as i64, points_balance(&completions, &[]));
}

#[test]
fn test_points_balance() {
    let completions = vec![done(1, 2, d(2024, 1, 1), 30), done(2, 3, d(2024, 1, 1), 30)];
    let redemptions = vec![RedemptionRecord {
        id: 1,
        reward_id: 1,
        reward_name: "Game".into(),
        redemption_date: d(2024, 1, 2),
        points_spent: 35,
    }];
    assert_eq!(points_balance(&completions, &redemptions), 15);
    assert_eq!(points_balance(&[], &redemptions), -35);
}
