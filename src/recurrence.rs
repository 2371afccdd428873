use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Day offsets from the anchor on which an Ebbinghaus review is due.
pub const EBBINGHAUS_OFFSETS: [i64; 7] = [0, 1, 2, 4, 7, 15, 30];

/// Errors raised when a recurrence query violates its preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// How often a task comes back after its anchor date.
///
/// Stored as a snake_case tag. Tags this build does not know are kept verbatim in
/// `Unrecognized` and scheduled like `Daily`, so a task never disappears because of
/// a newer or corrupted tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "String")]
pub enum RepeatPolicy {
    /// Only on the anchor date.
    Once,
    /// Every day from the anchor onward.
    #[default]
    Daily,
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Spaced repetition at [`EBBINGHAUS_OFFSETS`].
    Ebbinghaus,
    /// Any day of the anchor's ISO week, that week only.
    WeekCrossOnce,
    /// Any day of the two ISO weeks starting with the anchor's week.
    BiweekCrossOnce,
    /// Any day of the anchor's calendar month.
    MonthCrossOnce,
    /// Any day, every ISO week.
    WeeklyCross,
    /// Any day of every other ISO week, counted from the anchor's week.
    BiweeklyCross,
    /// The anchor's day-of-month every month, clamped to short months.
    MonthlyCross,
    /// Unknown tag, scheduled like `Daily`.
    Unrecognized(String),
}

impl RepeatPolicy {
    /// Every policy a user may pick, in menu order.
    pub const KNOWN: [RepeatPolicy; 11] = [
        RepeatPolicy::Once,
        RepeatPolicy::Daily,
        RepeatPolicy::Weekly,
        RepeatPolicy::Biweekly,
        RepeatPolicy::Ebbinghaus,
        RepeatPolicy::WeekCrossOnce,
        RepeatPolicy::BiweekCrossOnce,
        RepeatPolicy::MonthCrossOnce,
        RepeatPolicy::WeeklyCross,
        RepeatPolicy::BiweeklyCross,
        RepeatPolicy::MonthlyCross,
    ];

    /// Parses a stored tag. Never fails: empty means `Daily`, unknown tags are kept.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "" | "daily" => RepeatPolicy::Daily,
            "once" => RepeatPolicy::Once,
            "weekly" => RepeatPolicy::Weekly,
            "biweekly" => RepeatPolicy::Biweekly,
            "ebbinghaus" => RepeatPolicy::Ebbinghaus,
            "week_cross" | "weekCrossOnce" => RepeatPolicy::WeekCrossOnce,
            "biweek_cross" | "biweekCrossOnce" => RepeatPolicy::BiweekCrossOnce,
            "month_cross" | "monthCrossOnce" => RepeatPolicy::MonthCrossOnce,
            "weekly_cross" | "weeklyCross" => RepeatPolicy::WeeklyCross,
            "biweekly_cross" | "biweeklyCross" => RepeatPolicy::BiweeklyCross,
            "monthly_cross" | "monthlyCross" => RepeatPolicy::MonthlyCross,
            other => RepeatPolicy::Unrecognized(other.to_string()),
        }
    }

    /// Parses user input, rejecting tags that would fall back to `Daily`.
    pub fn parse_known(tag: &str) -> Result<Self, RecurrenceError> {
        match Self::from_tag(tag) {
            RepeatPolicy::Unrecognized(t) => Err(RecurrenceError::InvalidArgument(format!(
                "unknown repeat policy `{t}`"
            ))),
            policy => Ok(policy),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            RepeatPolicy::Once => "once",
            RepeatPolicy::Daily => "daily",
            RepeatPolicy::Weekly => "weekly",
            RepeatPolicy::Biweekly => "biweekly",
            RepeatPolicy::Ebbinghaus => "ebbinghaus",
            RepeatPolicy::WeekCrossOnce => "week_cross",
            RepeatPolicy::BiweekCrossOnce => "biweek_cross",
            RepeatPolicy::MonthCrossOnce => "month_cross",
            RepeatPolicy::WeeklyCross => "weekly_cross",
            RepeatPolicy::BiweeklyCross => "biweekly_cross",
            RepeatPolicy::MonthlyCross => "monthly_cross",
            RepeatPolicy::Unrecognized(tag) => tag,
        }
    }

    /// Short human-readable description for listings.
    pub fn label(&self) -> &'static str {
        match self {
            RepeatPolicy::Once => "Once",
            RepeatPolicy::Daily => "Every day",
            RepeatPolicy::Weekly => "Every week",
            RepeatPolicy::Biweekly => "Every two weeks",
            RepeatPolicy::Ebbinghaus => "Ebbinghaus review",
            RepeatPolicy::WeekCrossOnce => "Once this week",
            RepeatPolicy::BiweekCrossOnce => "Once these two weeks",
            RepeatPolicy::MonthCrossOnce => "Once this month",
            RepeatPolicy::WeeklyCross => "Once every week",
            RepeatPolicy::BiweeklyCross => "Once every two weeks",
            RepeatPolicy::MonthlyCross => "Once every month",
            RepeatPolicy::Unrecognized(_) => "Every day",
        }
    }
}

impl From<String> for RepeatPolicy {
    fn from(tag: String) -> Self {
        RepeatPolicy::from_tag(&tag)
    }
}

/// Reads a stored tag value. Blank strings and `null` carry no policy; any other
/// non-string value is kept as an unrecognized tag.
fn policy_from_value(value: &Value) -> Option<RepeatPolicy> {
    match value {
        Value::Null => None,
        Value::String(tag) if tag.trim().is_empty() => None,
        Value::String(tag) => Some(RepeatPolicy::from_tag(tag)),
        other => Some(RepeatPolicy::Unrecognized(other.to_string())),
    }
}

impl<'de> Deserialize<'de> for RepeatPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(policy_from_value(&value).unwrap_or_default())
    }
}

impl From<RepeatPolicy> for String {
    fn from(policy: RepeatPolicy) -> Self {
        policy.as_tag().to_string()
    }
}

impl fmt::Display for RepeatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Clock window a task is scheduled in. Only used for ordering and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, RecurrenceError> {
        if end <= start {
            return Err(RecurrenceError::InvalidArgument(format!(
                "time window ends ({}) before it starts ({})",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(TimeWindow { start, end })
    }

    pub fn minutes(&self) -> u32 {
        (self.end - self.start).num_minutes().max(0) as u32
    }
}

impl FromStr for TimeWindow {
    type Err = RecurrenceError;

    /// Parses `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RecurrenceError::InvalidArgument(format!("invalid time window `{s}`, use HH:MM-HH:MM"));
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| invalid())?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| invalid())?;
        TimeWindow::new(start, end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Parses a stored date: `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub fn parse_stored_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::from_str(input)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
}

/// The scheduling half of a task: when it starts and how it repeats.
///
/// Deserialization never fails on a bad field: an unreadable start date or time
/// window reads as absent, and the repeat tag falls back from `repeat_type` to the
/// legacy `task_type` to `Daily`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "StoredDefinition")]
pub struct TaskDefinition {
    /// Anchor date. Required by every query.
    pub start_date: Option<NaiveDate>,
    pub repeat_type: RepeatPolicy,
    pub time_window: Option<TimeWindow>,
}

#[derive(Deserialize)]
struct StoredDefinition {
    #[serde(default)]
    start_date: Option<Value>,
    #[serde(default)]
    repeat_type: Option<Value>,
    #[serde(default)]
    task_type: Option<Value>,
    #[serde(default)]
    time_window: Option<Value>,
}

impl From<StoredDefinition> for TaskDefinition {
    fn from(stored: StoredDefinition) -> Self {
        let repeat_type = [stored.repeat_type, stored.task_type]
            .iter()
            .flatten()
            .find_map(policy_from_value)
            .unwrap_or_default();
        TaskDefinition {
            start_date: stored.start_date.as_ref().and_then(Value::as_str).and_then(parse_stored_date),
            repeat_type,
            time_window: stored.time_window.and_then(|v| serde_json::from_value(v).ok()),
        }
    }
}

impl TaskDefinition {
    pub fn new(start_date: NaiveDate, repeat_type: RepeatPolicy) -> Self {
        TaskDefinition {
            start_date: Some(start_date),
            repeat_type,
            time_window: None,
        }
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Returns the anchor date or `InvalidArgument` when it is missing.
    pub fn anchor(&self) -> Result<NaiveDate, RecurrenceError> {
        self.start_date
            .ok_or_else(|| RecurrenceError::InvalidArgument("task has no start date".into()))
    }
}

impl AsRef<TaskDefinition> for TaskDefinition {
    fn as_ref(&self) -> &TaskDefinition {
        self
    }
}

/// Returns whether `task` is due on `date`.
///
/// This is the single predicate behind every occurrence query in the crate.
///
/// # Errors
/// - `InvalidArgument` when the task has no anchor date.
pub fn is_due(task: &TaskDefinition, date: NaiveDate) -> Result<bool, RecurrenceError> {
    let anchor = task.anchor()?;
    Ok(policy_matches(&task.repeat_type, anchor, date))
}

/// Returns every date in `[start, end]` on which `task` is due.
///
/// Equal by construction to filtering the inclusive day sweep with [`is_due`].
///
/// # Errors
/// - `InvalidArgument` when `end < start` or the task has no anchor date.
pub fn occurrences_in_range(
    task: &TaskDefinition,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BTreeSet<NaiveDate>, RecurrenceError> {
    check_range(start, end)?;
    let mut due = BTreeSet::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        if is_due(task, date)? {
            due.insert(date);
        }
    }
    Ok(due)
}

/// Groups the occurrences of many tasks by date. Dates with nothing due are absent.
///
/// Tasks keep their slice order within a day.
pub fn occurrences_by_day<T: AsRef<TaskDefinition>>(
    tasks: &[T],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BTreeMap<NaiveDate, Vec<&T>>, RecurrenceError> {
    check_range(start, end)?;
    let mut days: BTreeMap<NaiveDate, Vec<&T>> = BTreeMap::new();
    for task in tasks {
        for date in occurrences_in_range(task.as_ref(), start, end)? {
            days.entry(date).or_default().push(task);
        }
    }
    Ok(days)
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), RecurrenceError> {
    if end < start {
        return Err(RecurrenceError::InvalidArgument(format!(
            "range end {end} is before start {start}"
        )));
    }
    Ok(())
}

fn policy_matches(policy: &RepeatPolicy, anchor: NaiveDate, date: NaiveDate) -> bool {
    let diff_days = (date - anchor).num_days();
    if diff_days < 0 {
        return false;
    }
    match policy {
        RepeatPolicy::Once => diff_days == 0,
        RepeatPolicy::Daily => true,
        RepeatPolicy::Weekly => diff_days % 7 == 0,
        RepeatPolicy::Biweekly => diff_days % 14 == 0,
        RepeatPolicy::Ebbinghaus => EBBINGHAUS_OFFSETS.contains(&diff_days),
        RepeatPolicy::WeekCrossOnce => date.iso_week() == anchor.iso_week(),
        RepeatPolicy::BiweekCrossOnce => weeks_between(anchor, date) < 2,
        RepeatPolicy::MonthCrossOnce => {
            date.year() == anchor.year() && date.month() == anchor.month()
        }
        // Every week from the anchor's week on is a bucket.
        RepeatPolicy::WeeklyCross => true,
        RepeatPolicy::BiweeklyCross => weeks_between(anchor, date) % 2 == 0,
        RepeatPolicy::MonthlyCross => {
            let last = days_in_month(date.year(), date.month());
            date.day() == anchor.day().min(last)
        }
        RepeatPolicy::Unrecognized(_) => true,
    }
}

/// Monday of the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Whole ISO weeks from the week of `from` to the week of `to`.
fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (week_start(to) - week_start(from)).num_days() / 7
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn days_in_month_handles_leap_years_and_december() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn week_start_is_monday() {
        // 2024-01-07 is a Sunday
        assert_eq!(week_start(d(2024, 1, 7)), d(2024, 1, 1));
        assert_eq!(week_start(d(2024, 1, 8)), d(2024, 1, 8));
    }

    #[test]
    fn tags_round_trip_through_strings() {
        for policy in RepeatPolicy::KNOWN {
            assert_eq!(RepeatPolicy::from_tag(policy.as_tag()), policy);
        }
        assert_eq!(RepeatPolicy::from_tag("weekCrossOnce"), RepeatPolicy::WeekCrossOnce);
        assert_eq!(RepeatPolicy::from_tag(""), RepeatPolicy::Daily);
    }

    #[test]
    fn stored_definitions_read_leniently() {
        let def: TaskDefinition =
            serde_json::from_str(r#"{"start_date":"2024-01-01","repeat_type":null,"task_type":"weekly"}"#).unwrap();
        assert_eq!(def.repeat_type, RepeatPolicy::Weekly);

        let def: TaskDefinition = serde_json::from_str(r#"{"repeat_type":["x"],"time_window":"noon"}"#).unwrap();
        assert_eq!(def.repeat_type, RepeatPolicy::Unrecognized(r#"["x"]"#.into()));
        assert_eq!(def.start_date, None);
        assert_eq!(def.time_window, None);

        assert_eq!(parse_stored_date("2024-03-05"), Some(d(2024, 3, 5)));
        assert_eq!(parse_stored_date("2024-03-05T23:30:00-05:00"), Some(d(2024, 3, 5)));
        assert_eq!(parse_stored_date("March"), None);
    }

    #[test]
    fn time_window_parses_and_rejects_inverted_ranges() {
        let w: TimeWindow = "19:00-19:30".parse().unwrap();
        assert_eq!(w.minutes(), 30);
        assert_eq!(w.to_string(), "19:00-19:30");
        assert!("19:30-19:00".parse::<TimeWindow>().is_err());
        assert!("7pm".parse::<TimeWindow>().is_err());
    }
}
