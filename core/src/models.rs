use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default display color for a new category.
pub const DEFAULT_CATEGORY_COLOR: &str = "#667eea";

/// Color used for the synthetic "Uncategorized" analytics bucket.
pub const UNCATEGORIZED_COLOR: &str = "#999999";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub habit_type: String,
    pub target_hours: Option<i64>,
    pub target_value: Option<i64>,
    pub target_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub name: String,
    pub habit_type: String,
    pub target_hours: Option<i64>,
    pub target_value: Option<i64>,
    pub target_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitLog {
    pub id: i64,
    pub habit_id: i64,
    pub log_date: String,
    pub hours_spent: Option<f64>,
    pub value: Option<i64>,
    pub completed: bool,
    pub completion_percentage: Option<i64>,
    pub notes: String,
    // Joined habit fields for the daily list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub habit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHabitLog {
    pub habit_id: i64,
    pub log_date: chrono::NaiveDate,
    pub hours_spent: Option<f64>,
    pub value: Option<i64>,
    pub completed: bool,
    pub completion_percentage: Option<i64>,
    pub notes: String,
}

/// Whole-row replacement for an existing log entry.
///
/// An absent numeric field becomes NULL, `completed` defaults to false and
/// `notes` to empty, the same defaults insert applies.
#[derive(Debug, Clone, Default)]
pub struct UpdateHabitLog {
    pub hours_spent: Option<f64>,
    pub value: Option<i64>,
    pub completed: bool,
    pub completion_percentage: Option<i64>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub created_at: String,
    // Joined category fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeBlock {
    pub id: i64,
    pub block_date: String,
    pub start_time: String,
    pub end_time: String,
    pub activity: String,
    pub duration_minutes: i64,
    pub category_id: Option<i64>,
    pub task_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTimeBlock {
    pub block_date: chrono::NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub activity: String,
    pub category_id: Option<i64>,
    pub task_id: Option<i64>,
}

/// Field set for updating a block; the date is fixed at creation.
#[derive(Debug, Clone)]
pub struct UpdateTimeBlock {
    pub start_time: String,
    pub end_time: String,
    pub activity: String,
    pub category_id: Option<i64>,
    pub task_id: Option<i64>,
}

/// One day's blocks plus the tracked-time rollup.
#[derive(Debug, Clone, Serialize)]
pub struct DayBlocks {
    pub blocks: Vec<TimeBlock>,
    pub total_minutes: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitProgress {
    pub name: String,
    pub target_hours: Option<i64>,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStat {
    /// None for the synthetic "Uncategorized" bucket.
    pub id: Option<i64>,
    pub name: String,
    pub color: String,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub block_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAnalytics {
    pub start_date: String,
    pub end_date: String,
    pub categories: Vec<CategoryStat>,
    pub total_minutes: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStat {
    pub id: i64,
    pub name: String,
    pub category_name: Option<String>,
    pub color: Option<String>,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub block_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskAnalytics {
    pub start_date: String,
    pub end_date: String,
    pub tasks: Vec<TaskStat>,
    pub total_minutes: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitStat {
    pub id: i64,
    pub name: String,
    pub habit_type: String,
    pub target_type: String,
    pub target_hours: Option<i64>,
    pub log_count: i64,
    pub completed_count: i64,
    /// Mean per-log completion: the stored percentage when present, else
    /// 100/0 from the completed flag. Rounded to 1 decimal.
    pub avg_completion: f64,
    pub total_hours: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitAnalytics {
    pub start_date: String,
    pub end_date: String,
    pub habits: Vec<HabitStat>,
}

// Joined row shapes backing the CSV export files.

#[derive(Debug, Clone)]
pub struct HabitLogExportRow {
    pub habit_name: String,
    pub habit_type: String,
    pub target_hours: Option<i64>,
    pub log_date: String,
    pub hours_spent: Option<f64>,
    pub completed: bool,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct TimeBlockExportRow {
    pub block_date: String,
    pub start_time: String,
    pub end_time: String,
    pub activity: String,
    pub duration_minutes: i64,
    pub category: Option<String>,
    pub task: Option<String>,
}

/// Outcome of a CSV import: rows inserted plus the per-row failures that were
/// recovered and skipped.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
}

/// Minutes between two "HH:MM" wall-clock times on the same (arbitrary) day.
///
/// `end <= start` yields a zero or negative duration. Integer division
/// truncates toward zero and the result is stored as-is, never clamped or
/// wrapped across midnight.
pub fn duration_minutes(start: &str, end: &str) -> Result<i64> {
    let start_t = parse_hhmm(start)?;
    let end_t = parse_hhmm(end)?;
    Ok((end_t - start_t).num_seconds() / 60)
}

fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| StoreError::Malformed(format!("Invalid time '{s}'. Use HH:MM")))
}

/// Round to 1 decimal, half away from zero.
#[must_use]
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round to 2 decimals, half away from zero.
#[must_use]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Minutes-to-hours conversion used everywhere a rollup is reported.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn minutes_to_hours(minutes: i64) -> f64 {
    round2(minutes as f64 / 60.0)
}
