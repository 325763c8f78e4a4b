//! Progress aggregation over completed attempts and their set logs.

use crate::calendar::{self, local_date};
use crate::{ExerciseSetLog, SessionAttempt};
use chrono::{Datelike, Days, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Local completion date of every completed attempt (duplicates kept)
pub fn completion_dates(attempts: &[SessionAttempt], offset: FixedOffset) -> Vec<NaiveDate> {
    attempts
        .iter()
        .filter_map(|a| a.completed_at)
        .map(|at| local_date(at, offset))
        .collect()
}

/// Consecutive days with a completion, counting back from today
///
/// A day without training today does not break the streak yet: the walk
/// then starts from yesterday. Two missed days in a row end it.
pub fn streak(completed: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = completed.iter().copied().collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut count = 0;
    while days.contains(&cursor) {
        count += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    count
}

/// Completion count over one calendar period
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub label: String,
    pub start: NaiveDate,
    pub count: usize,
}

/// Completions per Monday-start week for the trailing `weeks_back` weeks,
/// oldest first; the last bucket is the current week
pub fn weekly_buckets(completed: &[NaiveDate], today: NaiveDate, weeks_back: u32) -> Vec<PeriodBucket> {
    let current = calendar::week_start(today);

    (0..weeks_back)
        .rev()
        .map(|ago| {
            let start = current - Days::new(7 * u64::from(ago));
            let end = start + Days::new(7);
            PeriodBucket {
                label: start.format("%b %-d").to_string(),
                start,
                count: completed.iter().filter(|d| **d >= start && **d < end).count(),
            }
        })
        .collect()
}

/// Completions per calendar month for the trailing `months_back` months,
/// oldest first; the last bucket is the current month
pub fn monthly_buckets(completed: &[NaiveDate], today: NaiveDate, months_back: u32) -> Vec<PeriodBucket> {
    (0..months_back as i32)
        .rev()
        .map(|ago| {
            let start = calendar::first_of_month(today.year(), today.month() as i32 - ago);
            let key = calendar::year_month(start);
            PeriodBucket {
                label: start.format("%b %Y").to_string(),
                start,
                count: completed
                    .iter()
                    .filter(|d| calendar::year_month(**d) == key)
                    .count(),
            }
        })
        .collect()
}

/// Headline completion counts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub this_week: usize,
    pub this_month: usize,
    pub total: usize,
}

pub fn completion_summary(completed: &[NaiveDate], today: NaiveDate) -> CompletionSummary {
    let week_start = calendar::week_start(today);
    let week_end = week_start + Days::new(7);
    let month = calendar::year_month(today);

    CompletionSummary {
        this_week: completed
            .iter()
            .filter(|d| **d >= week_start && **d < week_end)
            .count(),
        this_month: completed
            .iter()
            .filter(|d| calendar::year_month(**d) == month)
            .count(),
        total: completed.len(),
    }
}

// ============================================================================
// Exercise History
// ============================================================================

/// A set log joined with its exercise name and local date
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistoryEntry {
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub weight_kg: Option<f64>,
    pub reps_completed: Option<u32>,
    pub date: NaiveDate,
}

/// Heaviest set seen for one exercise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub name: String,
    pub weight: f64,
    pub reps: Option<u32>,
    pub date: NaiveDate,
}

/// Join set logs with exercise names, in the order they were logged
pub fn history_entries(
    logs: &[ExerciseSetLog],
    exercise_names: &HashMap<Uuid, String>,
    offset: FixedOffset,
) -> Vec<ExerciseHistoryEntry> {
    let mut ordered: Vec<&ExerciseSetLog> = logs.iter().collect();
    ordered.sort_by_key(|log| log.logged_at);

    ordered
        .into_iter()
        .map(|log| ExerciseHistoryEntry {
            exercise_id: log.exercise_id,
            exercise_name: exercise_names
                .get(&log.exercise_id)
                .cloned()
                .unwrap_or_else(|| "Unknown exercise".to_string()),
            weight_kg: log.weight_kg,
            reps_completed: log.reps_completed,
            date: local_date(log.logged_at, offset),
        })
        .collect()
}

/// Heaviest logged weight per exercise
///
/// Ties keep the first entry encountered; entries without a weight are
/// ignored.
pub fn personal_records(entries: &[ExerciseHistoryEntry]) -> HashMap<Uuid, PersonalRecord> {
    let mut records: HashMap<Uuid, PersonalRecord> = HashMap::new();

    for entry in entries {
        let Some(weight) = entry.weight_kg else {
            continue;
        };

        let beats_current = records
            .get(&entry.exercise_id)
            .map_or(true, |current| weight > current.weight);

        if beats_current {
            records.insert(
                entry.exercise_id,
                PersonalRecord {
                    name: entry.exercise_name.clone(),
                    weight,
                    reps: entry.reps_completed,
                    date: entry.date,
                },
            );
        }
    }

    records
}

/// Sum of weight x reps over all logs; a missing value contributes zero
pub fn total_volume(logs: &[ExerciseSetLog]) -> f64 {
    logs.iter()
        .map(|log| match (log.weight_kg, log.reps_completed) {
            (Some(weight), Some(reps)) => weight * f64::from(reps),
            _ => 0.0,
        })
        .sum()
}

// ============================================================================
// Report
// ============================================================================

/// Everything the progress screen shows for one athlete
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressReport {
    pub streak: u32,
    pub summary: CompletionSummary,
    pub weekly: Vec<PeriodBucket>,
    pub monthly: Vec<PeriodBucket>,
    pub total_volume: f64,
    pub personal_records: Vec<PersonalRecord>,
}

/// Inputs and windows for [`ProgressReport::build`]
pub struct ReportWindow {
    pub today: NaiveDate,
    pub offset: FixedOffset,
    pub weeks_back: u32,
    pub months_back: u32,
}

impl ProgressReport {
    pub fn build(
        attempts: &[SessionAttempt],
        logs: &[ExerciseSetLog],
        exercise_names: &HashMap<Uuid, String>,
        window: &ReportWindow,
    ) -> Self {
        let dates = completion_dates(attempts, window.offset);
        let entries = history_entries(logs, exercise_names, window.offset);

        let mut records: Vec<PersonalRecord> = personal_records(&entries).into_values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        let report = ProgressReport {
            streak: streak(&dates, window.today),
            summary: completion_summary(&dates, window.today),
            weekly: weekly_buckets(&dates, window.today, window.weeks_back),
            monthly: monthly_buckets(&dates, window.today, window.months_back),
            total_volume: total_volume(logs),
            personal_records: records,
        };

        tracing::debug!(
            "Progress report: streak {}, {} completions, {} PRs",
            report.streak,
            report.summary.total,
            report.personal_records.len()
        );
        report
    }
}
