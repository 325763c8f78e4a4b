//! Readiness scoring.
//!
//! Two scores, both on a 1-10 scale:
//! - a subjective score from the athlete's daily check-in
//! - a data-based score from the last week of completed attempts

use crate::calendar::local_date;
use crate::store::TrainingStore;
use crate::{Error, ReadinessInputs, ReadinessLog, Result, SessionAttempt};
use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Score reported when there is no training in the trailing window
pub const NO_HISTORY_SCORE: f64 = 8.5;

/// Days in the trailing window used by the data-based score
pub const WINDOW_DAYS: u64 = 7;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn check_range(name: &str, value: u8) -> Result<f64> {
    if (1..=10).contains(&value) {
        Ok(f64::from(value))
    } else {
        Err(Error::InvalidInput(format!(
            "{} must be between 1 and 10, got {}",
            name, value
        )))
    }
}

/// Weighted wellness score from the four check-in inputs
///
/// Soreness and stress are inverted (`11 - x`) because higher is worse.
pub fn score(inputs: &ReadinessInputs) -> Result<f64> {
    let sleep = check_range("sleep quality", inputs.sleep_quality)?;
    let energy = check_range("energy level", inputs.energy_level)?;
    let soreness = check_range("muscle soreness", inputs.muscle_soreness)?;
    let stress = check_range("stress level", inputs.stress_level)?;

    let raw = 0.30 * sleep + 0.30 * energy + 0.20 * (11.0 - soreness) + 0.20 * (11.0 - stress);
    Ok(round2(raw).clamp(1.0, 10.0))
}

/// Direction of recent session RPE
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Readiness derived from recent training load
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataBasedReadiness {
    pub score: f64,
    pub training_load: f64,
    pub avg_rpe: f64,
    pub rest_days: u32,
    pub trend: Trend,
}

/// Completed attempts whose completion day lies in the trailing `days` window
pub fn recent_attempts(
    attempts: &[SessionAttempt],
    today: NaiveDate,
    days: u64,
    offset: FixedOffset,
) -> Vec<SessionAttempt> {
    let start = today - Days::new(days.saturating_sub(1));
    attempts
        .iter()
        .filter(|a| {
            a.completed_at
                .map(|at| local_date(at, offset))
                .is_some_and(|day| day >= start && day <= today)
        })
        .cloned()
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn rpe_trend(attempts: &[&SessionAttempt]) -> Trend {
    let rpes: Vec<f64> = attempts
        .iter()
        .filter_map(|a| a.overall_rpe.map(f64::from))
        .collect();
    let mid = rpes.len() / 2;

    match (mean(&rpes[..mid]), mean(&rpes[mid..])) {
        (Some(earlier), Some(recent)) if recent <= earlier - 0.5 => Trend::Improving,
        (Some(earlier), Some(recent)) if recent >= earlier + 0.5 => Trend::Declining,
        _ => Trend::Stable,
    }
}

/// Readiness from the attempts of the trailing week
///
/// Pass the output of [`recent_attempts`]; attempts are attributed to the
/// local day they were completed on.
pub fn data_based_score(recent: &[SessionAttempt], offset: FixedOffset) -> DataBasedReadiness {
    if recent.is_empty() {
        return DataBasedReadiness {
            score: NO_HISTORY_SCORE,
            training_load: 0.0,
            avg_rpe: 0.0,
            rest_days: WINDOW_DAYS as u32,
            trend: Trend::Stable,
        };
    }

    let mut ordered: Vec<&SessionAttempt> = recent.iter().collect();
    ordered.sort_by_key(|a| a.completed_at.unwrap_or(a.created_at));

    let total_minutes: f64 = ordered
        .iter()
        .map(|a| f64::from(a.duration_minutes.unwrap_or(0)))
        .sum();
    let rpes: Vec<f64> = ordered
        .iter()
        .filter_map(|a| a.overall_rpe.map(f64::from))
        .collect();
    let avg_rpe = mean(&rpes).unwrap_or(0.0);
    let training_load = total_minutes * (avg_rpe / 10.0);

    let training_days: HashSet<NaiveDate> = ordered
        .iter()
        .map(|a| local_date(a.completed_at.unwrap_or(a.created_at), offset))
        .collect();
    let rest_days = (WINDOW_DAYS as u32).saturating_sub(training_days.len() as u32);

    let mut score = 10.0;
    if training_load > 500.0 {
        score -= 3.0;
    } else if training_load > 300.0 {
        score -= 2.0;
    } else if training_load > 150.0 {
        score -= 1.0;
    }

    if avg_rpe > 8.0 {
        score -= 2.0;
    } else if avg_rpe > 7.0 {
        score -= 1.0;
    } else if avg_rpe > 6.0 {
        score -= 0.5;
    }

    if rest_days >= 2 {
        score += 1.0;
    } else if rest_days == 0 {
        score -= 1.0;
    }

    let result = DataBasedReadiness {
        score: round2(f64::clamp(score, 1.0, 10.0)),
        training_load: round2(training_load),
        avg_rpe: round2(avg_rpe),
        rest_days,
        trend: rpe_trend(&ordered),
    };

    tracing::debug!(
        "Data-based readiness {} (load {}, avg RPE {}, {} rest days, {:?})",
        result.score,
        result.training_load,
        result.avg_rpe,
        result.rest_days,
        result.trend
    );
    result
}

/// Score a check-in and upsert it as the athlete's log for `date`
pub fn submit_readiness(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    date: NaiveDate,
    inputs: ReadinessInputs,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<ReadinessLog> {
    let overall_score = score(&inputs)?;

    let log = ReadinessLog {
        id: Uuid::new_v4(),
        athlete_id,
        log_date: date,
        inputs,
        overall_score,
        notes,
        updated_at: now,
    };
    let stored = store.upsert_readiness(athlete_id, &log)?;

    tracing::info!(
        "Recorded readiness {} for athlete {} on {}",
        stored.overall_score,
        athlete_id,
        date
    );
    Ok(stored)
}
