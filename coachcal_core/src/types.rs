//! Core domain types for the coaching calendar.
//!
//! This module defines the records the engine reads and produces:
//! - Programs, session templates and exercises (coach-authored, read-only here)
//! - Session attempts and the set logs recorded during them
//! - Readiness logs, quotes and coach messages

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Day of Week
// ============================================================================

/// Monday-first day of week, 1 (Monday) through 7 (Sunday)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const MONDAY: DayOfWeek = DayOfWeek(1);
    pub const SUNDAY: DayOfWeek = DayOfWeek(7);

    /// Build from a 1..=7 number, rejecting anything else
    pub fn new(n: u8) -> crate::Result<Self> {
        if (1..=7).contains(&n) {
            Ok(DayOfWeek(n))
        } else {
            Err(crate::Error::InvalidInput(format!(
                "day of week must be 1..=7, got {}",
                n
            )))
        }
    }

    /// Day of week a calendar date falls on
    pub fn of(date: NaiveDate) -> Self {
        DayOfWeek::from(date.weekday())
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        // number_from_monday is always 1..=7
        DayOfWeek(weekday.number_from_monday() as u8)
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = crate::Error;

    fn try_from(n: u8) -> crate::Result<Self> {
        DayOfWeek::new(n)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> u8 {
        day.0
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            1 => "Mon",
            2 => "Tue",
            3 => "Wed",
            4 => "Thu",
            5 => "Fri",
            6 => "Sat",
            _ => "Sun",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Program and Template Types
// ============================================================================

/// Kind of training a session template prescribes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Strength,
    Cardio,
    Flexibility,
}

/// A coach-authored training program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub coach_id: Option<Uuid>,
}

/// Reusable definition of a session within a program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Templates without a day are never placed on the calendar
    pub day_of_week: Option<DayOfWeek>,
    pub week_number: u32,
    pub estimated_duration_minutes: Option<u32>,
    pub session_type: SessionType,
    pub program_id: Uuid,
}

/// An exercise that set logs refer to
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
}

// ============================================================================
// Attempt Types
// ============================================================================

/// One athlete's pass through one session on one day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionAttempt {
    pub id: Uuid,
    pub session_id: Uuid,
    pub athlete_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_seconds: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub overall_rpe: Option<u8>,
    pub duration_minutes: Option<u32>,
    /// Net seconds between creation and completion, excluding pauses
    pub active_seconds: Option<u64>,
    pub notes: Option<String>,
}

impl SessionAttempt {
    /// A fresh, open attempt created at `now`
    pub fn new(session_id: Uuid, athlete_id: Uuid, now: DateTime<Utc>) -> Self {
        SessionAttempt {
            id: Uuid::new_v4(),
            session_id,
            athlete_id,
            created_at: now,
            paused_at: None,
            total_paused_seconds: 0,
            completed_at: None,
            overall_rpe: None,
            duration_minutes: None,
            active_seconds: None,
            notes: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A single set recorded within an open attempt
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSetLog {
    pub id: Uuid,
    pub session_attempt_id: Uuid,
    pub exercise_id: Uuid,
    pub set_number: u32,
    pub weight_kg: Option<f64>,
    pub reps_completed: Option<u32>,
    pub rpe: Option<u8>,
    pub logged_at: DateTime<Utc>,
}

// ============================================================================
// Readiness and Content Types
// ============================================================================

/// The four subjective readiness inputs, each 1..=10
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessInputs {
    pub sleep_quality: u8,
    pub energy_level: u8,
    pub muscle_soreness: u8,
    pub stress_level: u8,
}

/// One athlete's readiness check-in for one calendar day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReadinessLog {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub log_date: NaiveDate,
    #[serde(flatten)]
    pub inputs: ReadinessInputs,
    pub overall_score: f64,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A motivational quote shown when no coach message applies
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MotivationalQuote {
    pub text: String,
    pub author: Option<String>,
}

/// A message a coach scheduled for an athlete's home screen
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CoachMessage {
    pub id: Uuid,
    pub coach_id: Uuid,
    pub athlete_id: Uuid,
    pub body: String,
    pub display_date: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
