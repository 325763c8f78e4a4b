//! Session lifecycle: start, pause, resume and complete one attempt.
//!
//! ```text
//! NotStarted --start--> Open <--pause/resume--> Paused
//!                        |                        |
//!                        +-------complete---------+--> Completed
//! ```
//!
//! Repeated pause, resume and start calls succeed without changing
//! anything. Only completing twice, or acting on a session that was never
//! started today, is an error. Elapsed time is always net of paused
//! intervals, and the three ways of computing it agree at every transition.

use crate::calendar::local_date;
use crate::store::TrainingStore;
use crate::{Error, ExerciseSetLog, Result, SessionAttempt};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an existing attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Open,
    Paused,
    Completed,
}

/// Caller-supplied details recorded when an attempt completes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub overall_rpe: Option<u8>,
    pub notes: Option<String>,
    /// Stored verbatim when present instead of the derived duration
    pub explicit_duration_minutes: Option<u32>,
}

/// A set as entered by the athlete, before it is attached to an attempt
#[derive(Clone, Debug, PartialEq)]
pub struct NewSetLog {
    pub exercise_id: Uuid,
    pub set_number: u32,
    pub weight_kg: Option<f64>,
    pub reps_completed: Option<u32>,
    pub rpe: Option<u8>,
}

/// Reject an RPE outside 1..=10
pub fn validate_rpe(rpe: Option<u8>, what: &str) -> Result<()> {
    match rpe {
        Some(value) if !(1..=10).contains(&value) => Err(Error::InvalidInput(format!(
            "{} must be between 1 and 10, got {}",
            what, value
        ))),
        _ => Ok(()),
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().max(0) as u64
}

impl SessionAttempt {
    pub fn state(&self) -> AttemptState {
        if self.completed_at.is_some() {
            AttemptState::Completed
        } else if self.paused_at.is_some() {
            AttemptState::Paused
        } else {
            AttemptState::Open
        }
    }

    /// Pause an open attempt; returns whether anything changed
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.state() != AttemptState::Open {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Resume a paused attempt, folding the pause into `total_paused_seconds`
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.state() != AttemptState::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused_seconds += seconds_between(paused_at, now);
        }
        true
    }

    /// Finalize the attempt
    ///
    /// Completing while paused resumes first so the last pause is counted.
    pub fn complete(&mut self, now: DateTime<Utc>, completion: Completion) -> Result<()> {
        if self.is_completed() {
            return Err(Error::AlreadyCompleted(self.id));
        }
        validate_rpe(completion.overall_rpe, "overall RPE")?;

        self.resume(now);
        self.completed_at = Some(now);
        self.paused_at = None;

        let active = self.elapsed_seconds(now);
        self.active_seconds = Some(active);
        self.duration_minutes = Some(
            completion
                .explicit_duration_minutes
                .unwrap_or((active / 60) as u32),
        );
        self.overall_rpe = completion.overall_rpe;
        self.notes = completion.notes;
        Ok(())
    }

    /// Net elapsed seconds, excluding pauses, as seen at `now`
    ///
    /// The clock stops at the pause instant while paused and at the
    /// completion instant once completed.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let until = match (self.completed_at, self.paused_at) {
            (Some(completed_at), _) => completed_at,
            (None, Some(paused_at)) => paused_at,
            (None, None) => now,
        };
        seconds_between(self.created_at, until).saturating_sub(self.total_paused_seconds)
    }
}

/// Format seconds as `H:MM:SS` for a live timer
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

// ============================================================================
// Store-backed Lifecycle
// ============================================================================

/// Lifecycle operations for one day boundary, persisted through a store
pub struct SessionLifecycle<'s> {
    store: &'s dyn TrainingStore,
    offset: FixedOffset,
}

impl<'s> SessionLifecycle<'s> {
    /// `offset` decides which calendar day an instant belongs to
    pub fn new(store: &'s dyn TrainingStore, offset: FixedOffset) -> Self {
        SessionLifecycle { store, offset }
    }

    pub fn store(&self) -> &'s dyn TrainingStore {
        self.store
    }

    /// Open today's attempt, or return the one already open
    pub fn start(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionAttempt> {
        let (attempt, created) =
            self.store
                .get_or_create_open_attempt(athlete_id, session_id, now, self.offset)?;

        if created {
            tracing::info!(
                "Started attempt {} for session {} (athlete {})",
                attempt.id,
                session_id,
                athlete_id
            );
        } else {
            tracing::debug!("Reusing open attempt {} for session {}", attempt.id, session_id);
        }
        Ok(attempt)
    }

    /// Today's attempt for the session: the open one if any, else the latest
    pub fn attempt_today(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionAttempt>> {
        let today = local_date(now, self.offset);
        let attempts = self
            .store
            .attempts_on_day(athlete_id, session_id, today, self.offset)?;

        let open = attempts.iter().rev().find(|a| !a.is_completed()).cloned();
        Ok(open.or_else(|| attempts.last().cloned()))
    }

    /// The attempt pause, resume, complete and elapsed act on
    ///
    /// An open attempt wins whatever day it was started on, so a workout
    /// running past midnight can still be finished. Without one, today's
    /// latest attempt is used.
    pub fn current_attempt(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionAttempt>> {
        let open = self
            .store
            .attempts_for_athlete(athlete_id)?
            .into_iter()
            .filter(|a| a.session_id == session_id && !a.is_completed())
            .last();

        match open {
            Some(attempt) => Ok(Some(attempt)),
            None => self.attempt_today(session_id, athlete_id, now),
        }
    }

    fn require_current_attempt(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
        action: &str,
    ) -> Result<SessionAttempt> {
        self.current_attempt(session_id, athlete_id, now)?
            .ok_or_else(|| {
                Error::InvalidTransition(format!(
                    "cannot {} session {}: not started today",
                    action, session_id
                ))
            })
    }

    /// Pause the current attempt; a no-op unless it is open
    pub fn pause(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionAttempt> {
        let attempt = self.require_current_attempt(session_id, athlete_id, now, "pause")?;
        if attempt.state() != AttemptState::Open {
            tracing::debug!("Pause ignored for attempt {} ({:?})", attempt.id, attempt.state());
            return Ok(attempt);
        }

        let updated = self
            .store
            .modify_attempt(athlete_id, attempt.id, &mut |a: &mut SessionAttempt| {
                a.pause(now);
                Ok(())
            })?;
        tracing::info!("Paused attempt {}", updated.id);
        Ok(updated)
    }

    /// Resume the current attempt; a no-op unless it is paused
    pub fn resume(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionAttempt> {
        let attempt = self.require_current_attempt(session_id, athlete_id, now, "resume")?;
        if attempt.state() != AttemptState::Paused {
            tracing::debug!("Resume ignored for attempt {} ({:?})", attempt.id, attempt.state());
            return Ok(attempt);
        }

        let updated = self
            .store
            .modify_attempt(athlete_id, attempt.id, &mut |a: &mut SessionAttempt| {
                a.resume(now);
                Ok(())
            })?;
        tracing::info!(
            "Resumed attempt {} ({}s paused in total)",
            updated.id,
            updated.total_paused_seconds
        );
        Ok(updated)
    }

    /// Complete the current attempt
    pub fn complete(
        &self,
        session_id: Uuid,
        athlete_id: Uuid,
        now: DateTime<Utc>,
        completion: Completion,
    ) -> Result<SessionAttempt> {
        let attempt = self.require_current_attempt(session_id, athlete_id, now, "complete")?;
        if attempt.is_completed() {
            return Err(Error::AlreadyCompleted(attempt.id));
        }
        validate_rpe(completion.overall_rpe, "overall RPE")?;

        let updated = self
            .store
            .modify_attempt(athlete_id, attempt.id, &mut |a: &mut SessionAttempt| {
                a.complete(now, completion.clone())
            })?;
        tracing::info!(
            "Completed attempt {} in {} minutes",
            updated.id,
            updated.duration_minutes.unwrap_or(0)
        );
        Ok(updated)
    }

    /// Net elapsed seconds of the current attempt, for a polling timer
    pub fn elapsed(&self, session_id: Uuid, athlete_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let attempt = self.require_current_attempt(session_id, athlete_id, now, "time")?;
        Ok(attempt.elapsed_seconds(now))
    }

    /// Append a set to an open attempt
    pub fn log_set(
        &self,
        athlete_id: Uuid,
        attempt_id: Uuid,
        set: NewSetLog,
        now: DateTime<Utc>,
    ) -> Result<ExerciseSetLog> {
        if set.set_number == 0 {
            return Err(Error::InvalidInput("set numbers start at 1".into()));
        }
        validate_rpe(set.rpe, "set RPE")?;
        if set.weight_kg.is_some_and(|w| !w.is_finite() || w < 0.0) {
            return Err(Error::InvalidInput(format!(
                "weight must be a non-negative number, got {:?}",
                set.weight_kg
            )));
        }

        let log = ExerciseSetLog {
            id: Uuid::new_v4(),
            session_attempt_id: attempt_id,
            exercise_id: set.exercise_id,
            set_number: set.set_number,
            weight_kg: set.weight_kg,
            reps_completed: set.reps_completed,
            rpe: set.rpe,
            logged_at: now,
        };
        self.store.insert_set_log(athlete_id, &log)?;

        tracing::debug!(
            "Logged set {} of exercise {} on attempt {}",
            log.set_number,
            log.exercise_id,
            attempt_id
        );
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()
    }

    fn open_attempt() -> SessionAttempt {
        SessionAttempt::new(Uuid::new_v4(), Uuid::new_v4(), t0())
    }

    #[test]
    fn test_pause_resume_accumulates() {
        let mut attempt = open_attempt();

        assert!(attempt.pause(t0() + Duration::minutes(10)));
        assert_eq!(attempt.state(), AttemptState::Paused);
        assert!(attempt.resume(t0() + Duration::minutes(13)));
        assert_eq!(attempt.total_paused_seconds, 180);

        assert!(attempt.pause(t0() + Duration::minutes(20)));
        assert!(attempt.resume(t0() + Duration::minutes(21)));
        assert_eq!(attempt.total_paused_seconds, 240);
        assert_eq!(attempt.state(), AttemptState::Open);
    }

    #[test]
    fn test_double_pause_and_resume_are_noops() {
        let mut attempt = open_attempt();

        assert!(!attempt.resume(t0() + Duration::minutes(1)));
        assert!(attempt.pause(t0() + Duration::minutes(5)));
        assert!(!attempt.pause(t0() + Duration::minutes(8)));
        assert_eq!(attempt.paused_at, Some(t0() + Duration::minutes(5)));

        assert!(attempt.resume(t0() + Duration::minutes(9)));
        assert!(!attempt.resume(t0() + Duration::minutes(12)));
        assert_eq!(attempt.total_paused_seconds, 240);
    }

    #[test]
    fn test_elapsed_stops_while_paused() {
        let mut attempt = open_attempt();
        assert_eq!(attempt.elapsed_seconds(t0() + Duration::seconds(90)), 90);

        attempt.pause(t0() + Duration::minutes(5));
        assert_eq!(attempt.elapsed_seconds(t0() + Duration::minutes(9)), 300);

        attempt.resume(t0() + Duration::minutes(10));
        assert_eq!(attempt.elapsed_seconds(t0() + Duration::minutes(12)), 420);
    }

    #[test]
    fn test_continuity_at_completion() {
        crate::logging::init_test();
        let mut attempt = open_attempt();
        attempt.pause(t0() + Duration::minutes(7));
        attempt.resume(t0() + Duration::minutes(9));
        attempt.pause(t0() + Duration::minutes(30));

        // Completing while paused: implicit resume first
        let done = t0() + Duration::minutes(34);
        let before = attempt.elapsed_seconds(done);
        attempt.complete(done, Completion::default()).unwrap();
        let after = attempt.elapsed_seconds(done + Duration::hours(2));

        assert_eq!(before, after);
        assert_eq!(attempt.active_seconds, Some(before));
        assert_eq!(u64::from(attempt.duration_minutes.unwrap()) * 60, before);
        assert_eq!(attempt.total_paused_seconds, 6 * 60);
        assert_eq!(attempt.paused_at, None);
        assert_eq!(attempt.state(), AttemptState::Completed);
    }

    #[test]
    fn test_explicit_duration_stored_verbatim() {
        let mut attempt = open_attempt();
        attempt
            .complete(
                t0() + Duration::minutes(50),
                Completion {
                    overall_rpe: Some(7),
                    notes: Some("good".into()),
                    explicit_duration_minutes: Some(42),
                },
            )
            .unwrap();

        assert_eq!(attempt.duration_minutes, Some(42));
        assert_eq!(attempt.active_seconds, Some(3000));
        assert_eq!(attempt.overall_rpe, Some(7));
    }

    #[test]
    fn test_complete_twice_fails() {
        let mut attempt = open_attempt();
        attempt.complete(t0() + Duration::minutes(5), Completion::default()).unwrap();
        let snapshot = attempt.clone();

        let result = attempt.complete(t0() + Duration::minutes(6), Completion::default());
        assert!(matches!(result, Err(Error::AlreadyCompleted(_))));
        assert_eq!(attempt, snapshot);

        // Pause after completion is a silent no-op
        assert!(!attempt.pause(t0() + Duration::minutes(7)));
        assert_eq!(attempt, snapshot);
    }

    #[test]
    fn test_complete_rejects_bad_rpe_without_mutation() {
        let mut attempt = open_attempt();
        attempt.pause(t0() + Duration::minutes(3));
        let snapshot = attempt.clone();

        let result = attempt.complete(
            t0() + Duration::minutes(5),
            Completion {
                overall_rpe: Some(11),
                ..Completion::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(attempt, snapshot);
    }

    #[test]
    fn test_duration_floored_at_zero() {
        let mut attempt = open_attempt();
        // Clock skew: completion stamped before creation
        attempt
            .complete(t0() - Duration::minutes(3), Completion::default())
            .unwrap();
        assert_eq!(attempt.duration_minutes, Some(0));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(3725), "1:02:05");
    }

    #[test]
    fn test_start_is_idempotent() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();

        let first = lifecycle.start(session, athlete, t0()).unwrap();
        let second = lifecycle
            .start(session, athlete, t0() + Duration::minutes(1))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first, second);
        assert_eq!(store.attempts_for_athlete(athlete).unwrap().len(), 1);
    }

    #[test]
    fn test_start_after_completion_creates_new_attempt() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();

        let first = lifecycle.start(session, athlete, t0()).unwrap();
        lifecycle
            .complete(session, athlete, t0() + Duration::minutes(30), Completion::default())
            .unwrap();
        let second = lifecycle
            .start(session, athlete, t0() + Duration::hours(2))
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.state(), AttemptState::Open);
    }

    #[test]
    fn test_pause_before_start_is_invalid_transition() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());

        let result = lifecycle.pause(Uuid::new_v4(), Uuid::new_v4(), t0());
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
    }

    #[test]
    fn test_store_backed_flow() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();

        lifecycle.start(session, athlete, t0()).unwrap();
        lifecycle.pause(session, athlete, t0() + Duration::minutes(10)).unwrap();
        // Double click
        lifecycle.pause(session, athlete, t0() + Duration::minutes(11)).unwrap();
        lifecycle.resume(session, athlete, t0() + Duration::minutes(15)).unwrap();

        let at = t0() + Duration::minutes(40);
        let elapsed = lifecycle.elapsed(session, athlete, at).unwrap();
        let done = lifecycle
            .complete(session, athlete, at, Completion::default())
            .unwrap();

        assert_eq!(elapsed, 35 * 60);
        assert_eq!(done.duration_minutes, Some(35));
        assert_eq!(done.total_paused_seconds, 300);

        let again = lifecycle.complete(session, athlete, at, Completion::default());
        assert!(matches!(again, Err(Error::AlreadyCompleted(_))));

        // Pause on the completed attempt is a silent success
        let paused = lifecycle.pause(session, athlete, at).unwrap();
        assert_eq!(paused, done);
    }

    #[test]
    fn test_workout_crossing_midnight_can_be_finished() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();
        let late = Utc.with_ymd_and_hms(2024, 1, 15, 23, 40, 0).unwrap();

        let started = lifecycle.start(session, athlete, late).unwrap();
        let paused = lifecycle
            .pause(session, athlete, late + Duration::minutes(30))
            .unwrap();
        assert_eq!(paused.id, started.id);
        assert_eq!(paused.state(), AttemptState::Paused);

        lifecycle
            .resume(session, athlete, late + Duration::minutes(35))
            .unwrap();
        let finish = late + Duration::minutes(50);
        assert_eq!(lifecycle.elapsed(session, athlete, finish).unwrap(), 45 * 60);

        let done = lifecycle
            .complete(session, athlete, finish, Completion::default())
            .unwrap();
        assert_eq!(done.id, started.id);
        assert_eq!(done.duration_minutes, Some(45));

        let stored = store.attempts_for_athlete(athlete).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_completed());
    }

    #[test]
    fn test_completed_yesterday_is_not_current_today() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();

        lifecycle.start(session, athlete, t0()).unwrap();
        lifecycle
            .complete(session, athlete, t0() + Duration::minutes(30), Completion::default())
            .unwrap();

        let tomorrow = t0() + Duration::days(1);
        assert!(lifecycle.current_attempt(session, athlete, tomorrow).unwrap().is_none());
        assert!(matches!(
            lifecycle.pause(session, athlete, tomorrow),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_pause_monotonicity_through_store() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();
        lifecycle.start(session, athlete, t0()).unwrap();

        let mut last = 0;
        for minute in 1..20i64 {
            let now = t0() + Duration::minutes(minute);
            let attempt = if minute % 3 == 0 {
                lifecycle.resume(session, athlete, now).unwrap()
            } else {
                lifecycle.pause(session, athlete, now).unwrap()
            };
            assert!(attempt.total_paused_seconds >= last);
            last = attempt.total_paused_seconds;
        }
        assert!(last > 0);
    }

    #[test]
    fn test_log_set_rules() {
        let store = MemoryStore::new();
        let lifecycle = SessionLifecycle::new(&store, utc());
        let session = Uuid::new_v4();
        let athlete = Uuid::new_v4();
        let attempt = lifecycle.start(session, athlete, t0()).unwrap();
        let exercise = Uuid::new_v4();

        let set = NewSetLog {
            exercise_id: exercise,
            set_number: 1,
            weight_kg: Some(100.0),
            reps_completed: Some(5),
            rpe: Some(8),
        };
        lifecycle.log_set(athlete, attempt.id, set.clone(), t0()).unwrap();

        let bad_number = NewSetLog {
            set_number: 0,
            ..set.clone()
        };
        assert!(matches!(
            lifecycle.log_set(athlete, attempt.id, bad_number, t0()),
            Err(Error::InvalidInput(_))
        ));

        assert!(matches!(
            lifecycle.log_set(Uuid::new_v4(), attempt.id, set.clone(), t0()),
            Err(Error::Forbidden { .. })
        ));

        lifecycle
            .complete(session, athlete, t0() + Duration::minutes(20), Completion::default())
            .unwrap();
        let late = NewSetLog {
            set_number: 2,
            ..set
        };
        assert!(matches!(
            lifecycle.log_set(athlete, attempt.id, late, t0()),
            Err(Error::AlreadyCompleted(_))
        ));

        assert_eq!(store.set_logs_for_attempt(attempt.id).unwrap().len(), 1);
    }
}
