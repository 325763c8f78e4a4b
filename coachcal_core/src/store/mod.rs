//! Storage boundary for attempts, set logs and readiness logs.
//!
//! The engine never talks to a database directly. It goes through the
//! [`TrainingStore`] trait, which every backend gets for free by
//! implementing [`TableBackend`]: a way to read the tables and a way to
//! apply a mutation to them atomically. Rules that belong to the storage
//! side live here, once, for all backends:
//! - soft-deleted rows are invisible to every read
//! - mutations are rejected unless the acting athlete owns the row
//! - at most one open attempt per (athlete, session, day)
//! - at most one readiness log per (athlete, day)

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::calendar::local_date;
use crate::{Error, ExerciseSetLog, ReadinessLog, Result, SessionAttempt};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored record plus its soft-delete flag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row<T> {
    pub record: T,
    #[serde(default)]
    pub is_deleted: bool,
}

impl<T> Row<T> {
    fn live(record: T) -> Self {
        Row {
            record,
            is_deleted: false,
        }
    }
}

/// All persisted tables
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub attempts: Vec<Row<SessionAttempt>>,
    #[serde(default)]
    pub set_logs: Vec<Row<ExerciseSetLog>>,
    #[serde(default)]
    pub readiness: Vec<Row<ReadinessLog>>,
}

fn forbidden(actor: Uuid, what: impl Into<String>) -> Error {
    Error::Forbidden {
        actor,
        what: what.into(),
    }
}

impl Tables {
    fn live_attempts(&self) -> impl Iterator<Item = &SessionAttempt> {
        self.attempts
            .iter()
            .filter(|row| !row.is_deleted)
            .map(|row| &row.record)
    }

    fn live_attempt_mut(&mut self, id: Uuid) -> Result<&mut SessionAttempt> {
        self.attempts
            .iter_mut()
            .find(|row| !row.is_deleted && row.record.id == id)
            .map(|row| &mut row.record)
            .ok_or_else(|| Error::NotFound(format!("session attempt {}", id)))
    }

    fn find_attempt(&self, id: Uuid) -> Result<SessionAttempt> {
        self.live_attempts()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session attempt {}", id)))
    }

    fn attempts_on(
        &self,
        athlete_id: Uuid,
        session_id: Uuid,
        day: NaiveDate,
        offset: FixedOffset,
    ) -> Vec<SessionAttempt> {
        let mut attempts: Vec<SessionAttempt> = self
            .live_attempts()
            .filter(|a| {
                a.athlete_id == athlete_id
                    && a.session_id == session_id
                    && local_date(a.created_at, offset) == day
            })
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.created_at);
        attempts
    }

    fn modify_attempt(
        &mut self,
        actor: Uuid,
        id: Uuid,
        change: &mut dyn FnMut(&mut SessionAttempt) -> Result<()>,
    ) -> Result<SessionAttempt> {
        let stored = self.live_attempt_mut(id)?;
        if stored.athlete_id != actor {
            return Err(forbidden(actor, format!("session attempt {}", id)));
        }

        let mut draft = stored.clone();
        change(&mut draft)?;

        if draft.id != stored.id || draft.athlete_id != stored.athlete_id {
            return Err(Error::InvalidInput(
                "attempt id and owner cannot be changed".into(),
            ));
        }
        if stored.is_completed() && draft != *stored {
            return Err(Error::AlreadyCompleted(id));
        }

        *stored = draft.clone();
        Ok(draft)
    }

    fn insert_set_log(&mut self, actor: Uuid, log: ExerciseSetLog) -> Result<()> {
        let attempt = self.find_attempt(log.session_attempt_id)?;
        if attempt.athlete_id != actor {
            return Err(forbidden(actor, format!("session attempt {}", attempt.id)));
        }
        if attempt.is_completed() {
            return Err(Error::AlreadyCompleted(attempt.id));
        }
        self.set_logs.push(Row::live(log));
        Ok(())
    }

    fn upsert_readiness(&mut self, actor: Uuid, log: ReadinessLog) -> Result<ReadinessLog> {
        if log.athlete_id != actor {
            return Err(forbidden(actor, format!("readiness log for {}", log.athlete_id)));
        }

        let existing = self.readiness.iter_mut().find(|row| {
            !row.is_deleted
                && row.record.athlete_id == log.athlete_id
                && row.record.log_date == log.log_date
        });

        match existing {
            Some(row) => {
                // Overwrite in place, keeping the original row identity
                let id = row.record.id;
                row.record = ReadinessLog { id, ..log };
                Ok(row.record.clone())
            }
            None => {
                self.readiness.push(Row::live(log.clone()));
                Ok(log)
            }
        }
    }
}

// ============================================================================
// Backend and Store Traits
// ============================================================================

/// Raw table access a backend must provide
///
/// `write` must run `apply` against a draft and commit it only when
/// `apply` succeeds, while excluding every other writer.
pub trait TableBackend: Send + Sync {
    fn read<R>(&self, view: impl FnOnce(&Tables) -> Result<R>) -> Result<R>;
    fn write<R>(&self, apply: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R>;
}

/// Data-access contract the engine relies on
pub trait TrainingStore: Send + Sync {
    /// Fetch a live attempt by id
    fn find_attempt(&self, id: Uuid) -> Result<SessionAttempt>;

    /// All live attempts for an athlete, oldest first
    fn attempts_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<SessionAttempt>>;

    /// Live attempts for (athlete, session) created on `day`, oldest first
    fn attempts_on_day(
        &self,
        athlete_id: Uuid,
        session_id: Uuid,
        day: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<SessionAttempt>>;

    /// Return today's non-completed attempt, or create one, atomically
    ///
    /// The boolean is true when a new attempt was inserted.
    fn get_or_create_open_attempt(
        &self,
        athlete_id: Uuid,
        session_id: Uuid,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<(SessionAttempt, bool)>;

    /// Apply `change` to a stored attempt atomically and return the result
    fn modify_attempt(
        &self,
        actor: Uuid,
        id: Uuid,
        change: &mut dyn FnMut(&mut SessionAttempt) -> Result<()>,
    ) -> Result<SessionAttempt>;

    /// Replace a stored attempt wholesale
    fn update_attempt(&self, actor: Uuid, attempt: &SessionAttempt) -> Result<()> {
        let replacement = attempt.clone();
        self.modify_attempt(actor, attempt.id, &mut |stored: &mut SessionAttempt| {
            *stored = replacement.clone();
            Ok(())
        })?;
        Ok(())
    }

    /// Hide an attempt and its set logs from every future read
    fn soft_delete_attempt(&self, actor: Uuid, id: Uuid) -> Result<()>;

    /// Append a set log to an open attempt
    fn insert_set_log(&self, actor: Uuid, log: &ExerciseSetLog) -> Result<()>;

    fn set_logs_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<ExerciseSetLog>>;

    /// Every live set log belonging to the athlete's live attempts
    fn set_logs_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<ExerciseSetLog>>;

    /// Insert or overwrite the athlete's log for `log.log_date`
    fn upsert_readiness(&self, actor: Uuid, log: &ReadinessLog) -> Result<ReadinessLog>;

    fn readiness_for(&self, athlete_id: Uuid, date: NaiveDate) -> Result<Option<ReadinessLog>>;

    /// All live readiness logs for an athlete, oldest first
    fn readiness_history(&self, athlete_id: Uuid) -> Result<Vec<ReadinessLog>>;
}

impl<B: TableBackend> TrainingStore for B {
    fn find_attempt(&self, id: Uuid) -> Result<SessionAttempt> {
        self.read(|tables| tables.find_attempt(id))
    }

    fn attempts_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<SessionAttempt>> {
        self.read(|tables| {
            let mut attempts: Vec<SessionAttempt> = tables
                .live_attempts()
                .filter(|a| a.athlete_id == athlete_id)
                .cloned()
                .collect();
            attempts.sort_by_key(|a| a.created_at);
            Ok(attempts)
        })
    }

    fn attempts_on_day(
        &self,
        athlete_id: Uuid,
        session_id: Uuid,
        day: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<SessionAttempt>> {
        self.read(|tables| Ok(tables.attempts_on(athlete_id, session_id, day, offset)))
    }

    fn get_or_create_open_attempt(
        &self,
        athlete_id: Uuid,
        session_id: Uuid,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<(SessionAttempt, bool)> {
        let today = local_date(now, offset);
        self.write(|tables| {
            let open = tables
                .attempts_on(athlete_id, session_id, today, offset)
                .into_iter()
                .find(|a| !a.is_completed());

            if let Some(attempt) = open {
                return Ok((attempt, false));
            }

            let attempt = SessionAttempt::new(session_id, athlete_id, now);
            tables.attempts.push(Row::live(attempt.clone()));
            Ok((attempt, true))
        })
    }

    fn modify_attempt(
        &self,
        actor: Uuid,
        id: Uuid,
        change: &mut dyn FnMut(&mut SessionAttempt) -> Result<()>,
    ) -> Result<SessionAttempt> {
        self.write(|tables| tables.modify_attempt(actor, id, change))
    }

    fn soft_delete_attempt(&self, actor: Uuid, id: Uuid) -> Result<()> {
        self.write(|tables| {
            let attempt = tables.live_attempt_mut(id)?;
            if attempt.athlete_id != actor {
                return Err(forbidden(actor, format!("session attempt {}", id)));
            }

            for row in tables.attempts.iter_mut().filter(|r| r.record.id == id) {
                row.is_deleted = true;
            }
            for row in tables
                .set_logs
                .iter_mut()
                .filter(|r| r.record.session_attempt_id == id)
            {
                row.is_deleted = true;
            }
            Ok(())
        })
    }

    fn insert_set_log(&self, actor: Uuid, log: &ExerciseSetLog) -> Result<()> {
        self.write(|tables| tables.insert_set_log(actor, log.clone()))
    }

    fn set_logs_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<ExerciseSetLog>> {
        self.read(|tables| {
            Ok(tables
                .set_logs
                .iter()
                .filter(|r| !r.is_deleted && r.record.session_attempt_id == attempt_id)
                .map(|r| r.record.clone())
                .collect())
        })
    }

    fn set_logs_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<ExerciseSetLog>> {
        self.read(|tables| {
            let attempt_ids: std::collections::HashSet<Uuid> = tables
                .live_attempts()
                .filter(|a| a.athlete_id == athlete_id)
                .map(|a| a.id)
                .collect();

            Ok(tables
                .set_logs
                .iter()
                .filter(|r| !r.is_deleted && attempt_ids.contains(&r.record.session_attempt_id))
                .map(|r| r.record.clone())
                .collect())
        })
    }

    fn upsert_readiness(&self, actor: Uuid, log: &ReadinessLog) -> Result<ReadinessLog> {
        self.write(|tables| tables.upsert_readiness(actor, log.clone()))
    }

    fn readiness_for(&self, athlete_id: Uuid, date: NaiveDate) -> Result<Option<ReadinessLog>> {
        self.read(|tables| {
            Ok(tables
                .readiness
                .iter()
                .find(|r| {
                    !r.is_deleted && r.record.athlete_id == athlete_id && r.record.log_date == date
                })
                .map(|r| r.record.clone()))
        })
    }

    fn readiness_history(&self, athlete_id: Uuid) -> Result<Vec<ReadinessLog>> {
        self.read(|tables| {
            let mut logs: Vec<ReadinessLog> = tables
                .readiness
                .iter()
                .filter(|r| !r.is_deleted && r.record.athlete_id == athlete_id)
                .map(|r| r.record.clone())
                .collect();
            logs.sort_by_key(|l| l.log_date);
            Ok(logs)
        })
    }
}
