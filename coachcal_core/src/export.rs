//! CSV export of completed session attempts.
//!
//! Rows are appended to an existing file; attempts already present (by id)
//! are skipped so repeated exports do not duplicate history.

use crate::{Error, Result, SessionAttempt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// A row in the CSV output
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    id: String,
    session_id: String,
    athlete_id: String,
    created_at: String,
    completed_at: Option<String>,
    total_paused_seconds: u64,
    active_seconds: Option<u64>,
    duration_minutes: Option<u32>,
    overall_rpe: Option<u8>,
    notes: Option<String>,
    /// Distinguishes `Some("")` from `None`, which CSV writes identically
    #[serde(default)]
    has_notes: bool,
}

impl From<&SessionAttempt> for CsvRow {
    fn from(attempt: &SessionAttempt) -> Self {
        CsvRow {
            id: attempt.id.to_string(),
            session_id: attempt.session_id.to_string(),
            athlete_id: attempt.athlete_id.to_string(),
            created_at: attempt.created_at.to_rfc3339(),
            completed_at: attempt.completed_at.map(|t| t.to_rfc3339()),
            total_paused_seconds: attempt.total_paused_seconds,
            active_seconds: attempt.active_seconds,
            duration_minutes: attempt.duration_minutes,
            overall_rpe: attempt.overall_rpe,
            notes: attempt.notes.clone(),
            has_notes: attempt.notes.is_some(),
        }
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Other(format!("Invalid {} UUID: {}", field, e)))
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid {} timestamp: {}", field, e)))
}

impl TryFrom<CsvRow> for SessionAttempt {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let completed_at = row
            .completed_at
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_timestamp("completed_at", s))
            .transpose()?;

        Ok(SessionAttempt {
            id: parse_uuid("id", &row.id)?,
            session_id: parse_uuid("session_id", &row.session_id)?,
            athlete_id: parse_uuid("athlete_id", &row.athlete_id)?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            paused_at: None, // completed attempts are never paused
            total_paused_seconds: row.total_paused_seconds,
            completed_at,
            overall_rpe: row.overall_rpe,
            duration_minutes: row.duration_minutes,
            active_seconds: row.active_seconds,
            notes: match row.notes {
                Some(notes) => Some(notes),
                None if row.has_notes => Some(String::new()),
                None => None,
            },
        })
    }
}

/// Read every attempt from a CSV export
///
/// A missing file reads as empty.
pub fn read_attempts(csv_path: &Path) -> Result<Vec<SessionAttempt>> {
    if !csv_path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)?;

    let mut attempts = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        attempts.push(SessionAttempt::try_from(result?)?);
    }
    Ok(attempts)
}

/// Append completed attempts to a CSV file, creating it with headers if needed
///
/// Open attempts and attempts whose id is already in the file are skipped.
/// Returns the number of rows written.
pub fn export_completed(attempts: &[SessionAttempt], csv_path: &Path) -> Result<usize> {
    let existing: HashSet<Uuid> = read_attempts(csv_path)?.into_iter().map(|a| a.id).collect();

    let pending: Vec<&SessionAttempt> = attempts
        .iter()
        .filter(|a| a.is_completed() && !existing.contains(&a.id))
        .collect();

    if pending.is_empty() {
        tracing::info!("No new completed attempts to export");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(csv_path)?;
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for attempt in &pending {
        writer.serialize(CsvRow::from(*attempt))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} attempts to {:?}", pending.len(), csv_path);
    Ok(pending.len())
}
