#![forbid(unsafe_code)]

//! Core domain model and business logic for the Coachcal training calendar.
//!
//! This crate provides:
//! - Domain types (programs, session templates, attempts, set and readiness logs)
//! - Calendar math and the day/week/month/year projections
//! - The session attempt lifecycle (start, pause, resume, complete)
//! - Readiness scoring and progress aggregation
//! - Persistence behind the [`TrainingStore`] trait (in-memory and file backed)

pub mod types;
pub mod error;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod lifecycle;
pub mod projector;
pub mod readiness;
pub mod progress;
pub mod daily;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use calendar::CalendarDay;
pub use catalog::TrainingCatalog;
pub use config::Config;
pub use store::{FileStore, MemoryStore, TrainingStore};
pub use lifecycle::{AttemptState, Completion, NewSetLog, SessionLifecycle};
pub use projector::{CalendarView, CompletionIndex, SessionProjector, ViewKind, ViewModel};
pub use readiness::{DataBasedReadiness, Trend};
pub use progress::{ProgressReport, ReportWindow};
pub use daily::{daily_message, DailyMessage};
