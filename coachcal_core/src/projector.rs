//! Session projector: places weekly-recurring templates on calendar dates.
//!
//! Templates are grouped by day of week and repeated on every matching date
//! of the requested window. Completion data is attributed to the calendar
//! day an attempt was completed on, never to the template's own day.
//! The projector is a pure function of its inputs and touches no storage.

use crate::calendar::{self, CalendarDay};
use crate::{DayOfWeek, Error, Result, SessionAttempt, SessionTemplate, SessionType};
use chrono::{Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

/// Default number of indicators shown per month cell before overflow
pub const DEFAULT_INDICATOR_LIMIT: usize = 3;

/// Granularity of a calendar request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for ViewKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "day" => Ok(ViewKind::Day),
            "week" => Ok(ViewKind::Week),
            "month" => Ok(ViewKind::Month),
            "year" => Ok(ViewKind::Year),
            other => Err(Error::InvalidInput(format!("unknown calendar view '{}'", other))),
        }
    }
}

/// A calendar window: its granularity plus any date inside it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarView {
    pub kind: ViewKind,
    pub anchor: NaiveDate,
}

// ============================================================================
// Completion Index
// ============================================================================

/// Per-day record of which sessions were started and completed
#[derive(Clone, Debug, Default)]
pub struct CompletionIndex {
    started: HashMap<NaiveDate, HashSet<Uuid>>,
    completed: HashMap<NaiveDate, HashSet<Uuid>>,
    completed_counts: BTreeMap<NaiveDate, usize>,
}

impl CompletionIndex {
    /// Index attempts by the local date of their creation and completion
    pub fn from_attempts(attempts: &[SessionAttempt], offset: FixedOffset) -> Self {
        let mut index = CompletionIndex::default();

        for attempt in attempts {
            let created = calendar::local_date(attempt.created_at, offset);
            index
                .started
                .entry(created)
                .or_default()
                .insert(attempt.session_id);

            if let Some(completed_at) = attempt.completed_at {
                let day = calendar::local_date(completed_at, offset);
                index
                    .completed
                    .entry(day)
                    .or_default()
                    .insert(attempt.session_id);
                *index.completed_counts.entry(day).or_insert(0) += 1;
            }
        }

        index
    }

    pub fn is_started(&self, date: NaiveDate, session_id: Uuid) -> bool {
        self.started
            .get(&date)
            .is_some_and(|ids| ids.contains(&session_id))
    }

    pub fn is_completed(&self, date: NaiveDate, session_id: Uuid) -> bool {
        self.completed
            .get(&date)
            .is_some_and(|ids| ids.contains(&session_id))
    }

    /// Number of attempts completed on `date`
    pub fn completed_on(&self, date: NaiveDate) -> usize {
        self.completed_counts.get(&date).copied().unwrap_or(0)
    }

    /// Every date with at least one completed attempt
    pub fn completed_dates(&self) -> BTreeSet<NaiveDate> {
        self.completed_counts.keys().copied().collect()
    }
}

// ============================================================================
// View Models
// ============================================================================

/// A template placed on a specific date
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduledSession {
    pub template: SessionTemplate,
    pub program_name: String,
    pub started: bool,
    pub completed: bool,
}

/// All sessions scheduled on one day
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaySchedule {
    pub day: CalendarDay,
    pub sessions: Vec<ScheduledSession>,
}

/// Compact marker for a session in a month cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionIndicator {
    pub session_id: Uuid,
    pub session_type: SessionType,
    pub completed: bool,
}

/// One cell of the month view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthCell {
    pub day: CalendarDay,
    pub total: usize,
    pub indicators: Vec<SessionIndicator>,
    /// Sessions not represented in `indicators`
    pub remaining: usize,
    pub completed_count: usize,
}

/// Result of projecting templates onto a calendar window
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewModel {
    Day { schedule: DaySchedule },
    Week { days: Vec<DaySchedule> },
    Month { cells: Vec<MonthCell> },
    /// Completed workouts per month, index 0 = January
    Year { year: i32, months: [usize; 12] },
}

// ============================================================================
// Projector
// ============================================================================

/// Projects a de-duplicated template set onto calendar windows
pub struct SessionProjector<'a> {
    by_day: BTreeMap<DayOfWeek, Vec<&'a SessionTemplate>>,
    program_names: HashMap<Uuid, String>,
    indicator_limit: usize,
}

impl<'a> SessionProjector<'a> {
    /// Group templates by day of week; undated templates are dropped
    pub fn new(templates: &'a [SessionTemplate], program_names: HashMap<Uuid, String>) -> Self {
        let mut by_day: BTreeMap<DayOfWeek, Vec<&'a SessionTemplate>> = BTreeMap::new();
        let mut undated = 0;

        for template in templates {
            match template.day_of_week {
                Some(day) => by_day.entry(day).or_default().push(template),
                None => undated += 1,
            }
        }

        if undated > 0 {
            tracing::debug!("{} undated templates excluded from calendar", undated);
        }

        SessionProjector {
            by_day,
            program_names,
            indicator_limit: DEFAULT_INDICATOR_LIMIT,
        }
    }

    /// Cap the number of indicators per month cell
    pub fn with_indicator_limit(mut self, limit: usize) -> Self {
        self.indicator_limit = limit;
        self
    }

    fn program_name(&self, template: &SessionTemplate) -> &str {
        self.program_names
            .get(&template.program_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn program_order(&self, a: &SessionTemplate, b: &SessionTemplate) -> std::cmp::Ordering {
        (self.program_name(a), &a.name).cmp(&(self.program_name(b), &b.name))
    }

    /// Templates recurring on `day`, ordered by program name then template name
    pub fn templates_on(&self, day: DayOfWeek) -> Vec<&'a SessionTemplate> {
        let mut templates = self.by_day.get(&day).cloned().unwrap_or_default();
        templates.sort_by(|a, b| self.program_order(a, b));
        templates
    }

    /// Every dated template across the week
    ///
    /// Templates falling on today's day of week come first; the rest
    /// follow by program name then template name.
    pub fn dated_templates(&self, today: NaiveDate) -> Vec<&'a SessionTemplate> {
        let today_dow = DayOfWeek::of(today);
        let mut templates: Vec<&'a SessionTemplate> =
            self.by_day.values().flatten().copied().collect();

        templates.sort_by(|a, b| {
            (a.day_of_week != Some(today_dow))
                .cmp(&(b.day_of_week != Some(today_dow)))
                .then_with(|| self.program_order(a, b))
        });
        templates
    }

    fn schedule_for(&self, day: CalendarDay, completions: &CompletionIndex) -> DaySchedule {
        let sessions = self
            .templates_on(day.day_of_week)
            .into_iter()
            .map(|template| ScheduledSession {
                template: template.clone(),
                program_name: self.program_name(template).to_string(),
                started: completions.is_started(day.date, template.id),
                completed: completions.is_completed(day.date, template.id),
            })
            .collect();

        DaySchedule { day, sessions }
    }

    fn month_cell(&self, day: CalendarDay, completions: &CompletionIndex) -> MonthCell {
        let templates = self.templates_on(day.day_of_week);
        let total = templates.len();
        let indicators: Vec<SessionIndicator> = templates
            .iter()
            .take(self.indicator_limit)
            .map(|t| SessionIndicator {
                session_id: t.id,
                session_type: t.session_type,
                completed: completions.is_completed(day.date, t.id),
            })
            .collect();

        MonthCell {
            day,
            total,
            remaining: total - indicators.len(),
            indicators,
            completed_count: completions.completed_on(day.date),
        }
    }

    /// Project onto the requested window
    pub fn project(
        &self,
        view: CalendarView,
        completions: &CompletionIndex,
        today: NaiveDate,
    ) -> ViewModel {
        tracing::debug!("Projecting {:?} view anchored at {}", view.kind, view.anchor);

        match view.kind {
            ViewKind::Day => ViewModel::Day {
                schedule: self.schedule_for(calendar::single_day(view.anchor, today), completions),
            },
            ViewKind::Week => ViewModel::Week {
                days: calendar::week_days(view.anchor, today)
                    .into_iter()
                    .map(|day| self.schedule_for(day, completions))
                    .collect(),
            },
            ViewKind::Month => ViewModel::Month {
                cells: calendar::month_grid(
                    view.anchor.year(),
                    view.anchor.month() as i32,
                    today,
                )
                .into_iter()
                .map(|day| self.month_cell(day, completions))
                .collect(),
            },
            ViewKind::Year => {
                let year = view.anchor.year();
                let mut months = [0usize; 12];
                for (date, count) in &completions.completed_counts {
                    if date.year() == year {
                        months[date.month0() as usize] += count;
                    }
                }
                ViewModel::Year { year, months }
            }
        }
    }
}
