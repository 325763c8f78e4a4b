//! Daily home-screen message: a coach message when one applies, otherwise
//! the quote of the day.

use crate::{CoachMessage, MotivationalQuote};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use serde::Serialize;
use uuid::Uuid;

/// Built-in quotes, built once and reused
static DEFAULT_QUOTES: Lazy<Vec<MotivationalQuote>> = Lazy::new(|| {
    [
        ("The only bad workout is the one that didn't happen.", None),
        ("Discipline is choosing between what you want now and what you want most.", Some("Abraham Lincoln")),
        ("Strength does not come from winning. Your struggles develop your strengths.", Some("Arnold Schwarzenegger")),
        ("It never gets easier, you just get better.", None),
        ("Success is the sum of small efforts, repeated day in and day out.", Some("Robert Collier")),
        ("Take care of your body. It's the only place you have to live.", Some("Jim Rohn")),
        ("The pain you feel today will be the strength you feel tomorrow.", None),
        ("Motivation gets you started. Habit keeps you going.", Some("Jim Ryun")),
        ("Rest is part of training, not a break from it.", None),
        ("You don't have to be extreme, just consistent.", None),
    ]
    .into_iter()
    .map(|(text, author)| MotivationalQuote {
        text: text.to_string(),
        author: author.map(str::to_string),
    })
    .collect()
});

/// The built-in quote list
pub fn default_quotes() -> &'static [MotivationalQuote] {
    &DEFAULT_QUOTES
}

/// Quote for `today`: day-of-year modulo the number of quotes
///
/// Every athlete sees the same quote on the same day.
pub fn quote_of_the_day(quotes: &[MotivationalQuote], today: NaiveDate) -> Option<&MotivationalQuote> {
    if quotes.is_empty() {
        return None;
    }
    quotes.get(today.ordinal() as usize % quotes.len())
}

/// Whether a message should be shown to its athlete on `today`
pub fn is_active(message: &CoachMessage, today: NaiveDate) -> bool {
    message.display_date <= today && message.expires_on.map_or(true, |end| today <= end)
}

fn newest<'a>(candidates: impl Iterator<Item = &'a CoachMessage>) -> Option<&'a CoachMessage> {
    candidates.max_by_key(|m| (m.display_date, m.created_at))
}

/// What the home screen shows for the day
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DailyMessage<'a> {
    Coach { message: &'a CoachMessage },
    Quote { quote: &'a MotivationalQuote },
}

/// Pick the day's message for an athlete
///
/// Active coach messages win over the quote: the most recent unread one,
/// or failing that the most recent one.
pub fn daily_message<'a>(
    messages: &'a [CoachMessage],
    quotes: &'a [MotivationalQuote],
    athlete_id: Uuid,
    today: NaiveDate,
) -> Option<DailyMessage<'a>> {
    let active: Vec<&CoachMessage> = messages
        .iter()
        .filter(|m| m.athlete_id == athlete_id && is_active(m, today))
        .collect();

    let chosen = newest(active.iter().copied().filter(|m| m.read_at.is_none()))
        .or_else(|| newest(active.iter().copied()));

    match chosen {
        Some(message) => {
            tracing::debug!("Showing coach message {} to athlete {}", message.id, athlete_id);
            Some(DailyMessage::Coach { message })
        }
        None => quote_of_the_day(quotes, today).map(|quote| DailyMessage::Quote { quote }),
    }
}
