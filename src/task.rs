use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::{self, RepeatError, RepeatRule};

/// A task as it travels over the API. Every field is a string on the wire,
/// and missing fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: String,
    pub date: String,
    pub title: String,
    pub comment: String,
    pub repeat: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task title is required")]
    TitleRequired,
    #[error("date has invalid format")]
    InvalidDateFormat,
    // Deliberately hides which rule error occurred
    #[error("failed to compute next date")]
    DateAdvancementFailed,
}

// What marking a task done does to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Remove,
    Reschedule(String),
}

impl Task {
    /// Normalize `date` against `today` before the task is stored.
    ///
    /// An empty date becomes today. A past date snaps to today for one-off
    /// tasks and is advanced by the repeat rule otherwise. `date` is only
    /// touched when validation succeeds.
    pub fn validate(&mut self, today: NaiveDate) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::TitleRequired);
        }

        if self.date.is_empty() {
            self.date = schedule::format_date(today);
            return Ok(());
        }

        let date = schedule::parse_date(&self.date).map_err(|_| ValidationError::InvalidDateFormat)?;

        if schedule::is_blank(&self.repeat) {
            if date < today {
                self.date = schedule::format_date(today);
            }
            return Ok(());
        }

        if date < today {
            self.date = schedule::next_date(today, &self.date, &self.repeat)
                .map_err(|_| ValidationError::DateAdvancementFailed)?;
        } else {
            // A rule that could never advance the task must not be stored either
            self.repeat
                .parse::<RepeatRule>()
                .map_err(|_| ValidationError::DateAdvancementFailed)?;
        }

        Ok(())
    }

    /// Decide what marking this task done means: one-off tasks go away,
    /// recurring ones move to their next date after `today`.
    pub fn complete(&self, today: NaiveDate) -> Result<Completion, RepeatError> {
        if schedule::is_blank(&self.repeat) {
            return Ok(Completion::Remove);
        }

        schedule::next_date(today, &self.date, &self.repeat).map(Completion::Reschedule)
    }
}
