//! TrainingSession domain entity
//!
//! A training session is one separation-anxiety exercise: a sequence of
//! timed absence steps followed by the dog's observed anxiety outcome. The
//! whole list of sessions is the record set that gets backed up remotely.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{RecordId, StepId};

/// Observed anxiety outcome at the end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnxietyScore {
    /// No signs of distress
    Calm,
    /// Mild signs, dog settled on its own
    Coping,
    /// Session had to be cut short
    Panicking,
}

impl AnxietyScore {
    /// Numeric level used by the mobile front end (0, 1, 2)
    pub fn level(self) -> u8 {
        match self {
            AnxietyScore::Calm => 0,
            AnxietyScore::Coping => 1,
            AnxietyScore::Panicking => 2,
        }
    }

    pub fn from_level(level: u8) -> Result<Self, DomainError> {
        match level {
            0 => Ok(AnxietyScore::Calm),
            1 => Ok(AnxietyScore::Coping),
            2 => Ok(AnxietyScore::Panicking),
            other => Err(DomainError::InvalidAnxietyScore(format!(
                "level out of range: {other}"
            ))),
        }
    }

    /// Label written to the exchange file
    pub fn label(self) -> &'static str {
        match self {
            AnxietyScore::Calm => "Calm",
            AnxietyScore::Coping => "Coping",
            AnxietyScore::Panicking => "Panicking",
        }
    }
}

impl fmt::Display for AnxietyScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnxietyScore {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Calm" => Ok(AnxietyScore::Calm),
            "Coping" => Ok(AnxietyScore::Coping),
            "Panicking" => Ok(AnxietyScore::Panicking),
            other => Err(DomainError::InvalidAnxietyScore(format!(
                "unknown anxiety label: {other}"
            ))),
        }
    }
}

/// One timed absence inside a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub duration_seconds: u32,
    pub completed: bool,
}

impl Step {
    pub fn new(duration_seconds: u32, completed: bool) -> Self {
        Self {
            id: StepId::new(),
            duration_seconds,
            completed,
        }
    }
}

/// A recorded training session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Local identifier, not carried by the exchange format
    pub id: RecordId,
    /// When the session took place
    pub date: DateTime<Utc>,
    /// Steps in the order they were run
    pub steps: Vec<Step>,
    pub total_duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anxiety_score: Option<AnxietyScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Whether the session ran to the end
    pub completed: bool,
}

impl TrainingSession {
    /// Creates a session from its steps; the total duration is derived
    pub fn new(date: DateTime<Utc>, steps: Vec<Step>) -> Self {
        let total = steps.iter().map(|s| s.duration_seconds).sum();
        let completed = !steps.is_empty() && steps.iter().all(|s| s.completed);
        Self {
            id: RecordId::new(),
            date,
            steps,
            total_duration_seconds: total,
            anxiety_score: None,
            notes: None,
            completed,
        }
    }

    #[must_use]
    pub fn with_anxiety_score(mut self, score: AnxietyScore) -> Self {
        self.anxiety_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.is_empty() { None } else { Some(notes) };
        self
    }

    /// Number of steps marked as completed
    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }
}
