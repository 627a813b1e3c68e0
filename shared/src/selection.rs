//! The four user-chosen composition parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four selection fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Genre,
    Mood,
    Tempo,
    Duration,
}

impl Field {
    /// All fields in display order.
    pub const ALL: [Field; 4] = [Field::Genre, Field::Mood, Field::Tempo, Field::Duration];

    /// Human-readable label ("Genre", "Mood", ...).
    pub fn label(self) -> &'static str {
        match self {
            Field::Genre => "Genre",
            Field::Mood => "Mood",
            Field::Tempo => "Tempo",
            Field::Duration => "Duration",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current values of the selection form.
///
/// An empty (or whitespace-only) string means "not selected yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub genre: String,
    pub mood: String,
    pub tempo: String,
    pub duration: String,
}

impl SelectionState {
    /// Creates a fully populated selection.
    pub fn new(
        genre: impl Into<String>,
        mood: impl Into<String>,
        tempo: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            genre: genre.into(),
            mood: mood.into(),
            tempo: tempo.into(),
            duration: duration.into(),
        }
    }

    /// Returns the value of one field.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Genre => &self.genre,
            Field::Mood => &self.mood,
            Field::Tempo => &self.tempo,
            Field::Duration => &self.duration,
        }
    }

    /// Replaces the value of one field.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Genre => &mut self.genre,
            Field::Mood => &mut self.mood,
            Field::Tempo => &mut self.tempo,
            Field::Duration => &mut self.duration,
        };
        *slot = value.into();
    }

    /// Fields that are still empty, in display order.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|&field| self.get(field).trim().is_empty())
            .collect()
    }

    /// True when every field has a non-empty value.
    pub fn is_complete(&self) -> bool {
        Field::ALL
            .into_iter()
            .all(|field| !self.get(field).trim().is_empty())
    }
}
