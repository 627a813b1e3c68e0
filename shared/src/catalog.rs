//! Option sets offered by the selection form.

use crate::selection::Field;

pub const GENRES: &[&str] = &["Classical", "Jazz", "Electronic", "Ambient", "Rock"];

pub const MOODS: &[&str] = &["Happy", "Melancholic", "Energetic", "Calm", "Mysterious"];

pub const TEMPOS: &[&str] = &["Slow", "Moderate", "Fast", "Very Fast"];

/// Duration labels ("m:ss"). Duration is free-form; these are only the UI presets.
pub const DURATIONS: &[&str] = &["1:00", "2:00", "3:00", "5:00"];

/// Options the UI offers for a field.
pub fn options(field: Field) -> &'static [&'static str] {
    match field {
        Field::Genre => GENRES,
        Field::Mood => MOODS,
        Field::Tempo => TEMPOS,
        Field::Duration => DURATIONS,
    }
}
