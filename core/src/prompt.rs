//! Instruction text sent to the generative-text model.

use cadenza_shared::{Field, SelectionState};

/// Word used when a field is empty. The controller validates before
/// calling the service, so these only matter for direct service callers.
pub fn default_value(field: Field) -> &'static str {
    match field {
        Field::Genre => "Any",
        Field::Mood => "Any",
        Field::Tempo => "Moderate",
        Field::Duration => "3 minutes",
    }
}

/// Builds the composition request for a selection.
///
/// Values are embedded verbatim (after trimming); the output is
/// deterministic for a given selection.
pub fn build_prompt(selection: &SelectionState) -> String {
    let value = |field: Field| {
        let v = selection.get(field).trim();
        if v.is_empty() { default_value(field) } else { v }
    };

    format!(
        "Generate a detailed music composition description based on the following parameters:\n\
         Genre: {}\n\
         Mood: {}\n\
         Tempo: {}\n\
         Duration: {}\n\
         \n\
         Include specific details about:\n\
         1. Musical structure\n\
         2. Key instruments\n\
         3. Rhythm patterns\n\
         4. Melodic themes",
        value(Field::Genre),
        value(Field::Mood),
        value(Field::Tempo),
        value(Field::Duration),
    )
}
