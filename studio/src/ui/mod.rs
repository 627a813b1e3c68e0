//! Composer window
//!
//! Renders a [`ComposerSnapshot`]: the four parameter dropdowns, the
//! generate button, the formatted composition and its playback controls.
//! Nothing here mutates state directly; user input comes back as a
//! [`UiAction`] for the application to forward to the worker.

use cadenza_core::{ComposerSnapshot, Field, Segment};
use cadenza_shared::catalog;
use egui::text::LayoutJob;

/// Point size of the composition text
const COMPOSITION_TEXT_SIZE: f32 = 15.0;

/// The composer UI.
#[derive(Debug, Default)]
pub struct ComposerUi;

impl ComposerUi {
    pub fn new() -> Self {
        Self
    }

    /// Renders the composer and returns any user action.
    pub fn show(&mut self, ctx: &egui::Context, snapshot: &ComposerSnapshot) -> Option<UiAction> {
        let mut action = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Cadenza");
            ui.label("Pick a genre, mood, tempo and length, then let the model compose.");
            ui.separator();

            egui::Grid::new("parameters_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    for field in Field::ALL {
                        ui.label(field.label());
                        if let Some(a) = field_combo(ui, field, snapshot.selection.get(field)) {
                            action = Some(a);
                        }
                        ui.end_row();
                    }
                });

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                let loading = snapshot.is_loading();
                let label = if loading {
                    "Generating..."
                } else {
                    "Generate Music"
                };
                if ui
                    .add_enabled(!loading, egui::Button::new(label))
                    .clicked()
                {
                    action = Some(UiAction::Generate);
                }
                if loading {
                    ui.spinner();
                }
            });

            if let Some(ref error) = snapshot.last_error {
                ui.colored_label(
                    egui::Color32::RED,
                    format!("Generation failed: {}", error),
                );
            }

            let Some(ref composition) = snapshot.composition else {
                return;
            };

            ui.separator();
            ui.heading("Your Composition");

            ui.horizontal(|ui| {
                let label = if snapshot.playback.is_playing {
                    "Pause"
                } else {
                    "Play"
                };
                if ui.button(label).clicked() {
                    action = Some(UiAction::TogglePlaying);
                }

                let mut volume = snapshot.playback.volume;
                if ui
                    .add(egui::Slider::new(&mut volume, 0..=100).text("Volume"))
                    .changed()
                {
                    action = Some(UiAction::SetVolume(i32::from(volume)));
                }
            });

            ui.add_space(6.0);
            egui::ScrollArea::vertical().show(ui, |ui| {
                let mut job = composition_job(
                    &composition.segments(),
                    ui.visuals().text_color(),
                    ui.visuals().strong_text_color(),
                );
                job.wrap.max_width = ui.available_width();
                ui.label(job);
            });
        });

        action
    }
}

/// Dropdown for one field. Returns an action when a new option is picked.
fn field_combo(ui: &mut egui::Ui, field: Field, current: &str) -> Option<UiAction> {
    let mut action = None;

    egui::ComboBox::from_id_salt(field.label())
        .selected_text(selected_text(field, current))
        .width(180.0)
        .show_ui(ui, |ui| {
            for &option in catalog::options(field) {
                if ui.selectable_label(current == option, option).clicked() && current != option {
                    action = Some(UiAction::SetField(field, option.to_string()));
                }
            }
        });

    action
}

/// Text shown in a closed dropdown.
pub fn selected_text(field: Field, current: &str) -> String {
    if current.trim().is_empty() {
        format!("Select {}", field.label())
    } else {
        current.to_string()
    }
}

/// Lays out formatted composition runs, with strong runs highlighted.
pub fn composition_job(
    segments: &[Segment],
    text_color: egui::Color32,
    strong_color: egui::Color32,
) -> LayoutJob {
    let mut job = LayoutJob::default();
    for segment in segments {
        let color = if segment.strong {
            strong_color
        } else {
            text_color
        };
        job.append(
            &segment.text,
            0.0,
            egui::TextFormat {
                font_id: egui::FontId::proportional(COMPOSITION_TEXT_SIZE),
                color,
                ..Default::default()
            },
        );
    }
    job
}

/// Actions the user can trigger from the composer UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Pick a value for one parameter
    SetField(Field, String),
    /// Request a new composition
    Generate,
    /// Flip play/pause
    TogglePlaying,
    /// Move the volume slider
    SetVolume(i32),
}
