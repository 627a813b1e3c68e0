//! Studio application state and main loop
//!
//! The window owns a [`ComposerHandle`]; every frame it renders the latest
//! snapshot and forwards user actions as worker commands.

mod init;

pub use init::AppError;

use eframe::egui;

use cadenza_core::config::Config;
use cadenza_core::{ComposerSnapshot, GenerativeTextClient};

use crate::audio::backend_from_config;
use crate::ui::{ComposerUi, UiAction};
use crate::worker::{Command, ComposerHandle};

/// Studio application state
pub struct App {
    /// Handle to the generation worker
    composer: ComposerHandle,
    /// Composer UI state
    composer_ui: ComposerUi,
    /// Whether the current notice has already been shown
    notice_shown: bool,
    /// Shown while no API credential is configured
    credential_hint: Option<String>,
}

impl App {
    pub fn new(composer: ComposerHandle, credential_hint: Option<String>) -> Self {
        Self {
            composer,
            composer_ui: ComposerUi::new(),
            notice_shown: false,
            credential_hint,
        }
    }

    /// Handle UI actions
    fn handle_ui_action(&mut self, action: UiAction) {
        let command = match action {
            UiAction::SetField(field, value) => {
                tracing::debug!("{} set to {}", field, value);
                Command::SetField(field, value)
            }
            UiAction::Generate => Command::Generate,
            UiAction::TogglePlaying => Command::TogglePlaying,
            UiAction::SetVolume(volume) => Command::SetVolume(volume),
        };
        self.composer.send(command);
    }

    /// Shows a pending notice as a blocking dialog, once.
    fn show_notice(&mut self, snapshot: &ComposerSnapshot) {
        let Some(ref notice) = snapshot.notice else {
            self.notice_shown = false;
            return;
        };
        if self.notice_shown {
            return;
        }
        self.notice_shown = true;

        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("Cadenza")
            .set_description(notice)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();

        self.composer.send(Command::DismissNotice);
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle F11 for fullscreen toggle
        if ctx.input(|i| i.key_pressed(egui::Key::F11)) {
            let is_fullscreen = ctx.input(|i| i.viewport().fullscreen).unwrap_or(false);
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!is_fullscreen));
        }

        if !self.composer.is_alive() {
            egui::TopBottomPanel::top("error_panel").show(ctx, |ui| {
                ui.colored_label(egui::Color32::RED, "Error: composer worker stopped");
            });
        } else if let Some(ref hint) = self.credential_hint {
            egui::TopBottomPanel::top("credential_panel").show(ctx, |ui| {
                ui.colored_label(egui::Color32::YELLOW, hint);
            });
        }

        let snapshot = self.composer.snapshot();

        if let Some(action) = self.composer_ui.show(ctx, &snapshot) {
            self.handle_ui_action(action);
        }

        self.show_notice(&snapshot);
    }
}

/// Banner text for a client without a credential.
fn credential_hint(service: &GenerativeTextClient, key_env: &str) -> Option<String> {
    if service.has_credential() {
        None
    } else {
        Some(format!(
            "No API key found: set {} and restart to generate compositions",
            key_env
        ))
    }
}

/// Run the studio application
pub fn run(config: Config) -> Result<(), AppError> {
    tracing::info!("Starting Cadenza");

    let service = GenerativeTextClient::from_env(&config.api)?;
    let credential_hint = credential_hint(&service, &config.api.key_env);
    let backend = backend_from_config(&config.audio);
    let initial_volume = config.audio.initial_volume;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Cadenza")
            .with_inner_size([config.ui.width, config.ui.height])
            .with_fullscreen(config.ui.fullscreen),
        ..Default::default()
    };

    eframe::run_native(
        "Cadenza",
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let composer =
                ComposerHandle::spawn(backend, service, initial_volume, move || {
                    ctx.request_repaint()
                })?;
            Ok(Box::new(App::new(composer, credential_hint)))
        }),
    )
    .map_err(|e| AppError::EventLoop(format!("eframe error: {}", e)))?;

    tracing::info!("Cadenza closed");
    Ok(())
}
