//! Parameter form controller
//!
//! [`Composer`] owns the selection form, the composition lifecycle and the
//! playback state. Every change is published as a [`ComposerSnapshot`] on a
//! `tokio::sync::watch` channel; views call [`Composer::subscribe`] and
//! re-render from the latest snapshot.
//!
//! Lifecycle: `Idle → Loading → {Ready, Failed}`. Both `Ready` and `Failed`
//! go back to `Loading` on the next generation; there is no terminal state.
//!
//! Generation comes in two shapes:
//! - [`Composer::generate`] awaits the service in place.
//! - [`Composer::begin_generation`] / [`Composer::finish_generation`] let
//!   the caller run the request elsewhere while still handling playback
//!   commands. The [`PendingGeneration`] ticket clears the loading state when
//!   dropped unfinished.

use std::sync::{Arc, Weak};

use cadenza_shared::{Field, SelectionState};
use tokio::sync::watch;

use crate::error::{ComposerError, GenerationError, ValidationError};
use crate::formatter::{Segment, format_composition, markup_segments};
use crate::playback::{AudioBackend, Playback, PlaybackState};
use crate::service::CompositionTextService;

/// Where the composition lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A request is outstanding
    Loading,
    /// The last request produced a composition
    Ready,
    /// The last request failed
    Failed,
}

/// Text returned by the service and its formatted rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedComposition {
    pub raw: String,
    pub markup: String,
}

impl GeneratedComposition {
    pub fn new(raw: String) -> Self {
        let markup = format_composition(&raw);
        Self { raw, markup }
    }

    /// Display runs of the formatted text.
    pub fn segments(&self) -> Vec<Segment> {
        markup_segments(&self.markup)
    }
}

/// Everything a view needs to render the composer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposerSnapshot {
    pub selection: SelectionState,
    pub phase: Phase,
    /// Latest successful composition; kept across failures
    pub composition: Option<GeneratedComposition>,
    pub playback: PlaybackState,
    /// Blocking message for the user (validation failures)
    pub notice: Option<String>,
    /// Message of the last failed generation
    pub last_error: Option<String>,
}

impl ComposerSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn can_generate(&self) -> bool {
        self.selection.is_complete()
    }
}

/// Ticket for an outstanding generation request.
///
/// Hand it back to [`Composer::finish_generation`] with the service result.
/// Dropping it unfinished (cancelled request, torn-down worker) restores the
/// phase that preceded `Loading`.
#[derive(Debug)]
pub struct PendingGeneration {
    id: u64,
    selection: SelectionState,
    previous: Phase,
    state: Weak<watch::Sender<ComposerSnapshot>>,
    finished: bool,
}

impl PendingGeneration {
    /// Selection captured when the request started.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }
}

impl Drop for PendingGeneration {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            let previous = self.previous;
            state.send_if_modified(|s| {
                if s.phase == Phase::Loading {
                    s.phase = previous;
                    true
                } else {
                    false
                }
            });
            tracing::debug!("Generation {} abandoned before completion", self.id);
        }
    }
}

/// The parameter form controller.
pub struct Composer<B: AudioBackend> {
    state: Arc<watch::Sender<ComposerSnapshot>>,
    playback: Playback<B>,
    generation: u64,
}

impl<B: AudioBackend> Composer<B> {
    /// Creates a controller with an empty form and no sink open.
    pub fn new(backend: B, initial_volume: u8) -> Self {
        let playback = Playback::new(backend, initial_volume);
        let snapshot = ComposerSnapshot {
            playback: playback.state(),
            ..Default::default()
        };
        let (state, _) = watch::channel(snapshot);
        Self {
            state: Arc::new(state),
            playback,
            generation: 0,
        }
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ComposerSnapshot> {
        self.state.subscribe()
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> ComposerSnapshot {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == Phase::Loading
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Sets one selection field.
    pub fn update_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        self.state.send_modify(|s| s.selection.set(field, value));
    }

    /// True iff all four fields are non-empty.
    pub fn can_generate(&self) -> bool {
        self.state.borrow().can_generate()
    }

    /// Clears the pending user notice.
    pub fn dismiss_notice(&mut self) {
        self.state.send_if_modified(|s| s.notice.take().is_some());
    }

    /// Validates the form and enters `Loading`.
    ///
    /// # Errors
    ///
    /// [`ComposerError::Validation`] when a field is empty (also posted as a
    /// notice), [`ComposerError::Busy`] when a request is already
    /// outstanding. Neither changes the phase.
    pub fn begin_generation(&mut self) -> Result<PendingGeneration, ComposerError> {
        if self.is_loading() {
            tracing::debug!("Generation already in progress, ignoring request");
            return Err(ComposerError::Busy);
        }

        let missing = self.state.borrow().selection.missing_fields();
        if !missing.is_empty() {
            let err = ValidationError::MissingFields(missing);
            tracing::info!("{}", err);
            let notice = err.to_string();
            self.state.send_modify(|s| s.notice = Some(notice));
            return Err(err.into());
        }

        self.generation += 1;
        let mut previous = Phase::Idle;
        let mut selection = SelectionState::default();
        self.state.send_modify(|s| {
            previous = s.phase;
            selection = s.selection.clone();
            s.phase = Phase::Loading;
            s.notice = None;
        });

        tracing::info!(
            "Generating composition: {} / {} / {} / {}",
            selection.genre,
            selection.mood,
            selection.tempo,
            selection.duration
        );

        Ok(PendingGeneration {
            id: self.generation,
            selection,
            previous,
            state: Arc::downgrade(&self.state),
            finished: false,
        })
    }

    /// Applies the service result for `pending`.
    ///
    /// On success the text is formatted, replaces any earlier composition,
    /// and playback starts. On failure the error is logged, the phase becomes
    /// `Failed`, and the earlier composition (if any) stays on display.
    /// `Loading` is cleared either way.
    pub fn finish_generation(
        &mut self,
        mut pending: PendingGeneration,
        result: Result<String, GenerationError>,
    ) -> Result<(), GenerationError> {
        pending.finished = true;
        tracing::debug!("Generation {} finished", pending.id);

        match result {
            Ok(raw) => {
                let composition = GeneratedComposition::new(raw);
                self.playback.set_playing(true);
                let playback = self.playback.state();
                self.state.send_modify(|s| {
                    s.phase = Phase::Ready;
                    s.composition = Some(composition);
                    s.last_error = None;
                    s.playback = playback;
                });
                tracing::info!("Composition ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error generating composition: {}", e);
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.phase = Phase::Failed;
                    s.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Validates, calls `service`, and applies the result.
    pub async fn generate(
        &mut self,
        service: &impl CompositionTextService,
    ) -> Result<(), ComposerError> {
        let pending = self.begin_generation()?;
        let result = service.compose(pending.selection()).await;
        self.finish_generation(pending, result)?;
        Ok(())
    }

    /// Starts or pauses the loop.
    ///
    /// Has no effect before the first composition exists.
    pub fn set_playing(&mut self, playing: bool) {
        if self.state.borrow().composition.is_none() {
            tracing::debug!("No composition yet, ignoring playback toggle");
            return;
        }
        self.playback.set_playing(playing);
        self.publish_playback();
    }

    pub fn toggle_playing(&mut self) {
        let playing = self.playback.state().is_playing;
        self.set_playing(!playing);
    }

    /// Clamps `volume` to 0..=100 and applies it. Returns the stored value.
    pub fn set_volume(&mut self, volume: i32) -> u8 {
        let stored = self.playback.set_volume(volume);
        self.publish_playback();
        stored
    }

    /// Pauses and releases the audio sink.
    ///
    /// Called automatically on drop.
    pub fn teardown(&mut self) {
        self.playback.teardown();
        self.publish_playback();
    }

    fn publish_playback(&mut self) {
        let playback = self.playback.state();
        self.state.send_if_modified(|s| {
            if s.playback == playback {
                false
            } else {
                s.playback = playback;
                true
            }
        });
    }
}

impl<B: AudioBackend> Drop for Composer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
