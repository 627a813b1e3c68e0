//! Playback state and the audio output seam
//!
//! The composer drives one looping clip through an [`AudioSink`]. The sink
//! is opened lazily by an [`AudioBackend`] the first time playback starts,
//! kept for later compositions, and released when [`Playback`] is torn down.

use crate::error::AudioError;

/// Highest volume value.
pub const MAX_VOLUME: u8 = 100;

/// User-facing playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    /// Whether the sink is currently producing sound
    pub is_playing: bool,
    /// Volume in 0..=100
    pub volume: u8,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            volume: 50,
        }
    }
}

impl PlaybackState {
    /// Normalized gain (0.0 - 1.0) applied to the output.
    pub fn gain(&self) -> f32 {
        f32::from(self.volume) / f32::from(MAX_VOLUME)
    }
}

/// Clamps an arbitrary volume request into 0..=100.
pub fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(0, i32::from(MAX_VOLUME)) as u8
}

/// A single looping audio output.
///
/// Dropping the sink releases the underlying device resources.
pub trait AudioSink {
    /// Start or resume the loop
    fn play(&mut self) -> Result<(), AudioError>;

    /// Pause the loop, keeping its position
    fn pause(&mut self) -> Result<(), AudioError>;

    /// Set the output gain (0.0 - 1.0)
    fn set_gain(&mut self, gain: f32);
}

/// Opens sinks for the configured clip.
pub trait AudioBackend {
    type Sink: AudioSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError>;
}

/// Backend whose sinks accept every call and produce no sound.
///
/// Used when audio is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBackend;

/// Sink of [`SilentBackend`].
#[derive(Debug, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_gain(&mut self, _gain: f32) {}
}

impl AudioBackend for SilentBackend {
    type Sink = SilentSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError> {
        Ok(SilentSink)
    }
}

/// Owns the backend, the (optional) open sink, and the mirrored state.
///
/// Audio failures are logged and leave `is_playing` false; they are never
/// returned to the caller.
pub struct Playback<B: AudioBackend> {
    backend: B,
    sink: Option<B::Sink>,
    state: PlaybackState,
}

impl<B: AudioBackend> Playback<B> {
    /// Creates playback with no sink open.
    pub fn new(backend: B, volume: u8) -> Self {
        Self {
            backend,
            sink: None,
            state: PlaybackState {
                is_playing: false,
                volume: volume.min(MAX_VOLUME),
            },
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether a sink is currently open.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Opens the sink if needed.
    fn ensure_sink(&mut self) -> Option<&mut B::Sink> {
        if self.sink.is_none() {
            match self.backend.open() {
                Ok(mut sink) => {
                    sink.set_gain(self.state.gain());
                    tracing::debug!("Audio sink opened");
                    self.sink = Some(sink);
                }
                Err(e) => {
                    tracing::error!("Failed to open audio output: {}", e);
                    return None;
                }
            }
        }
        self.sink.as_mut()
    }

    /// Starts or stops the loop. Opens the sink on first play.
    pub fn set_playing(&mut self, playing: bool) {
        if playing {
            let Some(sink) = self.ensure_sink() else {
                self.state.is_playing = false;
                return;
            };
            match sink.play() {
                Ok(()) => self.state.is_playing = true,
                Err(e) => {
                    tracing::error!("Failed to start playback: {}", e);
                    self.state.is_playing = false;
                }
            }
        } else if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.pause() {
                tracing::error!("Failed to pause playback: {}", e);
            }
            self.state.is_playing = false;
        } else {
            self.state.is_playing = false;
        }
    }

    /// Clamps and applies a volume. Returns the stored value.
    pub fn set_volume(&mut self, volume: i32) -> u8 {
        self.state.volume = clamp_volume(volume);
        let gain = self.state.gain();
        if let Some(sink) = self.sink.as_mut() {
            sink.set_gain(gain);
        }
        self.state.volume
    }

    /// Pauses and releases the sink, whatever the current state.
    pub fn teardown(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.pause() {
                tracing::warn!("Failed to pause audio during teardown: {}", e);
            }
            drop(sink);
            tracing::debug!("Audio sink released");
        }
        self.state.is_playing = false;
    }
}

impl<B: AudioBackend> Drop for Playback<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingBackend, RecordingBackend, SinkEvent};

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(150), 100);
        assert_eq!(clamp_volume(-10), 0);
        assert_eq!(clamp_volume(42), 42);
        assert_eq!(clamp_volume(i32::MAX), 100);
    }

    #[test]
    fn test_gain_is_volume_over_100() {
        let state = PlaybackState {
            is_playing: false,
            volume: 25,
        };
        assert!((state.gain() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sink_opened_lazily_on_first_play() {
        let backend = RecordingBackend::new();
        let events = backend.events();
        let mut playback = Playback::new(backend, 40);

        playback.set_volume(60);
        assert!(!playback.has_sink());
        assert!(events.take().is_empty());

        playback.set_playing(true);
        assert!(playback.state().is_playing);
        assert_eq!(
            events.take(),
            vec![SinkEvent::Opened, SinkEvent::Gain(0.6), SinkEvent::Play]
        );
    }

    #[test]
    fn test_volume_applied_to_open_sink() {
        let backend = RecordingBackend::new();
        let events = backend.events();
        let mut playback = Playback::new(backend, 50);
        playback.set_playing(true);
        events.take();

        assert_eq!(playback.set_volume(150), 100);
        assert_eq!(playback.set_volume(-10), 0);
        assert_eq!(
            events.take(),
            vec![SinkEvent::Gain(1.0), SinkEvent::Gain(0.0)]
        );
    }

    #[test]
    fn test_pause_without_sink_is_noop() {
        let backend = RecordingBackend::new();
        let events = backend.events();
        let mut playback = Playback::new(backend, 50);
        playback.set_playing(false);
        assert!(!playback.state().is_playing);
        assert!(events.take().is_empty());
    }

    #[test]
    fn test_open_failure_leaves_not_playing() {
        let mut playback = Playback::new(FailingBackend, 50);
        playback.set_playing(true);
        assert!(!playback.state().is_playing);
        assert!(!playback.has_sink());
    }

    #[test]
    fn test_drop_pauses_and_releases() {
        let backend = RecordingBackend::new();
        let events = backend.events();
        let mut playback = Playback::new(backend, 50);
        playback.set_playing(true);
        events.take();

        drop(playback);
        assert_eq!(events.take(), vec![SinkEvent::Pause, SinkEvent::Released]);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let backend = RecordingBackend::new();
        let events = backend.events();
        let mut playback = Playback::new(backend, 50);
        playback.set_playing(true);
        playback.teardown();
        events.take();

        playback.teardown();
        drop(playback);
        assert!(events.take().is_empty());
    }

    #[test]
    fn test_initial_volume_capped() {
        let playback = Playback::new(SilentBackend, 200);
        assert_eq!(playback.state().volume, 100);
    }
}
