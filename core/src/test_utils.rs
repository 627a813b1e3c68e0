//! Shared test utilities for integration and unit tests

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cadenza_shared::SelectionState;

use crate::error::{AudioError, GenerationError};
use crate::playback::{AudioBackend, AudioSink};
use crate::service::CompositionTextService;

// ============================================================================
// Test Audio Backends
// ============================================================================

/// Calls observed by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Opened,
    Play,
    Pause,
    Gain(f32),
    Released,
}

/// Shared, drainable event log
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<SinkEvent>>>);

impl EventLog {
    pub fn push(&self, event: SinkEvent) {
        self.0.lock().unwrap().push(event);
    }

    /// Returns and clears the recorded events
    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Backend that records every sink call
#[derive(Debug, Default)]
pub struct RecordingBackend {
    events: EventLog,
    pub open_count: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }
}

impl AudioBackend for RecordingBackend {
    type Sink = RecordingSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError> {
        self.open_count += 1;
        self.events.push(SinkEvent::Opened);
        Ok(RecordingSink {
            events: self.events.clone(),
        })
    }
}

/// Sink that records calls, including its own release
pub struct RecordingSink {
    events: EventLog,
}

impl AudioSink for RecordingSink {
    fn play(&mut self) -> Result<(), AudioError> {
        self.events.push(SinkEvent::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.events.push(SinkEvent::Pause);
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        self.events.push(SinkEvent::Gain(gain));
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        self.events.push(SinkEvent::Released);
    }
}

/// Backend with no output device
pub struct FailingBackend;

impl AudioBackend for FailingBackend {
    type Sink = RecordingSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError> {
        Err(AudioError::NoDevice)
    }
}

// ============================================================================
// Test Text Services
// ============================================================================

/// Service returning a canned reply
pub struct StubService {
    reply: Result<String, GenerationError>,
    calls: AtomicUsize,
    last_selection: Mutex<Option<SelectionState>>,
}

impl StubService {
    pub fn replying(text: &str) -> Self {
        Self::with_reply(Ok(text.to_string()))
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::with_reply(Err(error))
    }

    fn with_reply(reply: Result<String, GenerationError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_selection: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_selection(&self) -> Option<SelectionState> {
        self.last_selection.lock().unwrap().clone()
    }
}

impl CompositionTextService for StubService {
    fn compose(
        &self,
        selection: &SelectionState,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_selection.lock().unwrap() = Some(selection.clone());
        let reply = self.reply.clone();
        async move { reply }
    }
}

/// Service whose request never completes
pub struct NeverService;

impl CompositionTextService for NeverService {
    fn compose(
        &self,
        _selection: &SelectionState,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send {
        std::future::pending()
    }
}

/// A selection with every field filled
pub fn full_selection() -> SelectionState {
    SelectionState::new("Jazz", "Calm", "Slow", "2:00")
}
