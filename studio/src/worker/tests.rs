use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cadenza_core::{AudioError, AudioSink, Phase, SelectionState, SilentBackend};
use tokio::sync::Notify;

/// Service that replies only once its gate is opened
#[derive(Clone, Default)]
struct GateService {
    gate: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GateService {
    fn open(&self) {
        self.gate.notify_one();
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompositionTextService for GateService {
    fn compose(
        &self,
        selection: &SelectionState,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = Arc::clone(&self.gate);
        let reply = format!("Genre: {}\n0:00-0:30 (Intro)", selection.genre);
        async move {
            gate.notified().await;
            Ok(reply)
        }
    }
}

/// Backend whose sink reports play state and release through flags
#[derive(Clone, Default)]
struct FlagBackend {
    playing: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

struct FlagSink {
    playing: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl AudioBackend for FlagBackend {
    type Sink = FlagSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError> {
        Ok(FlagSink {
            playing: Arc::clone(&self.playing),
            released: Arc::clone(&self.released),
        })
    }
}

impl AudioSink for FlagSink {
    fn play(&mut self) -> Result<(), AudioError> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_gain(&mut self, _gain: f32) {}
}

impl Drop for FlagSink {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

fn wait_for(
    rx: &watch::Receiver<ComposerSnapshot>,
    pred: impl Fn(&ComposerSnapshot) -> bool,
) -> ComposerSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = rx.borrow().clone();
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for composer state: {snapshot:?}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

fn fill_form(handle: &ComposerHandle) {
    for (field, value) in [
        (Field::Genre, "Jazz"),
        (Field::Mood, "Calm"),
        (Field::Tempo, "Slow"),
        (Field::Duration, "2:00"),
    ] {
        assert!(handle.send(Command::SetField(field, value.to_string())));
    }
}

#[test]
fn test_commands_flow_while_request_pending() {
    let service = GateService::default();
    let handle = ComposerHandle::spawn(SilentBackend, service.clone(), 50, || {}).unwrap();
    let rx = handle.subscribe();

    fill_form(&handle);
    handle.send(Command::Generate);
    wait_for(&rx, |s| s.is_loading());

    handle.send(Command::SetVolume(80));
    let snapshot = wait_for(&rx, |s| s.playback.volume == 80);
    assert!(snapshot.is_loading());

    // A second click while loading is ignored
    handle.send(Command::Generate);
    handle.send(Command::SetVolume(70));
    let snapshot = wait_for(&rx, |s| s.playback.volume == 70);
    assert!(snapshot.is_loading());
    service.open();

    let snapshot = wait_for(&rx, |s| s.phase == Phase::Ready);
    assert_eq!(
        snapshot.composition.unwrap().markup,
        "<strong>Genre:</strong> Jazz\n<strong>0:00-0:30 (Intro)</strong>"
    );
    assert!(snapshot.playback.is_playing);
    assert_eq!(service.calls(), 1);
}

#[test]
fn test_generate_queued_with_response_is_refused() {
    let service = GateService::default();
    let handle = ComposerHandle::spawn(SilentBackend, service.clone(), 50, || {}).unwrap();
    let rx = handle.subscribe();

    fill_form(&handle);
    handle.send(Command::Generate);
    wait_for(&rx, |s| s.is_loading());

    // The click is queued before the response can resolve
    handle.send(Command::Generate);
    service.open();

    wait_for(&rx, |s| s.phase == Phase::Ready);
    handle.shutdown();
    assert_eq!(service.calls(), 1);
}

#[test]
fn test_incomplete_form_posts_notice() {
    let service = GateService::default();
    let handle = ComposerHandle::spawn(SilentBackend, service.clone(), 50, || {}).unwrap();
    let rx = handle.subscribe();

    handle.send(Command::SetField(Field::Genre, "Rock".to_string()));
    handle.send(Command::Generate);
    let snapshot = wait_for(&rx, |s| s.notice.is_some());
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(service.calls(), 0);

    handle.send(Command::DismissNotice);
    wait_for(&rx, |s| s.notice.is_none());
}

#[test]
fn test_on_change_called_per_event() {
    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let handle = ComposerHandle::spawn(SilentBackend, GateService::default(), 50, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    let rx = handle.subscribe();

    handle.send(Command::SetVolume(10));
    wait_for(&rx, |s| s.playback.volume == 10);
    handle.shutdown();
    assert!(changes.load(Ordering::SeqCst) >= 2);
}

#[test]
fn test_shutdown_releases_sink() {
    let backend = FlagBackend::default();
    let service = GateService::default();
    let handle = ComposerHandle::spawn(backend.clone(), service.clone(), 50, || {}).unwrap();
    let rx = handle.subscribe();

    fill_form(&handle);
    handle.send(Command::Generate);
    wait_for(&rx, |s| s.is_loading());
    service.open();
    wait_for(&rx, |s| s.playback.is_playing);
    assert!(backend.playing.load(Ordering::SeqCst));

    handle.shutdown();

    assert!(!backend.playing.load(Ordering::SeqCst));
    assert!(backend.released.load(Ordering::SeqCst));
    assert!(!rx.borrow().playback.is_playing);
}

#[test]
fn test_drop_with_request_in_flight() {
    let service = GateService::default();
    let handle = ComposerHandle::spawn(SilentBackend, service.clone(), 50, || {}).unwrap();
    let rx = handle.subscribe();

    fill_form(&handle);
    handle.send(Command::Generate);
    wait_for(&rx, |s| s.is_loading());
    assert!(handle.is_alive());

    drop(handle);

    let last = rx.borrow().clone();
    assert!(!last.is_loading());
    assert!(last.composition.is_none());
}
