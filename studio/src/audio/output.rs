//! Looping clip output using cpal

use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, warn};

use cadenza_core::{AudioBackend, AudioError, AudioSink};

use super::clip::{Clip, LoopCursor};

/// State shared between a sink and its stream callback
#[derive(Debug)]
struct LoopControl {
    /// Output gain stored as f32 bits
    gain: AtomicU32,
    /// When false the callback writes silence and holds its position
    playing: AtomicBool,
}

impl LoopControl {
    fn new() -> Self {
        Self {
            gain: AtomicU32::new(1.0f32.to_bits()),
            playing: AtomicBool::new(false),
        }
    }

    fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    fn set_gain(&self, gain: f32) {
        self.gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }
}

/// Renders one callback buffer.
fn render(
    clip: &Clip,
    cursor: &mut LoopCursor,
    control: &LoopControl,
    out: &mut [f32],
    channels: usize,
) {
    if control.is_playing() {
        cursor.fill(clip, out, channels, control.gain());
    } else {
        out.fill(0.0);
    }
}

/// Where the looping clip currently is.
#[derive(Debug, Clone)]
pub enum ClipState {
    /// Still being fetched or decoded
    Loading,
    Ready(Arc<Clip>),
    /// Audio disabled, or the clip failed to load
    Unavailable,
}

/// Clip shared between a backend, its streams and a background loader.
///
/// Filled at most once.
#[derive(Debug, Clone, Default)]
pub struct ClipSlot(Arc<OnceLock<Option<Arc<Clip>>>>);

impl ClipSlot {
    /// Slot waiting for [`ClipSlot::fill`].
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn fill(&self, clip: Option<Clip>) {
        if self.0.set(clip.map(Arc::new)).is_err() {
            warn!("Audio clip already loaded, ignoring new one");
        }
    }

    pub fn state(&self) -> ClipState {
        match self.0.get() {
            None => ClipState::Loading,
            Some(Some(clip)) => ClipState::Ready(Arc::clone(clip)),
            Some(None) => ClipState::Unavailable,
        }
    }
}

/// Stream-side playhead. Picks the clip up once it is ready.
struct LoopSource {
    slot: ClipSlot,
    output_rate: u32,
    active: Option<(Arc<Clip>, LoopCursor)>,
}

impl LoopSource {
    fn new(slot: ClipSlot, output_rate: u32) -> Self {
        Self {
            slot,
            output_rate,
            active: None,
        }
    }

    fn render(&mut self, control: &LoopControl, out: &mut [f32], channels: usize) {
        if self.active.is_none()
            && let ClipState::Ready(clip) = self.slot.state()
        {
            let cursor = LoopCursor::new(clip.sample_rate, self.output_rate);
            self.active = Some((clip, cursor));
        }

        match self.active.as_mut() {
            Some((clip, cursor)) => render(&**clip, cursor, control, out, channels),
            None => out.fill(0.0),
        }
    }
}

/// Opens cpal streams for the looping clip.
///
/// A stream opened while the clip is still loading plays silence until it
/// arrives. Once the clip is known to be unavailable every sink is silent
/// and accepts all calls.
#[derive(Debug, Clone)]
pub struct ClipBackend {
    slot: ClipSlot,
}

impl ClipBackend {
    /// Backend with no output.
    pub fn new_stub() -> Self {
        let slot = ClipSlot::pending();
        slot.fill(None);
        Self { slot }
    }

    /// Backend reading from a slot filled elsewhere.
    pub fn with_slot(slot: ClipSlot) -> Self {
        Self { slot }
    }

    pub fn clip_state(&self) -> ClipState {
        self.slot.state()
    }
}

impl AudioBackend for ClipBackend {
    type Sink = ClipSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError> {
        let control = Arc::new(LoopControl::new());
        match self.clip_state() {
            ClipState::Unavailable => {
                return Ok(ClipSink {
                    stream: None,
                    control,
                });
            }
            ClipState::Loading => debug!("Audio clip still loading, starting silent"),
            ClipState::Ready(_) => {}
        }

        let stream = build_stream(self.slot.clone(), Arc::clone(&control))?;
        Ok(ClipSink {
            stream: Some(stream),
            control,
        })
    }
}

fn build_stream(slot: ClipSlot, control: Arc<LoopControl>) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Stream(format!("Failed to get default output config: {}", e)))?;

    let sample_rate = config.sample_rate().0;
    let channels = usize::from(config.channels());
    let format = config.sample_format();
    let source = LoopSource::new(slot, sample_rate);

    debug!(
        "Opening output: {} Hz, {} channels, {:?}",
        sample_rate, channels, format
    );

    let config: cpal::StreamConfig = config.into();
    match format {
        cpal::SampleFormat::F32 => {
            let mut source = source;
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        source.render(&control, data, channels);
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                )
                .map_err(|e| AudioError::Stream(format!("Failed to build audio stream: {}", e)))
        }
        cpal::SampleFormat::I16 => build_converted::<i16>(&device, &config, source, control, channels),
        cpal::SampleFormat::U16 => build_converted::<u16>(&device, &config, source, control, channels),
        other => Err(AudioError::Unsupported(format!("sample format {:?}", other))),
    }
}

/// Builds a stream for an integer device format, rendering through an f32
/// scratch buffer.
fn build_converted<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut source: LoopSource,
    control: Arc<LoopControl>,
    channels: usize,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = vec![0.0; 4096];
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                let buf = &mut scratch[..data.len()];
                source.render(&control, buf, channels);
                for (out, &sample) in data.iter_mut().zip(buf.iter()) {
                    *out = T::from_sample(sample);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Stream(format!("Failed to build audio stream: {}", e)))
}

/// A looping clip stream.
///
/// Dropping the sink drops the stream and releases the device.
pub struct ClipSink {
    /// The cpal stream (None when silent)
    stream: Option<cpal::Stream>,
    control: Arc<LoopControl>,
}

impl AudioSink for ClipSink {
    fn play(&mut self) -> Result<(), AudioError> {
        self.control.set_playing(true);
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| AudioError::Stream(format!("Failed to play audio stream: {}", e)))?;
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.control.set_playing(false);
        if let Some(stream) = &self.stream
            && let Err(e) = stream.pause()
        {
            // Silence from the callback still applies
            warn!("Failed to pause audio stream: {}", e);
        }
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        self.control.set_gain(gain);
    }
}
