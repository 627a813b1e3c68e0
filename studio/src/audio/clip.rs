//! Looping clip loading and sample cursor
//!
//! The clip is decoded once into interleaved f32 samples. [`LoopCursor`]
//! walks it forever, resampling to the device rate and mapping the clip's
//! channels onto the device's.

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use cadenza_core::AudioError;

/// Timeout for downloading a remote clip
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Decoded audio clip (interleaved f32, -1.0 to 1.0)
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Clip {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / usize::from(self.channels)
        }
    }

    /// Length of the clip in seconds.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Sample at `frame` for output channel `channel`.
    ///
    /// Mono clips feed every output channel; otherwise extra output channels
    /// wrap around the clip's channels.
    fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = usize::from(self.channels);
        let source = if channels == 1 { 0 } else { channel % channels };
        self.samples[frame * channels + source]
    }
}

/// Decodes a WAV stream (PCM int 8/16/24/32-bit or float).
pub fn decode_wav<R: Read>(reader: R) -> Result<Clip, AudioError> {
    let mut reader =
        hound::WavReader::new(reader).map_err(|e| AudioError::Decode(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = match spec.bits_per_sample {
                8 | 16 | 24 | 32 => (1i64 << (spec.bits_per_sample - 1)) as f32,
                other => {
                    return Err(AudioError::Unsupported(format!(
                        "{} bits per sample",
                        other
                    )));
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::Decode(e.to_string()))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
    };

    if spec.channels == 0 || samples.is_empty() {
        return Err(AudioError::Decode("clip contains no samples".to_string()));
    }

    Ok(Clip {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads a clip from a local path or an http(s) URL.
pub async fn load_clip(source: &str) -> Result<Clip, AudioError> {
    if !is_remote(source) {
        let file = std::fs::File::open(Path::new(source))?;
        return decode_wav(std::io::BufReader::new(file));
    }

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| AudioError::Fetch(e.to_string()))?;

    let response = match tokio::time::timeout(FETCH_TIMEOUT, client.get(source).send()).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => return Err(AudioError::Fetch(e.to_string())),
        Err(_) => return Err(AudioError::Fetch("request timed out".to_string())),
    };

    if !response.status().is_success() {
        return Err(AudioError::Fetch(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AudioError::Fetch(e.to_string()))?;
    decode_wav(Cursor::new(bytes))
}

/// Loads a clip from the calling (non-async) thread.
pub fn load_clip_blocking(source: &str) -> Result<Clip, AudioError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(load_clip(source))
}

/// Playhead over a looping clip.
#[derive(Debug, Clone)]
pub struct LoopCursor {
    /// Fractional frame position in the clip
    position: f64,
    /// Clip frames advanced per output frame
    step: f64,
}

impl LoopCursor {
    pub fn new(clip_rate: u32, output_rate: u32) -> Self {
        let step = if output_rate == 0 {
            1.0
        } else {
            f64::from(clip_rate) / f64::from(output_rate)
        };
        Self {
            position: 0.0,
            step,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Fills interleaved `out` (with `out_channels` channels) from `clip`,
    /// scaled by `gain`, wrapping at the clip's end.
    pub fn fill(&mut self, clip: &Clip, out: &mut [f32], out_channels: usize, gain: f32) {
        let frames = clip.frames();
        if frames == 0 || out_channels == 0 {
            out.fill(0.0);
            return;
        }

        for frame in out.chunks_mut(out_channels) {
            let index = self.position as usize;
            let next = (index + 1) % frames;
            let frac = (self.position - index as f64) as f32;

            for (channel, sample) in frame.iter_mut().enumerate() {
                let a = clip.sample(index, channel);
                let b = clip.sample(next, channel);
                *sample = (a + (b - a) * frac) * gain;
            }

            self.position += self.step;
            if self.position >= frames as f64 {
                self.position %= frames as f64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn pcm16(channels: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn clip(samples: &[f32], channels: u16, sample_rate: u32) -> Clip {
        Clip {
            samples: samples.to_vec(),
            channels,
            sample_rate,
        }
    }

    // =============================================================
    // Decoding
    // =============================================================

    #[test]
    fn test_decode_pcm16_stereo() {
        let bytes = wav_bytes(pcm16(2), &[16384, -16384, 0, i16::MIN]);
        let clip = decode_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.sample_rate, 22_050);
        assert_eq!(clip.frames(), 2);
        assert_eq!(clip.samples, vec![0.5, -0.5, 0.0, -1.0]);
    }

    #[test]
    fn test_decode_float() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            writer.write_sample(0.25f32).unwrap();
            writer.write_sample(-0.75f32).unwrap();
            writer.finalize().unwrap();
        }
        let clip = decode_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(clip.samples, vec![0.25, -0.75]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_wav(Cursor::new(b"not a wav file".to_vec())),
            Err(AudioError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_clip() {
        let bytes = wav_bytes(pcm16(1), &[]);
        assert!(decode_wav(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_load_clip_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), wav_bytes(pcm16(1), &[0, 8192])).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let clip = load_clip_blocking(&path).unwrap();
        assert_eq!(clip.samples, vec![0.0, 0.25]);
    }

    #[test]
    fn test_load_clip_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.wav");
        assert!(matches!(
            load_clip_blocking(path.to_str().unwrap()),
            Err(AudioError::Io(_))
        ));
    }

    #[test]
    fn test_clip_duration() {
        let clip = clip(&[0.0; 44_100], 2, 22_050);
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    // =============================================================
    // Loop cursor
    // =============================================================

    #[test]
    fn test_cursor_wraps_at_end() {
        let clip = clip(&[0.1, 0.2, 0.3], 1, 44_100);
        let mut cursor = LoopCursor::new(44_100, 44_100);
        let mut out = [0.0; 7];
        cursor.fill(&clip, &mut out, 1, 1.0);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
        assert_eq!(cursor.position(), 1.0);
    }

    #[test]
    fn test_cursor_mono_to_stereo() {
        let clip = clip(&[0.5, -0.5], 1, 48_000);
        let mut cursor = LoopCursor::new(48_000, 48_000);
        let mut out = [0.0; 4];
        cursor.fill(&clip, &mut out, 2, 1.0);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_cursor_stereo_to_mono_takes_left() {
        let clip = clip(&[0.5, -0.5, 0.25, -0.25], 2, 48_000);
        let mut cursor = LoopCursor::new(48_000, 48_000);
        let mut out = [0.0; 2];
        cursor.fill(&clip, &mut out, 1, 1.0);
        assert_eq!(out, [0.5, 0.25]);
    }

    #[test]
    fn test_cursor_applies_gain() {
        let clip = clip(&[1.0, -1.0], 1, 44_100);
        let mut cursor = LoopCursor::new(44_100, 44_100);
        let mut out = [0.0; 2];
        cursor.fill(&clip, &mut out, 1, 0.5);
        assert_eq!(out, [0.5, -0.5]);
    }

    #[test]
    fn test_cursor_upsamples_with_interpolation() {
        let clip = clip(&[0.0, 1.0], 1, 22_050);
        let mut cursor = LoopCursor::new(22_050, 44_100);
        let mut out = [0.0; 4];
        cursor.fill(&clip, &mut out, 1, 1.0);
        assert_eq!(out, [0.0, 0.5, 1.0, 0.5]);
    }
}
