//! Sound playback: a shared device handle, decoded sample buffers, and
//! playable sounds over a software mixer.
//!
//! Orthogonal to rendering; the only shared idea is the handle model —
//! [`Audio`] and [`SoundBuffer`] are refcounted value types whose backing
//! resource is released when the last clone drops.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::Error;

/// Handle to the audio output device and its mixer.
///
/// Clones share the device; the output stream is closed when the last
/// clone drops. Mixing happens on the audio thread, so the handle itself
/// is the one crate type that crosses threads internally.
pub struct Audio(Arc<AudioInner>);

impl Clone for Audio {
    fn clone(&self) -> Self {
        Audio(Arc::clone(&self.0))
    }
}

impl fmt::Debug for Audio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Audio").finish()
    }
}

struct AudioInner {
    #[allow(dead_code)]
    stream: cpal::Stream,
    mixer: Arc<Mutex<Mixer>>,
}

// cpal::Stream is not Sync on every platform, but the handle is only used
// behind the mixer mutex and the stream itself is never touched after
// construction.
unsafe impl Send for AudioInner {}
unsafe impl Sync for AudioInner {}

impl Audio {
    /// Open the default output device and start the mixer stream.
    pub fn new() -> Result<Audio, Error> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioDevice("no output device available".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::AudioDevice(e.to_string()))?;
        let sample_rate = config.sample_rate();
        let channels = config.channels();
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::AudioDevice(format!(
                "unsupported sample format {:?}",
                config.sample_format()
            )));
        }

        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate, channels)));
        let mixer_for_stream = Arc::clone(&mixer);
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut mixer) = mixer_for_stream.lock() {
                        mixer.process(data);
                    }
                },
                |e| tracing::error!(error = %e, "audio stream error"),
                None,
            )
            .map_err(|e| Error::AudioDevice(e.to_string()))?;
        stream
            .play()
            .map_err(|e| Error::AudioDevice(e.to_string()))?;

        Ok(Audio(Arc::new(AudioInner { stream, mixer })))
    }

    fn with_mixer<R>(&self, f: impl FnOnce(&mut Mixer) -> R) -> Option<R> {
        self.0.mixer.lock().ok().map(|mut mixer| f(&mut mixer))
    }
}

/// Decoded audio data: mono `f32` samples behind an `Arc`.
///
/// Clones share the sample memory. Any container/codec supported by
/// symphonia decodes (WAV, OGG/Vorbis, MP3, FLAC, ...).
#[derive(Clone)]
pub struct SoundBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl fmt::Debug for SoundBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundBuffer")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl SoundBuffer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<SoundBuffer, Error> {
        let bytes = std::fs::read(path)?;
        SoundBuffer::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<SoundBuffer, Error> {
        decode(bytes)
    }

    /// Wrap raw mono samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> SoundBuffer {
        SoundBuffer {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// One playable instance of a [`SoundBuffer`].
///
/// Dropping a playing sound lets it finish on its own; stop it explicitly
/// to silence it.
pub struct Sound {
    audio: Audio,
    buffer: SoundBuffer,
    voice: Option<u64>,
    looping: bool,
    gain: f32,
}

impl Sound {
    pub fn new(audio: &Audio, buffer: SoundBuffer) -> Sound {
        Sound {
            audio: audio.clone(),
            buffer,
            voice: None,
            looping: false,
            gain: 1.0,
        }
    }

    /// Start playback from the beginning, replacing any previous playback
    /// of this sound.
    pub fn play(&mut self) {
        self.stop();
        self.voice = self
            .audio
            .with_mixer(|mixer| mixer.play(&self.buffer, self.gain, self.looping));
    }

    pub fn stop(&mut self) {
        if let Some(voice) = self.voice.take() {
            self.audio.with_mixer(|mixer| mixer.stop(voice));
        }
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
        if let Some(voice) = self.voice {
            self.audio
                .with_mixer(|mixer| mixer.set_looping(voice, looping));
        }
    }

    /// Linear gain; `1.0` is unattenuated.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
        if let Some(voice) = self.voice {
            self.audio.with_mixer(|mixer| mixer.set_gain(voice, self.gain));
        }
    }

    pub fn is_playing(&self) -> bool {
        match self.voice {
            Some(voice) => self
                .audio
                .with_mixer(|mixer| mixer.is_playing(voice))
                .unwrap_or(false),
            None => false,
        }
    }
}

struct Voice {
    id: u64,
    samples: Arc<Vec<f32>>,
    source_rate: u32,
    position: f64,
    gain: f32,
    looping: bool,
    finished: bool,
}

impl Voice {
    fn next_sample(&mut self, output_rate: u32) -> f32 {
        if self.finished || output_rate == 0 || self.source_rate == 0 {
            return 0.0;
        }
        let sample = self.interpolated_sample();

        self.position += self.source_rate as f64 / output_rate as f64;
        let length = self.samples.len() as f64;
        if self.position >= length {
            if self.looping && length > 0.0 {
                self.position %= length;
            } else {
                self.finished = true;
            }
        }
        sample * self.gain
    }

    fn interpolated_sample(&self) -> f32 {
        let length = self.samples.len();
        if length == 0 {
            return 0.0;
        }
        let index = self.position.floor() as usize;
        if index >= length {
            return 0.0;
        }
        let fraction = (self.position - index as f64) as f32;
        let current = self.samples[index];
        let next = if index + 1 < length {
            self.samples[index + 1]
        } else if self.looping {
            self.samples[0]
        } else {
            0.0
        };
        current + (next - current) * fraction
    }
}

/// The software mixer driven by the cpal output callback. Standalone so it
/// can be exercised without a device.
struct Mixer {
    sample_rate: u32,
    channels: u16,
    next_voice_id: u64,
    voices: Vec<Voice>,
}

impl Mixer {
    fn new(sample_rate: u32, channels: u16) -> Mixer {
        Mixer {
            sample_rate,
            channels,
            next_voice_id: 1,
            voices: Vec::new(),
        }
    }

    fn process(&mut self, output: &mut [f32]) {
        let channels = self.channels.max(1) as usize;
        let frames = output.len() / channels;
        for frame in 0..frames {
            let mut mixed = 0.0f32;
            for voice in &mut self.voices {
                mixed += voice.next_sample(self.sample_rate);
            }
            let mixed = mixed.clamp(-1.0, 1.0);
            let base = frame * channels;
            for channel in 0..channels {
                output[base + channel] = mixed;
            }
        }
        self.voices.retain(|voice| !voice.finished);
    }

    fn play(&mut self, buffer: &SoundBuffer, gain: f32, looping: bool) -> u64 {
        let id = self.next_voice_id;
        self.next_voice_id = self.next_voice_id.wrapping_add(1).max(1);
        self.voices.push(Voice {
            id,
            samples: Arc::clone(&buffer.samples),
            source_rate: buffer.sample_rate,
            position: 0.0,
            gain,
            looping,
            finished: false,
        });
        id
    }

    fn stop(&mut self, id: u64) {
        if let Some(voice) = self.voice_mut(id) {
            voice.finished = true;
        }
    }

    fn set_gain(&mut self, id: u64, gain: f32) {
        if let Some(voice) = self.voice_mut(id) {
            voice.gain = gain;
        }
    }

    fn set_looping(&mut self, id: u64, looping: bool) {
        if let Some(voice) = self.voice_mut(id) {
            voice.looping = looping;
        }
    }

    fn is_playing(&self, id: u64) -> bool {
        self.voices
            .iter()
            .any(|voice| voice.id == id && !voice.finished)
    }

    fn voice_mut(&mut self, id: u64) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|voice| voice.id == id)
    }
}

fn decode(bytes: Vec<u8>) -> Result<SoundBuffer, Error> {
    let source = std::io::Cursor::new(bytes);
    let stream = MediaSourceStream::new(Box::new(source), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::AudioDecode(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::AudioDecode("no supported audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::AudioDecode(e.to_string()))?;

    let mut sample_rate = 0;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(Error::AudioDecode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(Error::AudioDecode(e.to_string())),
        };
        if sample_rate == 0 {
            sample_rate = decoded.spec().rate;
        }
        mix_down(&decoded, &mut samples);
    }

    Ok(SoundBuffer {
        samples: Arc::new(samples),
        sample_rate,
    })
}

/// Average every frame's channels into one mono sample.
fn mix_down(decoded: &AudioBufferRef<'_>, samples: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buffer) => {
            let channel_count = buffer.spec().channels.count();
            for i in 0..buffer.frames() {
                let mut sum = 0.0f32;
                for channel in 0..channel_count {
                    sum += buffer.chan(channel)[i];
                }
                samples.push(sum / channel_count as f32);
            }
        }
        AudioBufferRef::U8(buffer) => {
            let channel_count = buffer.spec().channels.count();
            for i in 0..buffer.frames() {
                let mut sum = 0.0f32;
                for channel in 0..channel_count {
                    sum += (buffer.chan(channel)[i] as f32 - 128.0) / 128.0;
                }
                samples.push(sum / channel_count as f32);
            }
        }
        AudioBufferRef::S16(buffer) => {
            let channel_count = buffer.spec().channels.count();
            for i in 0..buffer.frames() {
                let mut sum = 0.0f32;
                for channel in 0..channel_count {
                    sum += buffer.chan(channel)[i] as f32 / 32768.0;
                }
                samples.push(sum / channel_count as f32);
            }
        }
        AudioBufferRef::S32(buffer) => {
            let channel_count = buffer.spec().channels.count();
            for i in 0..buffer.frames() {
                let mut sum = 0.0f32;
                for channel in 0..channel_count {
                    sum += buffer.chan(channel)[i] as f32 / 2147483648.0;
                }
                samples.push(sum / channel_count as f32);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_plays_to_the_end_and_finishes() {
        let buffer = SoundBuffer::from_samples(vec![1.0, 1.0, 1.0, 1.0], 4);
        let mut mixer = Mixer::new(4, 1);
        let id = mixer.play(&buffer, 1.0, false);
        assert!(mixer.is_playing(id));

        let mut output = [0.0f32; 4];
        mixer.process(&mut output);
        assert_eq!(output, [1.0, 1.0, 1.0, 1.0]);

        // Exhausted voices are removed after the block.
        assert!(!mixer.is_playing(id));
        let mut silence = [0.5f32; 4];
        mixer.process(&mut silence);
        assert_eq!(silence, [0.0; 4]);
    }

    #[test]
    fn looping_voice_wraps_instead_of_finishing() {
        let buffer = SoundBuffer::from_samples(vec![0.25, 0.5], 4);
        let mut mixer = Mixer::new(4, 1);
        let id = mixer.play(&buffer, 1.0, true);

        let mut output = [0.0f32; 8];
        mixer.process(&mut output);
        assert!(mixer.is_playing(id));
        assert_eq!(output, [0.25, 0.5, 0.25, 0.5, 0.25, 0.5, 0.25, 0.5]);
    }

    #[test]
    fn gain_scales_and_mix_is_clamped() {
        let buffer = SoundBuffer::from_samples(vec![1.0, 1.0], 4);
        let mut mixer = Mixer::new(4, 1);
        mixer.play(&buffer, 0.5, false);

        let mut output = [0.0f32; 2];
        mixer.process(&mut output);
        assert_eq!(output, [0.5, 0.5]);

        // Two full-scale voices clamp at 1.0.
        mixer.play(&buffer, 1.0, false);
        mixer.play(&buffer, 1.0, false);
        let mut loud = [0.0f32; 2];
        mixer.process(&mut loud);
        assert_eq!(loud, [1.0, 1.0]);
    }

    #[test]
    fn resampling_interpolates_between_source_samples() {
        // Source at half the output rate: every other output sample falls
        // between two source samples.
        let buffer = SoundBuffer::from_samples(vec![0.0, 1.0], 2);
        let mut mixer = Mixer::new(4, 1);
        mixer.play(&buffer, 1.0, false);

        let mut output = [0.0f32; 4];
        mixer.process(&mut output);
        assert_eq!(output[0], 0.0);
        assert!((output[1] - 0.5).abs() < 1e-6);
        assert_eq!(output[2], 1.0);
    }

    #[test]
    fn stopping_a_voice_silences_it() {
        let buffer = SoundBuffer::from_samples(vec![1.0; 8], 4);
        let mut mixer = Mixer::new(4, 2);
        let id = mixer.play(&buffer, 1.0, true);
        mixer.stop(id);

        let mut output = [0.5f32; 4];
        mixer.process(&mut output);
        assert_eq!(output, [0.0; 4]);
        assert!(!mixer.is_playing(id));
    }

    #[test]
    fn buffer_duration_follows_the_sample_rate() {
        let buffer = SoundBuffer::from_samples(vec![0.0; 44100], 44100);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
        assert_eq!(SoundBuffer::from_samples(vec![], 0).duration(), Duration::ZERO);
    }

    #[test]
    fn stereo_output_duplicates_the_mono_mix() {
        let buffer = SoundBuffer::from_samples(vec![0.25, 0.75], 4);
        let mut mixer = Mixer::new(4, 2);
        mixer.play(&buffer, 1.0, false);

        let mut output = [0.0f32; 4];
        mixer.process(&mut output);
        assert_eq!(output, [0.25, 0.25, 0.75, 0.75]);
    }
}
