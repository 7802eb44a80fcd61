use crate::chord_translator::{midi_to_hz, note_name_to_midi};
use crate::synth::{SynthError, Synthesizer};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{info, warn};
use std::f32::consts::TAU;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 44_100;

/// Per-voice gain. Five-note chords stay below full scale.
const VOICE_GAIN: f32 = 0.15;

/// Amplitude envelope shared by every voice. Times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.02,
            decay: 0.3,
            sustain: 0.3,
            release: 1.0,
        }
    }
}

impl Envelope {
    /// Level `t` seconds after note-on for a note held `held` seconds.
    pub fn level(&self, t: f32, held: f32) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        if t < held {
            return self.held_level(t);
        }
        if self.release <= 0.0 {
            return 0.0;
        }
        let from = self.held_level(held);
        (from * (1.0 - (t - held) / self.release)).max(0.0)
    }

    fn held_level(&self, t: f32) -> f32 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            1.0 - (1.0 - self.sustain) * (t - self.attack) / self.decay
        } else {
            self.sustain
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Voice {
    hz: f32,
    start: f32,
    held: f32,
}

/// Offline synthesizer: collects chords against session time and renders
/// them as sine voices into a 16-bit mono WAV when the stream ends.
pub struct WavSynth {
    path: PathBuf,
    envelope: Envelope,
    writer: Option<WavWriter<BufWriter<File>>>,
    voices: Vec<Voice>,
}

impl WavSynth {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            envelope: Envelope::default(),
            writer: None,
            voices: Vec::new(),
        }
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    /// Mix all collected voices. Length runs to the end of the last release.
    pub fn render(&self) -> Vec<f32> {
        let end = self
            .voices
            .iter()
            .map(|v| v.start + v.held + self.envelope.release)
            .fold(0.0f32, f32::max);
        let len = (end * SAMPLE_RATE as f32).ceil() as usize;
        let mut out = vec![0.0f32; len];
        let rate = SAMPLE_RATE as f32;
        for v in &self.voices {
            let first = (v.start * rate) as usize;
            let last = (((v.start + v.held + self.envelope.release) * rate).ceil() as usize).min(len);
            for (i, sample) in out.iter_mut().enumerate().take(last).skip(first) {
                let t = i as f32 / rate - v.start;
                *sample += (TAU * v.hz * t).sin() * self.envelope.level(t, v.held) * VOICE_GAIN;
            }
        }
        out
    }
}

impl Synthesizer for WavSynth {
    fn activate(&mut self) -> Result<(), SynthError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        self.writer = Some(WavWriter::create(&self.path, spec)?);
        info!("WAV synth → {:?}", self.path);
        Ok(())
    }

    fn play_chord(&mut self, notes: &[String], duration: Duration, at: Duration) -> Result<(), SynthError> {
        if self.writer.is_none() {
            return Err(SynthError::NotActivated);
        }
        for name in notes {
            match note_name_to_midi(name) {
                Some(midi) => self.voices.push(Voice {
                    hz: midi_to_hz(midi as f64) as f32,
                    start: at.as_secs_f32(),
                    held: duration.as_secs_f32(),
                }),
                None => warn!("Skipping unreadable pitch {:?}", name),
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SynthError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        let samples = self.render();
        for s in &samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
        info!(
            "WAV written: {:?} ({} voices, {:.2}s)",
            self.path,
            self.voices.len(),
            samples.len() as f32 / SAMPLE_RATE as f32
        );
        Ok(())
    }
}
