//! Synthesizer contract and the fire-and-forget command path to it.
//!
//! Sessions never call a synthesizer directly. They push `SynthCommand`s
//! through a `SynthHandle`; a `SynthWorker` on its own thread drains the
//! channel and drives the backend. Backend failures are logged there and
//! never reach the simulation.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Synth not activated")]
    NotActivated,
    #[error("Activation failed: {0}")]
    Activation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OSC encode error: {0}")]
    Osc(#[from] rosc::OscError),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// A sound backend.
///
/// `activate` must succeed once before the first `play_chord`. `at` is the
/// session time of the trigger, for backends that render offline.
pub trait Synthesizer: Send {
    fn activate(&mut self) -> Result<(), SynthError>;

    fn play_chord(&mut self, notes: &[String], duration: Duration, at: Duration) -> Result<(), SynthError>;

    /// Flush any buffered output. Called once when the command stream ends.
    fn finish(&mut self) -> Result<(), SynthError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthCommand {
    /// User gesture: start the audio context.
    Activate,
    PlayChord {
        chord: String,
        notes: Vec<String>,
        duration: Duration,
        at: Duration,
    },
}

/// Sending side of the synth channel. Cheap to clone; sends never block.
#[derive(Debug, Clone)]
pub struct SynthHandle {
    tx: Sender<SynthCommand>,
    /// Added to every trigger time, so consecutive sessions share a timeline.
    offset: Duration,
}

impl SynthHandle {
    pub fn new(tx: Sender<SynthCommand>) -> Self {
        Self {
            tx,
            offset: Duration::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    /// Unbounded handle/receiver pair.
    pub fn channel() -> (Self, Receiver<SynthCommand>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    pub fn activate(&self) {
        self.send(SynthCommand::Activate);
    }

    /// Queue a chord. An empty note list has nothing to sound and is dropped.
    pub fn play_chord(&self, chord: &str, notes: Vec<String>, duration: Duration, at: Duration) {
        if notes.is_empty() {
            debug!("skipping silent chord {:?}", chord);
            return;
        }
        self.send(SynthCommand::PlayChord {
            chord: chord.to_string(),
            notes,
            duration,
            at: at + self.offset,
        });
    }

    fn send(&self, cmd: SynthCommand) {
        if self.tx.send(cmd).is_err() {
            debug!("synth worker gone, command dropped");
        }
    }
}

// ─── Backends ───────────────────────────────────────────────────────────────

/// Logs chords instead of sounding them.
#[derive(Debug, Default)]
pub struct LogSynth;

impl Synthesizer for LogSynth {
    fn activate(&mut self) -> Result<(), SynthError> {
        Ok(())
    }

    fn play_chord(&mut self, notes: &[String], duration: Duration, at: Duration) -> Result<(), SynthError> {
        info!("♪ {} ({} ms) @ {:.2}s", notes.join(" "), duration.as_millis(), at.as_secs_f32());
        Ok(())
    }
}

/// Drives several backends from one command stream. A failing backend
/// is logged and skipped; the call fails only if every backend failed.
pub struct SynthFanout {
    backends: Vec<Box<dyn Synthesizer>>,
}

impl SynthFanout {
    pub fn new(backends: Vec<Box<dyn Synthesizer>>) -> Self {
        Self { backends }
    }

    fn each<F>(&mut self, what: &str, mut f: F) -> Result<(), SynthError>
    where
        F: FnMut(&mut dyn Synthesizer) -> Result<(), SynthError>,
    {
        let mut last_err = None;
        let mut ok = 0;
        for backend in &mut self.backends {
            match f(backend.as_mut()) {
                Ok(()) => ok += 1,
                Err(e) => {
                    warn!("synth backend {} failed: {}", what, e);
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if ok == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

impl Synthesizer for SynthFanout {
    fn activate(&mut self) -> Result<(), SynthError> {
        self.each("activate", |s| s.activate())
    }

    fn play_chord(&mut self, notes: &[String], duration: Duration, at: Duration) -> Result<(), SynthError> {
        self.each("play", |s| s.play_chord(notes, duration, at))
    }

    fn finish(&mut self) -> Result<(), SynthError> {
        self.each("finish", |s| s.finish())
    }
}

// ─── Worker ─────────────────────────────────────────────────────────────────

/// Drains synth commands into a backend. Activation is lazy: the first
/// `Activate` starts the backend, and chords that arrive before it are
/// dropped with a warning.
pub struct SynthWorker<S: Synthesizer> {
    rx: Receiver<SynthCommand>,
    synth: S,
    active: bool,
    played: usize,
}

impl<S: Synthesizer> SynthWorker<S> {
    pub fn new(rx: Receiver<SynthCommand>, synth: S) -> Self {
        Self {
            rx,
            synth,
            active: false,
            played: 0,
        }
    }

    /// Run until every `SynthHandle` is dropped. Blocks the calling thread.
    /// Returns the backend and the number of chords it played.
    pub fn run(mut self) -> (S, usize) {
        for cmd in self.rx.iter() {
            match cmd {
                SynthCommand::Activate => {
                    if self.active {
                        continue;
                    }
                    match self.synth.activate() {
                        Ok(()) => {
                            info!("Synth activated");
                            self.active = true;
                        }
                        Err(e) => error!("Synth activation failed: {}", e),
                    }
                }
                SynthCommand::PlayChord {
                    chord,
                    notes,
                    duration,
                    at,
                } => {
                    if !self.active {
                        warn!("Dropping {} before activation: {}", chord, SynthError::NotActivated);
                        continue;
                    }
                    match self.synth.play_chord(&notes, duration, at) {
                        Ok(()) => {
                            debug!("played {} {:?} at {:?}", chord, notes, at);
                            self.played += 1;
                        }
                        Err(e) => error!("Error playing chord {}: {}", chord, e),
                    }
                }
            }
        }
        if let Err(e) = self.synth.finish() {
            error!("Synth finish failed: {}", e);
        }
        info!("Synth worker shutting down ({} chords played)", self.played);
        (self.synth, self.played)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        activations: usize,
        chords: Vec<Vec<String>>,
        fail_activation: bool,
        finished: bool,
    }

    impl Synthesizer for Recorder {
        fn activate(&mut self) -> Result<(), SynthError> {
            self.activations += 1;
            if self.fail_activation {
                return Err(SynthError::Activation("blocked".into()));
            }
            Ok(())
        }

        fn play_chord(&mut self, notes: &[String], _duration: Duration, _at: Duration) -> Result<(), SynthError> {
            self.chords.push(notes.to_vec());
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SynthError> {
            self.finished = true;
            Ok(())
        }
    }

    fn notes(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_chord_is_not_sent() {
        let (handle, rx) = SynthHandle::channel();
        handle.play_chord("H7", Vec::new(), Duration::from_millis(250), Duration::ZERO);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_worker_gone_is_silent() {
        let (handle, rx) = SynthHandle::channel();
        drop(rx);
        handle.activate();
        handle.play_chord("I", notes(&["C4"]), Duration::from_millis(250), Duration::ZERO);
    }

    #[test]
    fn test_worker_plays_after_activation() {
        let (handle, rx) = SynthHandle::channel();
        handle.play_chord("I", notes(&["C4", "E4", "G4"]), Duration::from_millis(250), Duration::ZERO);
        handle.activate();
        handle.activate();
        handle.play_chord("V7", notes(&["G4", "B4", "D5", "F5"]), Duration::from_millis(250), Duration::ZERO);
        drop(handle);

        let (synth, played) = SynthWorker::new(rx, Recorder::default()).run();
        assert_eq!(played, 1);
        assert_eq!(synth.activations, 1);
        assert_eq!(synth.chords, vec![notes(&["G4", "B4", "D5", "F5"])]);
        assert!(synth.finished);
    }

    #[test]
    fn test_offset_shifts_trigger_time() {
        let (handle, rx) = SynthHandle::channel();
        let late = handle.with_offset(Duration::from_secs(3));
        late.play_chord("I", notes(&["C4"]), Duration::from_millis(250), Duration::from_millis(500));
        match rx.try_recv() {
            Ok(SynthCommand::PlayChord { at, .. }) => assert_eq!(at, Duration::from_millis(3500)),
            other => panic!("expected chord, got {:?}", other),
        }
    }

    #[test]
    fn test_fanout_survives_one_failing_backend() {
        let failing = Recorder {
            fail_activation: true,
            ..Default::default()
        };
        let mut fan = SynthFanout::new(vec![Box::new(failing), Box::new(Recorder::default())]);
        assert!(fan.activate().is_ok());
        assert!(fan.play_chord(&notes(&["C4"]), Duration::from_millis(250), Duration::ZERO).is_ok());

        let mut all_bad = SynthFanout::new(vec![Box::new(Recorder {
            fail_activation: true,
            ..Default::default()
        })]);
        assert!(matches!(all_bad.activate(), Err(SynthError::Activation(_))));
    }

    #[test]
    fn test_failed_activation_drops_chords() {
        let (handle, rx) = SynthHandle::channel();
        handle.activate();
        handle.play_chord("I", notes(&["C4"]), Duration::from_millis(250), Duration::ZERO);
        drop(handle);

        let recorder = Recorder {
            fail_activation: true,
            ..Default::default()
        };
        let (synth, played) = SynthWorker::new(rx, recorder).run();
        assert_eq!(played, 0);
        assert!(synth.chords.is_empty());
    }
}
