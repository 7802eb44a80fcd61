use crate::blob::{AnimatedBlob, BlobConfig};
use crate::chord_function::classify;
use crate::chord_translator::ChordTranslator;
use crate::config::Config;
use crate::render::Renderer;
use crate::share;
use crate::simulation;
use crate::synth::SynthHandle;
use crate::types::{BlobId, FrameClock, Point};
use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Blobs are parked at the top until the user starts playback.
    AwaitingGesture,
    Playing,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    ReleaseGravity(usize),
    Complete,
}

/// Delayed actions against the session clock. Cancelable as a whole.
#[derive(Debug, Default)]
struct Timers {
    pending: Vec<(Duration, TimerAction)>,
}

impl Timers {
    fn schedule(&mut self, due: Duration, action: TimerAction) {
        self.pending.push((due, action));
    }

    /// Remove and return every action due at `now`, earliest first.
    fn take_due(&mut self, now: Duration) -> Vec<TimerAction> {
        let mut due: Vec<(Duration, TimerAction)> = Vec::new();
        self.pending.retain(|&(at, action)| {
            if at <= now {
                due.push((at, action));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(at, _)| at);
        due.into_iter().map(|(_, a)| a).collect()
    }

    fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Replays a finished progression: one blob per chord, dropped one after
/// another, each sounding its chord when it first hits the floor.
///
/// Nothing moves until `activate` (the user gesture that also starts the
/// synth). Blobs then get gravity at `i × drop_interval`; the last landing
/// schedules completion after `completion_delay`. Playback blobs don't
/// collide with each other.
pub struct PlaybackSession {
    chords: Vec<String>,
    blobs: Vec<AnimatedBlob>,
    config: Config,
    translator: ChordTranslator,
    synth: SynthHandle,
    landed_rx: Receiver<usize>,
    timers: Timers,
    clock: FrameClock,
    status: PlaybackStatus,
}

impl PlaybackSession {
    pub fn new(
        chords: Vec<String>,
        config: Config,
        synth: SynthHandle,
        renderer: &mut dyn Renderer,
        rng: &mut StdRng,
    ) -> Self {
        let (landed_tx, landed_rx) = unbounded();
        let (width, height) = renderer.canvas_size();
        let tuning = &config.playback;
        let start = Point::new(width / 2.0, tuning.start_y);

        let blobs: Vec<AnimatedBlob> = chords
            .iter()
            .enumerate()
            .map(|(i, chord)| {
                let tx = landed_tx.clone();
                let blob_config = BlobConfig::new(chord.clone(), start, tuning.blob_radius)
                    .id(BlobId(i as u64 + 1))
                    .color(config.color(i))
                    .canvas(width, height)
                    .speed_multiplier(config.animation.multiplier(classify(chord)))
                    .tuning(config.blob.clone())
                    .on_bottom_collision(move || {
                        if tx.send(i).is_err() {
                            debug!("playback gone, landing {} dropped", i);
                        }
                    });
                AnimatedBlob::new(blob_config, renderer, rng)
            })
            .collect();

        let status = if chords.is_empty() {
            warn!("Nothing to play back");
            PlaybackStatus::Complete
        } else {
            PlaybackStatus::AwaitingGesture
        };
        info!("Playback ready: {}", chords.join(" - "));

        Self {
            chords,
            blobs,
            config,
            translator: ChordTranslator::new(),
            synth,
            landed_rx,
            timers: Timers::default(),
            clock: FrameClock::new(),
            status,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == PlaybackStatus::Complete
    }

    pub fn chords(&self) -> &[String] {
        &self.chords
    }

    pub fn blobs(&self) -> &[AnimatedBlob] {
        &self.blobs
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// `chords=...` for sharing this progression.
    pub fn share_query(&self) -> String {
        share::encode_query(&self.chords)
    }

    /// User gesture: start the synth and schedule the staggered drops.
    /// Only the first call has an effect.
    pub fn activate(&mut self) {
        if self.status != PlaybackStatus::AwaitingGesture {
            return;
        }
        self.synth.activate();
        let now = self.clock.elapsed();
        let interval = self.config.playback.drop_interval();
        for i in 0..self.blobs.len() {
            self.timers.schedule(now + interval * i as u32, TimerAction::ReleaseGravity(i));
        }
        self.status = PlaybackStatus::Playing;
        info!("Playback started ({} chords)", self.chords.len());
    }

    /// Advance one frame. Timers due by the start of the frame fire first,
    /// then blobs move and landings sound.
    pub fn tick(&mut self, dt: Duration, renderer: &mut dyn Renderer) {
        self.fire_timers();
        self.clock.advance(dt);
        simulation::update_all(&mut self.blobs, renderer);
        while let Ok(i) = self.landed_rx.try_recv() {
            self.on_landed(i);
        }
    }

    /// Cancel pending timers and remove every blob.
    pub fn teardown(&mut self, renderer: &mut dyn Renderer) {
        let canceled = self.timers.cancel_all();
        for blob in &mut self.blobs {
            blob.remove(renderer);
        }
        self.blobs.clear();
        while self.landed_rx.try_recv().is_ok() {}
        debug!("playback torn down ({} timers canceled)", canceled);
    }

    fn fire_timers(&mut self) {
        for action in self.timers.take_due(self.clock.elapsed()) {
            match action {
                TimerAction::ReleaseGravity(i) => {
                    if let Some(blob) = self.blobs.get_mut(i) {
                        debug!("dropping {}", blob.label());
                        blob.set_gravity(self.config.playback.gravity);
                    }
                }
                TimerAction::Complete => {
                    info!("Playback complete");
                    self.status = PlaybackStatus::Complete;
                }
            }
        }
    }

    fn on_landed(&mut self, i: usize) {
        let Some(chord) = self.chords.get(i) else {
            return;
        };
        let notes = self.translator.pitches(chord);
        self.synth
            .play_chord(chord, notes, self.config.chord_duration(), self.clock.elapsed());
        if i + 1 == self.chords.len() {
            let due = self.clock.elapsed() + self.config.playback.completion_delay();
            self.timers.schedule(due, TimerAction::Complete);
        }
    }
}
