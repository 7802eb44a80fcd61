use crate::blob::{AnimatedBlob, BlobConfig, EventSlot};
use crate::chord_function::classify;
use crate::chord_translator::ChordTranslator;
use crate::config::Config;
use crate::positioner::BlobPositioner;
use crate::progression::{NextStep, ProgressionEngine, ProgressionLog, ResolutionPolicy};
use crate::render::Renderer;
use crate::simulation;
use crate::synth::SynthHandle;
use crate::types::{BlobId, ChordOption, FrameClock, Point};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use std::time::Duration;

/// Raised by blob callbacks, handled by the session between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Tapped(BlobId),
    ExpandComplete { id: BlobId, chord: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Playing,
    /// Ended on a tonic; ready for playback.
    Complete,
}

/// One interactive run: offer blobs for the next chords, react to taps,
/// and stop once the progression resolves.
///
/// Blob callbacks only push `SessionEvent`s onto the session's channel.
/// The session drains it after every tap and every frame, so all state
/// changes happen on the driver's thread, in order:
///
///   tap → sound chord → expand → (expansion done) → transition → log →
///   resolution policy → next batch or complete
///
/// The tapped blob keeps animating through its fade while the next batch
/// is already on screen.
pub struct PlaySession {
    engine: ProgressionEngine,
    log: ProgressionLog,
    policy: ResolutionPolicy,
    translator: ChordTranslator,
    synth: SynthHandle,
    config: Config,
    blobs: Vec<AnimatedBlob>,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
    rng: StdRng,
    next_id: u64,
    clock: FrameClock,
    status: SessionStatus,
}

impl PlaySession {
    /// Record the starting chord and put the first batch on screen.
    pub fn new(
        engine: ProgressionEngine,
        config: Config,
        synth: SynthHandle,
        renderer: &mut dyn Renderer,
        rng: StdRng,
    ) -> Self {
        let (event_tx, event_rx) = unbounded();
        let mut session = Self {
            engine,
            log: ProgressionLog::new(),
            policy: ResolutionPolicy::new(config.progression.max_chord_count),
            translator: ChordTranslator::new(),
            synth,
            config,
            blobs: Vec::new(),
            event_tx,
            event_rx,
            rng,
            next_id: 1,
            clock: FrameClock::new(),
            status: SessionStatus::Playing,
        };
        session.begin(renderer);
        session
    }

    /// Start over on a fresh random tonic. Clears the log and the screen.
    pub fn restart(&mut self, renderer: &mut dyn Renderer) {
        self.teardown(renderer);
        self.engine.restart(&mut self.rng);
        self.begin(renderer);
    }

    fn begin(&mut self, renderer: &mut dyn Renderer) {
        self.log.reset();
        let start = self.engine.current_chord().to_string();
        self.log.append(&start);
        self.status = SessionStatus::Playing;
        info!("Play session starts on {}", start);
        let step = self.policy.next_step(&self.engine, &start, 0);
        self.apply(step, None, renderer);
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Complete
    }

    pub fn log(&self) -> &ProgressionLog {
        &self.log
    }

    pub fn chords(&self) -> &[String] {
        self.log.chords()
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn blobs(&self) -> &[AnimatedBlob] {
        &self.blobs
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Chords currently offered (blobs that still accept taps).
    pub fn offered(&self) -> Vec<&str> {
        self.blobs
            .iter()
            .filter(|b| b.is_hoverable())
            .map(|b| b.label())
            .collect()
    }

    /// Whether a pointer at `p` is over a tappable blob.
    pub fn hover(&self, p: Point) -> bool {
        simulation::hit_test(&self.blobs, p).is_some()
    }

    /// Tap at a canvas point. Returns true if a blob took the tap.
    pub fn tap_at(&mut self, p: Point, renderer: &mut dyn Renderer) -> bool {
        let Some(i) = simulation::hit_test(&self.blobs, p) else {
            return false;
        };
        let taken = self.blobs[i].tap();
        self.drain_events(renderer);
        taken
    }

    /// Tap the first offered blob labelled `chord`.
    pub fn tap_chord(&mut self, chord: &str, renderer: &mut dyn Renderer) -> bool {
        let Some(blob) = self
            .blobs
            .iter_mut()
            .find(|b| b.is_hoverable() && b.label() == chord)
        else {
            return false;
        };
        let taken = blob.tap();
        self.drain_events(renderer);
        taken
    }

    /// Advance one frame: animate, collide, then handle callbacks raised
    /// during the frame.
    pub fn tick(&mut self, dt: Duration, renderer: &mut dyn Renderer) {
        self.clock.advance(dt);
        simulation::step(&mut self.blobs, renderer);
        self.drain_events(renderer);
        simulation::prune_removed(&mut self.blobs);
    }

    /// Remove every blob. Pending callbacks are dropped with them.
    pub fn teardown(&mut self, renderer: &mut dyn Renderer) {
        for blob in &mut self.blobs {
            blob.remove(renderer);
        }
        self.blobs.clear();
        while self.event_rx.try_recv().is_ok() {}
    }

    // ─── Event handling ─────────────────────────────────────────────────

    fn drain_events(&mut self, renderer: &mut dyn Renderer) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                SessionEvent::Tapped(id) => self.on_tapped(id, renderer),
                SessionEvent::ExpandComplete { id, chord } => self.on_expand_complete(id, &chord, renderer),
            }
        }
    }

    fn on_tapped(&mut self, id: BlobId, renderer: &mut dyn Renderer) {
        if self.is_complete() {
            return;
        }
        let Some(blob) = self.blobs.iter_mut().find(|b| b.id() == id) else {
            trace!("tap for vanished {}", id);
            return;
        };
        let chord = blob.label().to_string();
        debug!("tapped {} ({})", chord, id);

        let notes = self.translator.pitches(&chord);
        self.synth
            .play_chord(&chord, notes, self.config.chord_duration(), self.clock.elapsed());

        let tx = self.event_tx.clone();
        let done_chord = chord.clone();
        blob.start_expanding(
            EventSlot::new(move || {
                if tx.send(SessionEvent::ExpandComplete { id, chord: done_chord }).is_err() {
                    debug!("session gone, expansion of {} dropped", id);
                }
            }),
            renderer,
        );
    }

    fn on_expand_complete(&mut self, id: BlobId, chord: &str, renderer: &mut dyn Renderer) {
        if self.is_complete() {
            return;
        }
        self.engine.transition_to(chord);
        let steps = self.log.record_step(chord);
        debug!("step {}: {}", steps, chord);
        let step = self.policy.next_step(&self.engine, chord, steps);
        self.apply(step, Some(id), renderer);
    }

    fn apply(&mut self, step: NextStep, keep: Option<BlobId>, renderer: &mut dyn Renderer) {
        match step {
            NextStep::Complete => {
                info!("Progression complete: {}", self.log.chords().join(" - "));
                self.status = SessionStatus::Complete;
            }
            NextStep::Options(options) => self.create_batch(&options, keep, renderer),
        }
    }

    /// Replace the offered blobs with one per option. `keep` (the blob
    /// currently expanding) survives and stays on top.
    fn create_batch(&mut self, options: &[ChordOption], keep: Option<BlobId>, renderer: &mut dyn Renderer) {
        let mut kept = None;
        for mut blob in self.blobs.drain(..) {
            if Some(blob.id()) == keep {
                kept = Some(blob);
            } else {
                blob.remove(renderer);
            }
        }

        let (width, height) = renderer.canvas_size();
        let tuning = &self.config.blob;
        let mut positioner = BlobPositioner::new(width, height, tuning.margin());

        for (i, option) in options.iter().enumerate() {
            let radius = tuning.radius_for_weight(option.weight);
            let center = positioner.find_non_overlapping(
                radius,
                tuning.spacing,
                tuning.max_placement_attempts,
                &mut self.rng,
            );
            positioner.add_position(center.x, center.y, radius);

            let id = BlobId(self.next_id);
            self.next_id += 1;
            let tx = self.event_tx.clone();
            let config = BlobConfig::new(option.chord.clone(), center, radius)
                .id(id)
                .color(self.config.color(i))
                .canvas(width, height)
                .speed_multiplier(self.config.animation.multiplier(classify(&option.chord)))
                .tuning(tuning.clone())
                .on_tap(move || {
                    if tx.send(SessionEvent::Tapped(id)).is_err() {
                        debug!("session gone, tap on {} dropped", id);
                    }
                });
            self.blobs.push(AnimatedBlob::new(config, renderer, &mut self.rng));
        }

        if let Some(blob) = kept {
            self.blobs.push(blob);
        }
        debug!(
            "batch from {}: [{}]",
            self.engine.current_chord(),
            options.iter().map(|o| o.chord.as_str()).collect::<Vec<_>>().join(", ")
        );
    }
}
