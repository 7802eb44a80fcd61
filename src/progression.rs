use crate::chord_function::{extract_degree, is_tonic};
use crate::graph::ChordGraph;
use crate::types::ChordOption;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

/// Walks a `ChordGraph`: holds the current chord and answers "where can we
/// go from here". Choosing is the caller's job (user taps), so weights are
/// passed through untouched.
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    graph: ChordGraph,
    current: String,
    tonic_fallback_weight: f32,
}

impl ProgressionEngine {
    /// Start on a tonic (degree I) chord chosen uniformly at random.
    pub fn new<R: Rng + ?Sized>(graph: ChordGraph, rng: &mut R) -> Self {
        let current = random_tonic_start(&graph, rng);
        debug!("Progression starts on {}", current);
        Self {
            graph,
            current,
            tonic_fallback_weight: 0.5,
        }
    }

    /// Start on a given chord.
    pub fn with_start(graph: ChordGraph, start: impl Into<String>) -> Self {
        Self {
            graph,
            current: start.into(),
            tonic_fallback_weight: 0.5,
        }
    }

    pub fn with_tonic_fallback_weight(mut self, weight: f32) -> Self {
        self.tonic_fallback_weight = weight;
        self
    }

    pub fn graph(&self) -> &ChordGraph {
        &self.graph
    }

    pub fn current_chord(&self) -> &str {
        &self.current
    }

    /// Targets of every edge leaving the current chord, in declaration order.
    pub fn next_options(&self) -> Vec<ChordOption> {
        self.graph
            .links_from(&self.current)
            .map(|l| ChordOption::new(l.target.clone(), l.weight))
            .collect()
    }

    /// Every tonic-group node (I, iii, vi) with the fallback weight.
    pub fn all_tonic_options(&self) -> Vec<ChordOption> {
        self.graph
            .node_ids()
            .filter(|id| is_tonic(id))
            .map(|id| ChordOption::new(id, self.tonic_fallback_weight))
            .collect()
    }

    /// Overwrite the current chord. Does not record anything.
    pub fn transition_to(&mut self, chord: &str) {
        debug!("transition {} → {}", self.current, chord);
        self.current = chord.to_string();
    }

    /// Pick a fresh random tonic start, keeping the graph.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.current = random_tonic_start(&self.graph, rng);
    }
}

fn random_tonic_start<R: Rng + ?Sized>(graph: &ChordGraph, rng: &mut R) -> String {
    let tonics: Vec<&str> = graph
        .node_ids()
        .filter(|id| extract_degree(id) == Some("I"))
        .collect();
    // Validated graphs always carry a degree-I node; the first node is a
    // last resort for hand-built ones.
    tonics
        .choose(rng)
        .map(|s| s.to_string())
        .or_else(|| graph.nodes.first().map(|n| n.id.clone()))
        .unwrap_or_default()
}

// ─── Progression log ────────────────────────────────────────────────────────

/// The chords played so far, plus how many were chosen by the player.
/// Append-only between resets; no legality checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressionLog {
    chords: Vec<String>,
    steps: usize,
}

impl ProgressionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chord: &str) {
        self.chords.push(chord.to_string());
    }

    /// Append a chord the player picked, counting it as a step.
    pub fn record_step(&mut self, chord: &str) -> usize {
        self.append(chord);
        self.steps += 1;
        self.steps
    }

    pub fn reset(&mut self) {
        self.chords.clear();
        self.steps = 0;
    }

    pub fn chords(&self) -> &[String] {
        &self.chords
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn last(&self) -> Option<&str> {
        self.chords.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }
}

// ─── Resolution policy ──────────────────────────────────────────────────────

/// What to offer after a step.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// Progression ended on a tonic.
    Complete,
    Options(Vec<ChordOption>),
}

/// Bounds progression length so it always ends on a tonic.
///
/// After `max_chords` steps, landing on a tonic completes the progression.
/// On step `max_chords - 1` the offered options are narrowed to tonic
/// targets (or every tonic in the graph if none are reachable). An empty
/// option list at any step also falls back to every tonic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPolicy {
    pub max_chords: usize,
}

impl ResolutionPolicy {
    pub fn new(max_chords: usize) -> Self {
        Self { max_chords }
    }

    /// Decide the next step once `chord` has been reached on step `steps`.
    pub fn next_step(&self, engine: &ProgressionEngine, chord: &str, steps: usize) -> NextStep {
        if steps >= self.max_chords && is_tonic(chord) {
            info!("Progression complete after {} steps on {}", steps, chord);
            return NextStep::Complete;
        }

        let mut options = engine.next_options();

        if steps + 1 == self.max_chords {
            let tonic: Vec<ChordOption> =
                options.iter().filter(|o| is_tonic(&o.chord)).cloned().collect();
            options = if tonic.is_empty() {
                debug!("no tonic reachable from {}, offering all tonics", chord);
                engine.all_tonic_options()
            } else {
                tonic
            };
        }

        if options.is_empty() {
            debug!("{} has no forward options, offering all tonics", chord);
            options = engine.all_tonic_options();
        }

        NextStep::Options(options)
    }
}
