use crate::blob::AnimatedBlob;
use crate::types::Point;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// How the simulated player picks among offered blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TapStrategy {
    /// Uniformly random.
    Random,
    /// Always the biggest blob (highest edge weight).
    Biggest,
}

/// Simulated user that taps blobs in headless runs.
///
/// Waits until a batch is settled (nothing expanding), "thinks" for a
/// random delay, then taps the visual center of one offered blob.
pub struct AutoPlayer {
    rng: StdRng,
    strategy: TapStrategy,
    think_min: Duration,
    think_max: Duration,
    next_tap_at: Option<Duration>,
}

impl AutoPlayer {
    pub fn new(rng: StdRng, strategy: TapStrategy) -> Self {
        Self {
            rng,
            strategy,
            think_min: Duration::from_millis(300),
            think_max: Duration::from_millis(1200),
            next_tap_at: None,
        }
    }

    pub fn with_think_time(mut self, min: Duration, max: Duration) -> Self {
        self.think_min = min;
        self.think_max = max.max(min);
        self
    }

    /// Where to tap at session time `now`, if anywhere.
    pub fn poll(&mut self, blobs: &[AnimatedBlob], now: Duration) -> Option<Point> {
        let settled = !blobs.iter().any(|b| b.is_expanding());
        let offered: Vec<&AnimatedBlob> = blobs.iter().filter(|b| b.is_hoverable()).collect();
        if !settled || offered.is_empty() {
            self.next_tap_at = None;
            return None;
        }

        let due = match self.next_tap_at {
            Some(due) => due,
            None => {
                let think = if self.think_max > self.think_min {
                    self.rng.gen_range(self.think_min..=self.think_max)
                } else {
                    self.think_min
                };
                let due = now + think;
                self.next_tap_at = Some(due);
                due
            }
        };
        if now < due {
            return None;
        }
        self.next_tap_at = None;

        let pick = match self.strategy {
            TapStrategy::Random => offered.choose(&mut self.rng).copied(),
            TapStrategy::Biggest => offered
                .iter()
                .copied()
                .max_by(|a, b| a.base_radius().total_cmp(&b.base_radius())),
        }?;
        debug!("auto-tap {} at {:?}", pick.label(), now);
        Some(pick.visual_center())
    }
}
