//! Tuning record for blobs, placement, playback and progression length.
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides. Missing or malformed files fall back to defaults with a warning.

use crate::chord_function::ChordFunction;
use crate::types::{Rgba, DEFAULT_PALETTE};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobTuning {
    pub min_radius: f32,
    pub max_radius: f32,
    /// Minimum gap between neighbouring blobs in one batch.
    pub spacing: f32,
    pub max_placement_attempts: u32,
    /// Extra inset added to `max_radius` to keep blobs off the canvas edge.
    pub margin_padding: f32,
    /// Expansion progress added per tick.
    pub expand_speed: f32,
    /// Fade-out progress added per tick.
    pub fade_speed: f32,
    pub friction: f32,
    /// Velocity multiplier on wall bounce.
    pub restitution: f32,
    /// Fraction of the overlap correction converted into velocity per tick.
    pub collision_stiffness: f32,
    pub outline_points: usize,
    /// Max random deviation of the initial outline radius.
    pub outline_jitter: f32,
    pub wobble_amplitude: f32,
    pub wander_amplitude: f32,
    /// Expansion target, as a multiple of the longer canvas dimension.
    pub expand_target_scale: f32,
    pub phase_speed_min: f32,
    pub phase_speed_range: f32,
}

impl Default for BlobTuning {
    fn default() -> Self {
        Self {
            min_radius: 40.0,
            max_radius: 100.0,
            spacing: 30.0,
            max_placement_attempts: 50,
            margin_padding: 20.0,
            expand_speed: 0.01,
            fade_speed: 0.01,
            friction: 0.98,
            restitution: -0.8,
            collision_stiffness: 0.05,
            outline_points: 8,
            outline_jitter: 10.0,
            wobble_amplitude: 5.0,
            wander_amplitude: 10.0,
            expand_target_scale: 1.5,
            phase_speed_min: 0.02,
            phase_speed_range: 0.03,
        }
    }
}

impl BlobTuning {
    /// Canvas inset used for placements.
    pub fn margin(&self) -> f32 {
        self.max_radius + self.margin_padding
    }

    /// Blob radius for an option weight.
    pub fn radius_for_weight(&self, weight: f32) -> f32 {
        self.min_radius + weight * (self.max_radius - self.min_radius)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackTuning {
    pub blob_radius: f32,
    pub drop_interval_ms: u64,
    pub completion_delay_ms: u64,
    pub gravity: f32,
    /// Initial y of every replay blob (above the visible canvas).
    pub start_y: f32,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            blob_radius: 60.0,
            drop_interval_ms: 500,
            completion_delay_ms: 500,
            gravity: 0.2,
            start_y: -100.0,
        }
    }
}

impl PlaybackTuning {
    pub fn drop_interval(&self) -> Duration {
        Duration::from_millis(self.drop_interval_ms)
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    /// Once this many chords have been chosen, a tonic ends the progression.
    pub max_chord_count: usize,
    pub tonic_fallback_weight: f32,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            max_chord_count: 7,
            tonic_fallback_weight: 0.5,
        }
    }
}

/// Phase-speed multipliers by harmonic function. Tonic drifts slowest,
/// dominant fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSpeeds {
    pub tonic: f32,
    pub subdominant: f32,
    pub dominant: f32,
    pub unclassified: f32,
}

impl Default for AnimationSpeeds {
    fn default() -> Self {
        Self {
            tonic: 0.6,
            subdominant: 1.0,
            dominant: 1.6,
            unclassified: 1.0,
        }
    }
}

impl AnimationSpeeds {
    pub fn multiplier(&self, function: Option<ChordFunction>) -> f32 {
        match function {
            Some(ChordFunction::Tonic) => self.tonic,
            Some(ChordFunction::Subdominant) => self.subdominant,
            Some(ChordFunction::Dominant) => self.dominant,
            None => self.unclassified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub blob: BlobTuning,
    pub playback: PlaybackTuning,
    pub progression: ProgressionTuning,
    pub animation: AnimationSpeeds,
    /// Hex colors, cycled by option index.
    pub palette: Vec<String>,
    pub chord_duration_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blob: BlobTuning::default(),
            playback: PlaybackTuning::default(),
            progression: ProgressionTuning::default(),
            animation: AnimationSpeeds::default(),
            palette: DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect(),
            chord_duration_ms: 250,
        }
    }
}

impl Config {
    /// Load from a JSON file. Returns None if the file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(c) => {
                info!("Loaded config from {:?}", path);
                Some(c)
            }
            Err(e) => {
                warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Palette color for the i-th blob. Unparseable entries fall back to white.
    pub fn color(&self, index: usize) -> Rgba {
        if self.palette.is_empty() {
            return Rgba::WHITE;
        }
        let hex = &self.palette[index % self.palette.len()];
        Rgba::from_hex(hex).unwrap_or_else(|| {
            warn!("Bad palette color {:?}, using white", hex);
            Rgba::WHITE
        })
    }

    pub fn chord_duration(&self) -> Duration {
        Duration::from_millis(self.chord_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning() {
        let c = Config::default();
        assert_eq!(c.blob.margin(), 120.0);
        assert_eq!(c.blob.radius_for_weight(0.0), 40.0);
        assert_eq!(c.blob.radius_for_weight(1.0), 100.0);
        assert_eq!(c.blob.radius_for_weight(0.5), 70.0);
        assert_eq!(c.progression.max_chord_count, 7);
        assert_eq!(c.playback.drop_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c: Config =
            serde_json::from_str(r#"{"blob":{"spacing":10.0},"progression":{"max_chord_count":4}}"#)
                .unwrap();
        assert_eq!(c.blob.spacing, 10.0);
        assert_eq!(c.blob.max_radius, 100.0);
        assert_eq!(c.progression.max_chord_count, 4);
        assert_eq!(c.palette.len(), 5);
    }

    #[test]
    fn test_palette_cycles() {
        let c = Config::default();
        assert_eq!(c.color(0), c.color(5));
        assert_ne!(c.color(0), c.color(1));
    }

    #[test]
    fn test_speed_ordering() {
        let s = AnimationSpeeds::default();
        let t = s.multiplier(Some(ChordFunction::Tonic));
        let sd = s.multiplier(Some(ChordFunction::Subdominant));
        let d = s.multiplier(Some(ChordFunction::Dominant));
        assert!(t < sd && sd < d);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("/nonexistent/chord-blobs.json")).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("chord_blobs_cfg_{}.json", std::process::id()));
        let mut c = Config::default();
        c.playback.gravity = 0.35;
        c.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, c);
    }
}
