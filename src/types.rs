use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ─── Geometry ───────────────────────────────────────────────────────────────

/// A point on the canvas, in pixels. Origin is the top-left corner,
/// y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// ─── Color ──────────────────────────────────────────────────────────────────

/// Fill color with alpha. Channels are 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#RRGGBB` (leading `#` optional). Returns None on anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(
            channel(0)? as f32 / 255.0,
            channel(2)? as f32 / 255.0,
            channel(4)? as f32 / 255.0,
        ))
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Blob fill colors, cycled by option index.
pub const DEFAULT_PALETTE: [&str; 5] = ["#FD6F00", "#FF2C62", "#6842FF", "#00D9FF", "#FFD700"];

// ─── Chord options & placements ─────────────────────────────────────────────

/// A candidate next chord. `weight` only sizes the blob; it is never a
/// selection probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordOption {
    pub chord: String,
    pub weight: f32,
}

impl ChordOption {
    pub fn new(chord: impl Into<String>, weight: f32) -> Self {
        Self { chord: chord.into(), weight }
    }
}

/// One accepted placement within a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Identity of a live blob, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId(pub u64);

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob#{}", self.0)
    }
}

// ─── Frame clock ────────────────────────────────────────────────────────────

/// Session clock advanced by the frame driver rather than the wall clock,
/// so headless runs and tests see the same timeline as a live display.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    elapsed: Duration,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.frames += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn now_us(&self) -> u64 {
        self.elapsed.as_micros() as u64
    }
}

/// Nominal frame period at 60 fps.
pub const FRAME_60FPS: Duration = Duration::from_micros(16_667);
