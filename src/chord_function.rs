//! Harmonic function of Roman-numeral chord symbols in a major key.
//!
//! - Tonic: I, iii, vi (stable, can end a progression)
//! - Subdominant: ii, IV
//! - Dominant: V, vii
//!
//! Only the leading degree matters: "Imaj7", "ii9" and "viiø7" classify by
//! "I", "ii" and "vii".

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordFunction {
    Tonic,
    Subdominant,
    Dominant,
}

impl ChordFunction {
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Tonic => "T",
            Self::Subdominant => "SD",
            Self::Dominant => "D",
        }
    }
}

impl fmt::Display for ChordFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Degree numerals, longest first so "III" wins over "II" and "I".
const DEGREES_UPPER: [&str; 7] = ["III", "VII", "II", "IV", "VI", "I", "V"];
const DEGREES_LOWER: [&str; 7] = ["iii", "vii", "ii", "iv", "vi", "i", "v"];

/// Leading Roman-numeral degree of a chord symbol, or None if the symbol
/// does not start with one. Case must be uniform within the numeral.
pub fn extract_degree(chord: &str) -> Option<&str> {
    DEGREES_UPPER
        .iter()
        .chain(DEGREES_LOWER.iter())
        .filter(|d| chord.starts_with(**d))
        .max_by_key(|d| d.len())
        .map(|d| &chord[..d.len()])
}

/// 1-based scale degree of a numeral ("iv" → 4).
pub fn degree_number(numeral: &str) -> Option<u8> {
    match numeral.to_ascii_uppercase().as_str() {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        _ => None,
    }
}

pub fn classify(chord: &str) -> Option<ChordFunction> {
    match extract_degree(chord)? {
        "I" | "iii" | "vi" => Some(ChordFunction::Tonic),
        "ii" | "IV" => Some(ChordFunction::Subdominant),
        "V" | "vii" => Some(ChordFunction::Dominant),
        _ => None,
    }
}

pub fn is_tonic(chord: &str) -> bool {
    classify(chord) == Some(ChordFunction::Tonic)
}

pub fn is_subdominant(chord: &str) -> bool {
    classify(chord) == Some(ChordFunction::Subdominant)
}

pub fn is_dominant(chord: &str) -> bool {
    classify(chord) == Some(ChordFunction::Dominant)
}
