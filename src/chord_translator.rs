use crate::chord_function::extract_degree;
use log::{trace, warn};
use serde::{Deserialize, Serialize};

/// Converts chord symbols into concrete pitch names for the synthesizer.
///
/// Accepts literal chord names ("Cmaj7", "F#m7", "Bb") and Roman-numeral
/// degree notation ("ii7", "V7", "vii°", "viiø7") read against C major.
/// Degree symbols are first rewritten to a literal name, then the root and
/// quality suffix are looked up. Pitches start at octave 4 and wrap upward.
///
/// Translation never fails: an unknown suffix falls back to a major triad,
/// and a symbol without a recognizable root yields an empty list.
#[derive(Debug, Clone, Default)]
pub struct ChordTranslator {
    octave: i32,
}

/// Pitch-class names used for output (sharps only).
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const BASE_OCTAVE: i32 = 4;

impl ChordTranslator {
    pub fn new() -> Self {
        Self { octave: BASE_OCTAVE }
    }

    /// Rewrite degree notation to a literal chord name in C major.
    /// Non-degree symbols are returned unchanged.
    pub fn to_literal(&self, symbol: &str) -> String {
        let Some(degree) = extract_degree(symbol) else {
            return symbol.to_string();
        };
        let Some(root) = degree_root(degree) else {
            return symbol.to_string();
        };
        let quality = &symbol[degree.len()..];
        let is_minor = degree.chars().all(|c| c.is_ascii_lowercase());

        let literal = match quality {
            "°" => format!("{}dim", root),
            "ø7" => format!("{}m7b5", root),
            "" if is_minor => format!("{}m", root),
            q if is_minor && q.contains('7') && !q.contains("maj") => format!("{}m{}", root, q),
            q => format!("{}{}", root, q),
        };
        trace!("degree {} → {}", symbol, literal);
        literal
    }

    /// Pitch names ("C4", "E4", "G4") for a chord symbol. Empty if the root
    /// can't be parsed.
    pub fn pitches(&self, symbol: &str) -> Vec<String> {
        self.midi_notes(symbol)
            .into_iter()
            .map(midi_to_note_name)
            .collect()
    }

    /// MIDI note numbers for a chord symbol, root in the translator's octave.
    pub fn midi_notes(&self, symbol: &str) -> Vec<u8> {
        let literal = self.to_literal(symbol);
        let Some((root_pc, suffix)) = parse_root(&literal) else {
            warn!("No notes to play for chord: {:?}", symbol);
            return Vec::new();
        };
        let quality = ChordQuality::from_suffix(suffix);
        let base = (self.octave + 1) * 12 + root_pc as i32;
        quality
            .intervals()
            .iter()
            .map(|&i| (base + i as i32).clamp(0, 127) as u8)
            .collect()
    }
}

/// Root letter for a degree numeral in C major.
fn degree_root(degree: &str) -> Option<&'static str> {
    match degree.to_ascii_uppercase().as_str() {
        "I" => Some("C"),
        "II" => Some("D"),
        "III" => Some("E"),
        "IV" => Some("F"),
        "V" => Some("G"),
        "VI" => Some("A"),
        "VII" => Some("B"),
        _ => None,
    }
}

/// Split "F#m7" into (pitch class 6, "m7"). The root is a letter A–G with
/// an optional `#` or `b`; spellings without a pitch class (Cb, E#, ...)
/// are rejected.
fn parse_root(chord: &str) -> Option<(u8, &str)> {
    let mut chars = chord.chars();
    let letter = chars.next().filter(|c| ('A'..='G').contains(c))?;
    let root_len = match chars.next() {
        Some('#') | Some('b') => 2,
        _ => 1,
    };
    let root = &chord[..root_len];
    let pc = match root {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => {
            trace!("unmapped root spelling {:?} (letter {})", root, letter);
            return None;
        }
    };
    Some((pc, &chord[root_len..]))
}

// ─── Chord quality ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordQuality {
    Major,
    Minor,
    Sixth,
    Minor6,
    Dominant7,
    Major7,
    Minor7,
    HalfDiminished7,
    Diminished,
    Augmented,
    Dominant9,
    Major9,
    Minor9,
}

impl ChordQuality {
    /// Look up a quality suffix. Unknown suffixes default to a major triad.
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix {
            "" | "maj" | "M" => Self::Major,
            "m" | "min" => Self::Minor,
            "6" => Self::Sixth,
            "m6" | "min6" => Self::Minor6,
            "7" => Self::Dominant7,
            "maj7" | "M7" => Self::Major7,
            "m7" | "min7" => Self::Minor7,
            "m7b5" => Self::HalfDiminished7,
            "dim" | "°" | "dim7" => Self::Diminished,
            "aug" | "+" => Self::Augmented,
            "9" => Self::Dominant9,
            "maj9" | "M9" => Self::Major9,
            "m9" | "min9" => Self::Minor9,
            other => {
                trace!("unrecognized chord suffix {:?}, using major triad", other);
                Self::Major
            }
        }
    }

    /// Semitones above the root.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 4, 7],
            Self::Minor => &[0, 3, 7],
            Self::Sixth => &[0, 4, 7, 9],
            Self::Minor6 => &[0, 3, 7, 9],
            Self::Dominant7 => &[0, 4, 7, 10],
            Self::Major7 => &[0, 4, 7, 11],
            Self::Minor7 => &[0, 3, 7, 10],
            Self::HalfDiminished7 => &[0, 3, 6, 10],
            Self::Diminished => &[0, 3, 6],
            Self::Augmented => &[0, 4, 8],
            Self::Dominant9 => &[0, 4, 7, 10, 14],
            Self::Major9 => &[0, 4, 7, 11, 14],
            Self::Minor9 => &[0, 3, 7, 10, 14],
        }
    }
}

// ─── Pitch helpers ──────────────────────────────────────────────────────────

/// "C#4" for MIDI 61.
pub fn midi_to_note_name(midi: u8) -> String {
    let octave = midi as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[(midi % 12) as usize], octave)
}

/// Parse a pitch name like "C#4", "Bb3" or "A-1" into a MIDI note number.
pub fn note_name_to_midi(name: &str) -> Option<u8> {
    let (pc, rest) = parse_root(name)?;
    let octave: i32 = rest.parse().ok()?;
    let midi = (octave + 1) * 12 + pc as i32;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// Convert MIDI note number (possibly fractional) to frequency in Hz.
/// A4 = MIDI 69 = 440 Hz.
pub fn midi_to_hz(midi: f64) -> f64 {
    440.0 * 2.0f64.powf((midi - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord_function::classify;

    fn t() -> ChordTranslator {
        ChordTranslator::new()
    }

    #[test]
    fn test_literal_triads() {
        assert_eq!(t().pitches("C"), vec!["C4", "E4", "G4"]);
        assert_eq!(t().pitches("Am"), vec!["A4", "C5", "E5"]);
        assert_eq!(t().pitches("Bb"), vec!["A#4", "D5", "F5"]);
    }

    #[test]
    fn test_sevenths_and_extensions() {
        assert_eq!(t().pitches("Cmaj7"), vec!["C4", "E4", "G4", "B4"]);
        assert_eq!(t().pitches("G7"), vec!["G4", "B4", "D5", "F5"]);
        assert_eq!(t().pitches("Dm9"), vec!["D4", "F4", "A4", "C5", "E5"]);
        assert_eq!(t().pitches("Bm7b5"), vec!["B4", "D5", "F5", "A5"]);
    }

    #[test]
    fn test_degree_conversion() {
        let tr = t();
        assert_eq!(tr.to_literal("I"), "C");
        assert_eq!(tr.to_literal("Imaj7"), "Cmaj7");
        assert_eq!(tr.to_literal("ii"), "Dm");
        assert_eq!(tr.to_literal("ii7"), "Dm7");
        assert_eq!(tr.to_literal("ii9"), "D9");
        assert_eq!(tr.to_literal("vi6"), "A6");
        assert_eq!(tr.to_literal("iimaj7"), "Dmaj7");
        assert_eq!(tr.to_literal("V7"), "G7");
        assert_eq!(tr.to_literal("vii°"), "Bdim");
        assert_eq!(tr.to_literal("viiø7"), "Bm7b5");
        assert_eq!(tr.to_literal("IVmaj7"), "Fmaj7");
        assert_eq!(tr.to_literal("F#m"), "F#m");
    }

    #[test]
    fn test_degree_pitches() {
        assert_eq!(t().pitches("ii7"), vec!["D4", "F4", "A4", "C5"]);
        assert_eq!(t().pitches("V7"), vec!["G4", "B4", "D5", "F5"]);
        assert_eq!(t().pitches("vii°"), vec!["B4", "D5", "F5"]);
        assert_eq!(t().pitches("viiø7"), vec!["B4", "D5", "F5", "A5"]);
    }

    #[test]
    fn test_lowercase_ninths_and_sixths_keep_major_third() {
        assert_eq!(t().pitches("ii9"), vec!["D4", "F#4", "A4", "C5", "E5"]);
        assert_eq!(t().pitches("vi9"), vec!["A4", "C#5", "E5", "G5", "B5"]);
        assert_eq!(t().pitches("vi6"), vec!["A4", "C#5", "E5", "F#5"]);
        // only sevenths pick up the minor third
        assert_eq!(t().pitches("iii7"), vec!["E4", "G4", "B4", "D5"]);
    }

    #[test]
    fn test_size_and_root_for_every_quality() {
        let suffixes = [
            "", "maj", "M", "m", "min", "6", "m6", "min6", "7", "maj7", "M7", "m7", "min7",
            "m7b5", "dim", "°", "dim7", "aug", "+", "9", "maj9", "M9", "m9", "min9",
        ];
        for root in ["C", "C#", "Db", "E", "F#", "Ab", "B"] {
            let (pc, _) = parse_root(root).unwrap();
            for suffix in suffixes {
                let symbol = format!("{}{}", root, suffix);
                let notes = t().midi_notes(&symbol);
                let expected = ChordQuality::from_suffix(suffix).intervals().len();
                assert_eq!(notes.len(), expected, "{}", symbol);
                assert_eq!(notes[0] % 12, pc, "{}", symbol);
            }
        }
    }

    #[test]
    fn test_unknown_suffix_defaults_to_major() {
        assert_eq!(t().pitches("Csus4"), vec!["C4", "E4", "G4"]);
        assert_eq!(ChordQuality::from_suffix("13"), ChordQuality::Major);
    }

    #[test]
    fn test_unparseable_root_is_empty() {
        assert!(t().pitches("").is_empty());
        assert!(t().pitches("H7").is_empty());
        assert!(t().pitches("xyz").is_empty());
        assert!(t().pitches("Cbmaj7").is_empty());
    }

    #[test]
    fn test_octave_wraps_upward() {
        // B + 14 semitones crosses two octave boundaries
        assert_eq!(t().pitches("B9"), vec!["B4", "D#5", "F#5", "A5", "C#6"]);
    }

    #[test]
    fn test_degree_shared_with_classifier() {
        for symbol in ["ii7", "V", "viiø7", "IVmaj7", "iii7"] {
            let degree = extract_degree(symbol).unwrap();
            let literal = t().to_literal(symbol);
            let root = degree_root(degree).unwrap();
            assert!(literal.starts_with(root), "{} → {}", symbol, literal);
            assert!(classify(symbol).is_some(), "{}", symbol);
        }
    }

    #[test]
    fn test_note_name_roundtrip() {
        assert_eq!(note_name_to_midi("C4"), Some(60));
        assert_eq!(note_name_to_midi("A4"), Some(69));
        assert_eq!(note_name_to_midi("Bb3"), Some(58));
        assert_eq!(note_name_to_midi("C-1"), Some(0));
        assert_eq!(note_name_to_midi("C"), None);
        assert_eq!(midi_to_note_name(61), "C#4");
        assert!((midi_to_hz(69.0) - 440.0).abs() < 0.01);
        assert!((midi_to_hz(60.0) - 261.63).abs() < 0.1);
    }
}
