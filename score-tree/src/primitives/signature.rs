use std::fmt;

use super::{event::EventKind, Event};

/// Meter of the following measures, e.g. 3/4 or 7/8.
///
/// Upper is real-valued to allow additive meters like 2.5/4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignature {
    pub upper: f64,
    pub lower: u32,
}
impl TimeSignature {
    pub fn new(upper: f64, lower: u32) -> Self {
        Self { upper, lower }
    }
    /// Length of a full measure in quarters.
    pub fn quarters_per_measure(&self) -> f64 {
        self.upper * 4.0 / self.lower as f64
    }
}
impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4.0, 4)
    }
}
impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.upper, self.lower)
    }
}

/// Key by number of sharps (positive) or flats (negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeySignature {
    pub fifths: i32,
}
impl KeySignature {
    pub fn new(fifths: i32) -> Self {
        Self { fifths }
    }
}
impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fifths {
            0 => write!(f, "no accidentals"),
            n if n > 0 => write!(f, "{} sharps", n),
            n => write!(f, "{} flats", -n),
        }
    }
}

impl Event {
    pub fn as_time_signature(&self) -> Option<TimeSignature> {
        match self.data().kind {
            EventKind::TimeSignature(ts) => Some(ts),
            _ => None,
        }
    }
    pub fn as_key_signature(&self) -> Option<KeySignature> {
        match self.data().kind {
            EventKind::KeySignature(ks) => Some(ks),
            _ => None,
        }
    }
}
