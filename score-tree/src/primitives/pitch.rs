//! Symbolic pitch: key number plus the alteration used to spell it.
//!
//! The letter name is found by *subtracting* the alteration from the key
//! number: C#4 is `key_num = 61, alt = 1` (61 - 1 = 60, a C), Db4 is
//! `key_num = 61, alt = -1` (61 + 1 = 62, a D). Both sound the same, but
//! they are different values.
//!
//! ```
//! use score_tree::primitives::Pitch;
//!
//! let c_sharp = Pitch::new(61.0, 1.0);
//! let d_flat = Pitch::new(61.0, -1.0);
//! assert_eq!(c_sharp.name_with_octave(), "C#4");
//! assert_eq!(d_flat.name_with_octave(), "Db4");
//! assert_ne!(c_sharp, d_flat);
//! assert_eq!(c_sharp.key_num(), d_flat.key_num());
//! ```

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use crate::error::{ScoreError, ScoreResult};

/// Pitch classes of C D E F G A B.
const NATURALS: [i64; 7] = [0, 2, 4, 5, 7, 9, 11];
const STEPS: [char; 12] =
    ['C', '?', 'D', '?', 'E', 'F', '?', 'G', '?', 'A', '?', 'B'];
const SHARP_CHARS: [char; 2] = ['#', '♯'];
const FLAT_CHARS: [char; 2] = ['b', '♭'];
const NATURAL_CHARS: [char; 2] = ['n', '♮'];
/// Octave used by [Pitch::from_name] when the name carries none.
pub const DEFAULT_OCTAVE: i64 = 4;

fn is_natural(unaltered: i64) -> bool {
    NATURALS.contains(&unaltered.rem_euclid(12))
}

/// Direction of an accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accidental {
    Sharp,
    Flat,
}

#[derive(Debug, Clone, Copy)]
pub struct Pitch {
    key_num: f64,
    alt: f64,
}
impl Pitch {
    /// Build pitch from key number (C4 = 60) and alteration.
    ///
    /// The alteration is corrected, so `key_num - alt` always lands on
    /// one of C D E F G A B. E.g. `Pitch::new(61.0, 0.0)` is spelled C#.
    pub fn new(key_num: f64, alt: f64) -> Self {
        let mut pitch = Self {
            // normalizes -0.0
            key_num: key_num + 0.0,
            alt: alt + 0.0,
        };
        pitch.fix_alteration();
        pitch
    }

    /// Parse names like `C4`, `F#3`, `Bbb`, `e♭5` or `C-1`.
    ///
    /// Accidentals are either all sharps (`#`, `♯`) or all flats (`b`,
    /// `♭`). Octave defaults to [DEFAULT_OCTAVE].
    pub fn from_name(name: &str) -> ScoreResult<Self> {
        let trimmed = name.trim();
        let mut chars = trimmed.chars().peekable();
        let letter = chars
            .next()
            .ok_or_else(|| ScoreError::malformed_pitch(name, "empty name"))?;
        let letter_pc: i64 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => {
                return Err(ScoreError::malformed_pitch(
                    name,
                    format!("`{}` is not a letter name", other),
                ))
            }
        };
        let mut direction: Option<Accidental> = None;
        let mut alt: i64 = 0;
        while let Some(&c) = chars.peek() {
            let current = if SHARP_CHARS.contains(&c) {
                Accidental::Sharp
            } else if FLAT_CHARS.contains(&c) {
                Accidental::Flat
            } else if NATURAL_CHARS.contains(&c) {
                return Err(ScoreError::malformed_pitch(
                    name,
                    "natural signs are not supported",
                ));
            } else {
                break;
            };
            match direction {
                Some(dir) if dir != current => {
                    return Err(ScoreError::malformed_pitch(
                        name,
                        "sharps and flats can not be mixed",
                    ))
                }
                _ => direction = Some(current),
            }
            alt += match current {
                Accidental::Sharp => 1,
                Accidental::Flat => -1,
            };
            chars.next();
        }
        let rest: String = chars.collect();
        let octave = match rest.is_empty() {
            true => DEFAULT_OCTAVE,
            false => rest.parse::<i64>().map_err(|_| {
                ScoreError::malformed_pitch(
                    name,
                    format!("`{}` is not an octave number", rest),
                )
            })?,
        };
        let key_num = octave
            .checked_add(1)
            .and_then(|o| o.checked_mul(12))
            .and_then(|k| k.checked_add(letter_pc + alt))
            .ok_or_else(|| ScoreError::malformed_pitch(name, "octave out of range"))?;
        Ok(Self::new(key_num as f64, alt as f64))
    }

    fn fix_alteration(&mut self) {
        let unaltered = self.key_num - self.alt;
        if unaltered.fract() != 0.0 {
            // keep unaltered whole, move the fraction into alt
            self.alt += unaltered - unaltered.round();
        }
        match self.unaltered().rem_euclid(12) {
            // C# -> C, F# -> F
            1 | 6 => self.alt += 1.0,
            // Eb -> E, Ab -> A, Bb -> B
            3 | 8 | 10 => self.alt -= 1.0,
            _ => (),
        }
    }

    fn unaltered(&self) -> i64 {
        (self.key_num - self.alt).round() as i64
    }

    pub fn key_num(&self) -> f64 {
        self.key_num
    }
    pub fn alt(&self) -> f64 {
        self.alt
    }

    /// Letter name without accidentals.
    pub fn step(&self) -> char {
        STEPS[self.unaltered().rem_euclid(12) as usize]
    }

    /// Letter name with accidentals, e.g. `Eb` or `F##`.
    ///
    /// Non-integral alterations are rendered as `?`.
    pub fn name(&self) -> String {
        let accidentals = if self.alt.fract() != 0.0 {
            "?".to_string()
        } else if self.alt > 0.0 {
            "#".repeat(self.alt as usize)
        } else {
            "b".repeat(-self.alt as usize)
        };
        format!("{}{}", self.step(), accidentals)
    }

    /// Name with the octave of the written letter: B#3, Cb4.
    pub fn name_with_octave(&self) -> String {
        format!("{}{}", self.name(), self.octave())
    }

    /// `key_num` modulo 12.
    pub fn pitch_class(&self) -> f64 {
        self.key_num.rem_euclid(12.0)
    }

    /// Octave of the written letter name. B#3 is in octave 3.
    pub fn octave(&self) -> i64 {
        self.unaltered().div_euclid(12) - 1
    }

    /// Octave of the sounding key number. B#3 is in register 4.
    pub fn register(&self) -> i64 {
        (self.key_num.floor() as i64).div_euclid(12) - 1
    }

    /// Respell with the smallest alteration of the opposite direction.
    ///
    /// `Cbb` becomes `A#`, `C#` becomes `Db`. Naturals take a single
    /// accidental when there is one (`C` -> `B#`, `E` -> `Fb`), else a
    /// double flat (`D` -> `Ebb`).
    pub fn enharmonic(&self) -> Self {
        let mut alt = self.alt;
        let mut unaltered = self.unaltered();
        if alt < 0.0 {
            while alt < 0.0 || !is_natural(unaltered) {
                unaltered -= 1;
                alt += 1.0;
            }
        } else if alt > 0.0 {
            while alt > 0.0 || !is_natural(unaltered) {
                unaltered += 1;
                alt -= 1.0;
            }
        } else {
            alt = match unaltered.rem_euclid(12) {
                0 | 5 => 1.0,
                4 | 11 => -1.0,
                _ => -2.0,
            };
        }
        Self::new(self.key_num, alt)
    }

    /// Spell with the next letter up: C# -> Db, C## -> D, E -> Fb.
    pub fn upper_enharmonic(&self) -> Self {
        let alt = match self.unaltered().rem_euclid(12) {
            // C->D, D->E, F->G, G->A, A->B
            0 | 2 | 5 | 7 | 9 => self.alt - 2.0,
            // E->F, B->C
            _ => self.alt - 1.0,
        };
        Self::new(self.key_num, alt)
    }

    /// Spell with the next letter down: Db -> C#, D -> C##, F -> E#.
    pub fn lower_enharmonic(&self) -> Self {
        let alt = match self.unaltered().rem_euclid(12) {
            // D->C, E->D, G->F, A->G, B->A
            2 | 4 | 7 | 9 | 11 => self.alt + 2.0,
            // F->E, C->B
            _ => self.alt + 1.0,
        };
        Self::new(self.key_num, alt)
    }

    /// Spelling with the smallest alteration.
    ///
    /// Natural spelling wins when one exists. Otherwise `prefer` decides
    /// between sharp and flat, and `None` picks the conventional one of
    /// C# Eb F# Ab Bb.
    pub fn simplest_enharmonic(&self, prefer: Option<Accidental>) -> Self {
        let nearest = self.key_num.round() as i64;
        let unaltered = match is_natural(nearest) {
            true => nearest,
            false => match prefer {
                Some(Accidental::Sharp) => nearest - 1,
                Some(Accidental::Flat) => nearest + 1,
                None => match nearest.rem_euclid(12) {
                    1 | 6 => nearest - 1,
                    _ => nearest + 1,
                },
            },
        };
        Self::new(self.key_num, self.key_num - unaltered as f64)
    }
}

impl PartialEq for Pitch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Pitch {}
impl PartialOrd for Pitch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
/// Ordered by key number, then by *descending* alteration: B#3 sorts
/// below C4, Dbb4 above it.
impl Ord for Pitch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_num
            .total_cmp(&other.key_num)
            .then_with(|| other.alt.total_cmp(&self.alt))
    }
}
impl Hash for Pitch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_num.to_bits().hash(state);
        self.alt.to_bits().hash(state);
    }
}
impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name_with_octave())
    }
}
impl FromStr for Pitch {
    type Err = ScoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
impl From<f64> for Pitch {
    fn from(key_num: f64) -> Self {
        Self::new(key_num, 0.0)
    }
}
impl From<i32> for Pitch {
    fn from(key_num: i32) -> Self {
        Self::new(key_num as f64, 0.0)
    }
}
impl From<u8> for Pitch {
    fn from(key_num: u8) -> Self {
        Self::new(key_num as f64, 0.0)
    }
}
