//! Onset of an event, which may be unknown until the event is placed.
use std::fmt;

/// Start time in quarters (or seconds, after conversion).
///
/// Groups built from nested literals have [Onset::Unresolved] until
/// they are inserted or explicitly placed. The first resolution of a
/// group moves all of its content along with it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Onset {
    #[default]
    Unresolved,
    Resolved(f64),
}
impl Onset {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
    pub fn get(&self) -> Option<f64> {
        match self {
            Self::Resolved(value) => Some(*value),
            Self::Unresolved => None,
        }
    }
    /// Resolved value, or `default` for unresolved onset.
    pub fn or(&self, default: f64) -> f64 {
        self.get().unwrap_or(default)
    }
}
impl From<f64> for Onset {
    fn from(value: f64) -> Self {
        Self::Resolved(value)
    }
}
impl From<Option<f64>> for Onset {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(value) => Self::Resolved(value),
            None => Self::Unresolved,
        }
    }
}
impl fmt::Display for Onset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(value) => write!(f, "{:.3}", value),
            Self::Unresolved => write!(f, "?"),
        }
    }
}
