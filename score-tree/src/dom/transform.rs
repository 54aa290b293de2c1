//! Structural copies: chords expanded, rests or measures removed.
//!
//! None of them changes the source tree. Onsets and durations of the
//! remaining events are kept, and lifted events are ordered by onset
//! inside their new parent.

use super::ties::{adopt, check_parent};
use crate::{
    error::ScoreResult,
    primitives::{container::Rewrite, Event, EventType},
};

/// Content of a Measure which survives [Event::remove_measures].
static MEASURE_CONTENT: &[EventType] = &[EventType::Note, EventType::KeySignature];

impl Event {
    /// Copy where notes of every Chord are moved to the parent of the
    /// Chord, and the Chord itself disappears.
    pub fn expand_chords(&self, parent: Option<&Event>) -> ScoreResult<Event> {
        check_parent(parent)?;
        let copy = self.rebuild_with(&|event| match event.event_type() {
            EventType::Chord => Rewrite::Lift(None),
            _ => Rewrite::Keep,
        });
        adopt(copy, parent)
    }

    /// Copy without Rests.
    pub fn remove_rests(&self, parent: Option<&Event>) -> ScoreResult<Event> {
        check_parent(parent)?;
        let copy = self.rebuild_with(&|event| match event.event_type() {
            EventType::Rest => Rewrite::Drop,
            _ => Rewrite::Keep,
        });
        adopt(copy, parent)
    }

    /// Copy where Notes and KeySignatures of every Measure go directly
    /// into the enclosing Staff. Everything else in the Measure
    /// (chords, rests, time signatures) is discarded.
    pub fn remove_measures(&self, parent: Option<&Event>) -> ScoreResult<Event> {
        check_parent(parent)?;
        let copy = self.rebuild_with(&|event| match event.event_type() {
            EventType::Measure => Rewrite::Lift(Some(MEASURE_CONTENT)),
            _ => Rewrite::Keep,
        });
        adopt(copy, parent)
    }
}
