//! Note and Rest, the sounding leaves of the tree.
//!
//! A note may be tied forward to the note that continues it. Tie is a
//! weak link: it never keeps the continuation alive, and it never makes
//! the two notes share an owner.

use derivative::Derivative;
use log::debug;

use super::{
    event::{EventKind, WeakRef},
    Event, EventType, Pitch,
};
use crate::error::{ScoreError, ScoreResult};

/// Onsets closer than this are considered equal when resolving ties.
const TIE_TOLERANCE: f64 = 1e-6;

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub(crate) struct NoteData {
    pub pitch: Pitch,
    pub dynamic: Option<String>,
    pub lyric: Option<String>,
    #[derivative(Debug = "ignore")]
    pub tie: Option<WeakRef>,
}
impl NoteData {
    pub(crate) fn new(pitch: Pitch) -> Self {
        Self {
            pitch,
            dynamic: None,
            lyric: None,
            tie: None,
        }
    }
    pub(crate) fn label(&self) -> String {
        let mut label = format!("Note {}", self.pitch);
        if self.tie.is_some() {
            label.push_str(" tied");
        }
        if let Some(dynamic) = &self.dynamic {
            label.push_str(&format!(" ({})", dynamic));
        }
        if let Some(lyric) = &self.lyric {
            label.push_str(&format!(" \"{}\"", lyric));
        }
        label
    }
}
/// Ties compare by presence: targets are different nodes in copies.
impl PartialEq for NoteData {
    fn eq(&self, other: &Self) -> bool {
        self.pitch == other.pitch
            && self.dynamic == other.dynamic
            && self.lyric == other.lyric
            && self.tie.is_some() == other.tie.is_some()
    }
}

impl Event {
    pub fn is_note(&self) -> bool {
        self.data().note().is_some()
    }
    pub fn is_rest(&self) -> bool {
        matches!(self.data().kind, EventKind::Rest)
    }

    /// Pitch of a note, None for anything else.
    pub fn pitch(&self) -> Option<Pitch> {
        self.data().note().map(|note| note.pitch)
    }
    pub fn set_pitch(&self, pitch: Pitch) -> ScoreResult<()> {
        let mut data = self.data_mut();
        let note = data.note_mut().ok_or_else(not_a_note)?;
        note.pitch = pitch;
        Ok(())
    }
    pub fn key_num(&self) -> Option<f64> {
        self.pitch().map(|pitch| pitch.key_num())
    }
    pub fn dynamic(&self) -> Option<String> {
        self.data().note().and_then(|note| note.dynamic.clone())
    }
    pub fn set_dynamic(&self, dynamic: Option<String>) -> ScoreResult<()> {
        let mut data = self.data_mut();
        data.note_mut().ok_or_else(not_a_note)?.dynamic = dynamic;
        Ok(())
    }
    pub fn lyric(&self) -> Option<String> {
        self.data().note().and_then(|note| note.lyric.clone())
    }
    pub fn set_lyric(&self, lyric: Option<String>) -> ScoreResult<()> {
        let mut data = self.data_mut();
        data.note_mut().ok_or_else(not_a_note)?.lyric = lyric;
        Ok(())
    }

    /// The note this one is tied to, if it is still alive.
    pub fn tie(&self) -> Option<Event> {
        self.data()
            .note()
            .and_then(|note| note.tie.as_ref())
            .and_then(Self::upgrade)
    }
    /// True if the note has a tie, even a dangling one.
    pub fn is_tied(&self) -> bool {
        self.data()
            .note()
            .map_or(false, |note| note.tie.is_some())
    }

    /// Tie the note to `target`, or untie it with None.
    ///
    /// # Returns
    /// - Err(InvalidArgument) if any of them is not a Note.
    /// - Err(TieResolution) if the tie would close a cycle.
    pub fn set_tie(&self, target: Option<&Event>) -> ScoreResult<()> {
        if !self.is_note() {
            return Err(not_a_note());
        }
        let target = match target {
            None => {
                if let Some(note) = self.data_mut().note_mut() {
                    note.tie = None;
                }
                return Ok(());
            }
            Some(target) => target,
        };
        if !target.is_note() {
            return Err(ScoreError::InvalidArgument(format!(
                "can not tie to {}",
                target.describe()
            )));
        }
        let mut current = Some(target.clone());
        while let Some(note) = current {
            if note.ptr_eq(self) {
                return Err(ScoreError::TieResolution(format!(
                    "tie from {} closes a cycle",
                    self.describe()
                )));
            }
            current = note.tie();
        }
        if let Some(note) = self.data_mut().note_mut() {
            note.tie = Some(target.downgrade());
        }
        Ok(())
    }

    /// The note with all its tied continuations, in order.
    ///
    /// # Returns
    /// Err(TieResolution) if some tie of the chain points to a note
    /// that no longer exists.
    pub(crate) fn tie_chain(&self) -> ScoreResult<Vec<Event>> {
        let mut chain = vec![self.clone()];
        let mut current = self.clone();
        while current.is_tied() {
            let next = current.tie().ok_or_else(|| {
                ScoreError::TieResolution(format!(
                    "{} is tied to a removed note",
                    current.describe()
                ))
            })?;
            chain.push(next.clone());
            current = next;
        }
        Ok(chain)
    }

    /// Sum of durations along the tie chain starting here.
    pub fn tied_duration(&self) -> ScoreResult<f64> {
        Ok(self
            .tie_chain()?
            .iter()
            .map(|note| note.duration())
            .sum())
    }

    /// Find the note this one should be tied to, by position.
    ///
    /// Candidates are notes of the same key number starting at the
    /// offset of self, searched in the enclosing Part (or the whole
    /// tree, if there is no Part). A single candidate in the same Staff
    /// wins over candidates of other staves.
    ///
    /// # Returns
    /// Err(TieResolution) if there is no candidate, or if the choice is
    /// ambiguous.
    pub fn resolve_tie(&self) -> ScoreResult<Event> {
        let key_num = self.key_num().ok_or_else(not_a_note)?;
        let offset = self.offset()?;
        if !self.has_parent() {
            return Err(ScoreError::TieResolution(format!(
                "{} is not in a score",
                self.describe()
            )));
        }
        let scope = self.part().unwrap_or_else(|| self.root());
        let candidates: Vec<Event> = scope
            .find_all(EventType::Note)
            .filter(|note| {
                !note.ptr_eq(self)
                    && note.key_num() == Some(key_num)
                    && note
                        .onset()
                        .map_or(false, |on| (on - offset).abs() < TIE_TOLERANCE)
            })
            .collect();
        let staff = self.staff();
        let same_staff: Vec<&Event> = candidates
            .iter()
            .filter(|note| match (&staff, note.staff()) {
                (Some(a), Some(b)) => a.ptr_eq(&b),
                _ => false,
            })
            .collect();
        if same_staff.len() == 1 {
            return Ok(same_staff[0].clone());
        }
        match candidates.len() {
            1 => Ok(candidates[0].clone()),
            0 => Err(ScoreError::TieResolution(format!(
                "nothing to tie {} to",
                self.describe()
            ))),
            n => {
                debug!("{} candidates for tie of {}", n, self.describe());
                Err(ScoreError::TieResolution(format!(
                    "{} notes can continue {}",
                    n,
                    self.describe()
                )))
            }
        }
    }
}

fn not_a_note() -> ScoreError {
    ScoreError::InvalidArgument("not a note".to_string())
}
