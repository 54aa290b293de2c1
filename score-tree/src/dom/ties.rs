//! Merging of tied notes.
//!
//! Done in two passes over the subtree. The first one collects tie
//! chains: which notes continue another note of the subtree, and the
//! total duration of every chain head. The second one rebuilds the
//! subtree without continuations, giving heads the chain duration.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::{
    error::{ScoreError, ScoreResult},
    primitives::{container::Rewrite, event::NodeId, Event, EventType},
};

#[derive(Debug, Default)]
struct TieContext {
    /// notes which continue another note of the subtree
    continuations: HashSet<NodeId>,
    /// chain heads and the summed duration of their chains
    heads: HashMap<NodeId, f64>,
}
impl TieContext {
    fn collect(root: &Event) -> ScoreResult<Self> {
        let notes = match root.event_type() {
            EventType::Note => vec![root.clone()],
            _ => root.list_all(EventType::Note),
        };
        let members: HashSet<NodeId> = notes.iter().map(|note| note.id()).collect();
        let mut context = Self::default();
        for note in notes.iter() {
            if let Some(next) = note.tie() {
                if members.contains(&next.id()) {
                    context.continuations.insert(next.id());
                }
            }
        }
        for note in notes.iter() {
            if !note.is_tied() || context.continuations.contains(&note.id()) {
                continue;
            }
            let mut duration = note.duration();
            let mut current = note.clone();
            loop {
                let next = match current.tie() {
                    Some(next) => next,
                    // end of chain, or a removed continuation
                    None => {
                        current.tie_chain()?;
                        break;
                    }
                };
                if !members.contains(&next.id()) {
                    warn!(
                        "tie from {} leaves merged subtree, dropped",
                        current.describe()
                    );
                    break;
                }
                duration += next.duration();
                current = next;
            }
            debug!("merge tie chain of {}: {}", note.describe(), duration);
            context.heads.insert(note.id(), duration);
        }
        Ok(context)
    }

    fn rewrite(&self, event: &Event) -> Rewrite {
        if self.continuations.contains(&event.id()) {
            return Rewrite::Drop;
        }
        if event.event_type() == EventType::Chord {
            let content = event.content();
            let emptied = !content.is_empty()
                && content
                    .iter()
                    .all(|note| self.continuations.contains(&note.id()));
            if emptied {
                return Rewrite::Drop;
            }
        }
        Rewrite::Keep
    }
}

impl Event {
    /// Copy of the subtree, where every chain of tied notes becomes a
    /// single note.
    ///
    /// Merged note takes position of the first note of the chain and
    /// the sum of all the chain durations. Chords left without notes are
    /// removed. The copy carries no ties at all: ties leaving the
    /// subtree are dropped.
    ///
    /// Copy is inserted into `parent`, if given.
    ///
    /// # Returns
    /// - Err(TieResolution) if a note inside a chain is tied to a note,
    ///   that does not exist anymore.
    ///
    /// # Example
    /// ```
    /// use score_tree::primitives::{Event, Pitch};
    ///
    /// let first = Event::note(Pitch::from(60)).build().unwrap();
    /// let second = Event::note(Pitch::from(60)).build().unwrap();
    /// first.set_tie(Some(&second)).unwrap();
    /// let staff = Event::new_staff()
    ///     .onset(0.0)
    ///     .content([first, second])
    ///     .build()
    ///     .unwrap();
    /// let merged = staff.merge_tied_notes(None).unwrap();
    /// assert_eq!(merged.len(), 1);
    /// assert_eq!(merged.content()[0].duration(), 2.0);
    /// assert_eq!(staff.len(), 2);
    /// ```
    pub fn merge_tied_notes(&self, parent: Option<&Event>) -> ScoreResult<Event> {
        check_parent(parent)?;
        let context = TieContext::collect(self)?;
        let (copy, copies) = self.rebuild_mapped(&|event| context.rewrite(event));
        for (id, note) in copies.iter() {
            if let Some(duration) = context.heads.get(id) {
                note.set_duration(*duration);
            }
            if note.is_tied() {
                note.set_tie(None)?;
            }
        }
        adopt(copy, parent)
    }
}

/// Transforms validate `parent` before doing any work.
pub(crate) fn check_parent(parent: Option<&Event>) -> ScoreResult<()> {
    match parent {
        Some(parent) if !parent.is_group() => {
            Err(ScoreError::InvalidArgument(format!(
                "can not insert into {}",
                parent.describe()
            )))
        }
        _ => Ok(()),
    }
}

pub(crate) fn adopt(copy: Event, parent: Option<&Event>) -> ScoreResult<Event> {
    if let Some(parent) = parent {
        parent.insert(copy.clone())?;
    }
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use crate::{
        error::ScoreError,
        primitives::{Event, EventType, Pitch},
    };

    fn note(key_num: i32, duration: f64) -> Event {
        Event::note(Pitch::from(key_num))
            .duration(duration)
            .build()
            .unwrap()
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn chain_across_measures() {
        init();
        let a = note(60, 1.0);
        let b = note(60, 2.0);
        let c = note(60, 0.5);
        let other = note(64, 1.0);
        a.set_tie(Some(&b)).unwrap();
        b.set_tie(Some(&c)).unwrap();
        let staff = Event::new_staff()
            .onset(0.0)
            .child(Event::measure().content([other.clone(), a.clone()]).build().unwrap())
            .child(Event::measure().content([b.clone(), c.clone()]).build().unwrap())
            .build()
            .unwrap();
        let merged = staff.merge_tied_notes(None).unwrap();
        let notes = merged.list_all(EventType::Note);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].onset().unwrap(), 1.0);
        assert_eq!(notes[1].duration(), 3.5);
        assert!(!notes[1].is_tied());
        assert!(!merged.has_ties());
        // source is untouched
        assert_eq!(staff.list_all(EventType::Note).len(), 4);
        assert!(a.tie().unwrap().ptr_eq(&b));
        assert_eq!(a.duration(), 1.0);
    }

    #[test]
    fn emptied_chords_are_dropped() {
        init();
        let (a1, a2) = (note(60, 1.0), note(64, 1.0));
        let (b1, b2) = (note(60, 1.0), note(64, 1.0));
        a1.set_tie(Some(&b1)).unwrap();
        a2.set_tie(Some(&b2)).unwrap();
        let measure = Event::measure()
            .onset(0.0)
            .child(Event::chord().content([a1, a2]).build().unwrap())
            .child(Event::chord().content([b1, b2]).build().unwrap())
            .build()
            .unwrap();
        let merged = measure.merge_tied_notes(None).unwrap();
        assert_eq!(merged.len(), 1);
        let chord = &merged.content()[0];
        assert_eq!(chord.len(), 2);
        assert!(chord.content().iter().all(|n| n.duration() == 2.0));
    }

    #[test]
    fn ties_leaving_subtree() {
        init();
        let a = note(60, 1.0);
        let b = note(60, 1.0);
        a.set_tie(Some(&b)).unwrap();
        let m1 = Event::measure().onset(0.0).child(a).build().unwrap();
        let _m2 = Event::measure().onset(1.0).child(b).build().unwrap();
        let merged = m1.merge_tied_notes(None).unwrap();
        let head = &merged.content()[0];
        assert_eq!(head.duration(), 1.0);
        assert!(!head.is_tied());
    }

    #[test]
    fn dangling_tie_in_chain() {
        init();
        let a = note(60, 1.0);
        let b = note(60, 1.0);
        a.set_tie(Some(&b)).unwrap();
        {
            let gone = note(60, 1.0);
            b.set_tie(Some(&gone)).unwrap();
        }
        let measure = Event::measure().onset(0.0).content([a, b]).build().unwrap();
        assert!(matches!(
            measure.merge_tied_notes(None),
            Err(ScoreError::TieResolution(_))
        ));
    }

    #[test]
    fn merged_into_parent() {
        let a = note(62, 1.0);
        let b = note(62, 1.0);
        a.set_tie(Some(&b)).unwrap();
        let staff = Event::new_staff().onset(0.0).content([a, b]).build().unwrap();
        let part = Event::new_part().onset(0.0).build().unwrap();
        let merged = staff.merge_tied_notes(Some(&part)).unwrap();
        assert!(merged.parent().unwrap().ptr_eq(&part));
        assert!(staff
            .merge_tied_notes(Some(&note(60, 1.0)))
            .is_err());
    }
}
