//! EventGroup: an ordered collection of events it owns.
//!
//! There are two flavors of groups, which differ only in the default
//! layout of their content:
//! - Sequence (Measure, Staff): unresolved content goes end-to-end.
//! - Concurrence (Score, Part, Chord): unresolved content starts together
//!   with the group.
//!
//! Content is always kept ordered by onset.

use std::collections::HashMap;

use log::{debug, trace};

use super::{event::NodeId, Event, EventType, TimeMap};
use crate::error::{ScoreError, ScoreResult};

/// Default layout of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Sequence,
    Concurrence,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreData {
    pub time_map: TimeMap,
    pub units_are_seconds: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GroupKind {
    Sequence,
    Concurrence,
    Score(ScoreData),
    Part {
        number: Option<u32>,
        instrument: Option<String>,
    },
    Staff {
        number: Option<u32>,
    },
    Measure {
        number: Option<u32>,
    },
    Chord,
}
impl GroupKind {
    pub(crate) fn event_type(&self) -> EventType {
        match self {
            Self::Sequence => EventType::Sequence,
            Self::Concurrence => EventType::Concurrence,
            Self::Score(_) => EventType::Score,
            Self::Part { .. } => EventType::Part,
            Self::Staff { .. } => EventType::Staff,
            Self::Measure { .. } => EventType::Measure,
            Self::Chord => EventType::Chord,
        }
    }
    pub(crate) fn flavor(&self) -> Flavor {
        match self {
            Self::Sequence | Self::Staff { .. } | Self::Measure { .. } => {
                Flavor::Sequence
            }
            _ => Flavor::Concurrence,
        }
    }
    pub(crate) fn time_map(&self) -> Option<&TimeMap> {
        match self {
            Self::Score(score) => Some(&score.time_map),
            _ => None,
        }
    }
    pub(crate) fn label(&self) -> String {
        let number = |number: &Option<u32>| match number {
            Some(number) => format!(" {}", number),
            None => String::new(),
        };
        match self {
            Self::Sequence => "Sequence".to_string(),
            Self::Concurrence => "Concurrence".to_string(),
            Self::Score(_) => "Score".to_string(),
            Self::Part { number: n, instrument } => {
                let instrument = match instrument {
                    Some(name) => format!(" ({})", name),
                    None => String::new(),
                };
                format!("Part{}{}", number(n), instrument)
            }
            Self::Staff { number: n } => format!("Staff{}", number(n)),
            Self::Measure { number: n } => format!("Measure{}", number(n)),
            Self::Chord => "Chord".to_string(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct GroupData {
    pub kind: GroupKind,
    pub content: Vec<Event>,
}
impl GroupData {
    pub(crate) fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            content: Vec::new(),
        }
    }
}

/// What a rebuilding pass does with a child of the group being copied.
pub(crate) enum Rewrite {
    /// copy the child (rebuilding its content as well)
    Keep,
    /// leave it out
    Drop,
    /// replace the child by its content, optionally only of given types
    Lift(Option<&'static [EventType]>),
}

/// Depth-first search over the content of a group.
///
/// Yields matches in content order, and does not look inside a match.
pub struct FindAll {
    wanted: EventType,
    stack: Vec<(Event, usize)>,
}
impl Iterator for FindAll {
    type Item = Event;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (group, idx) = self.stack.last_mut()?;
            let child = group.child(*idx);
            *idx += 1;
            match child {
                None => {
                    self.stack.pop();
                }
                Some(child) => {
                    if child.is_instance_of(self.wanted) {
                        return Some(child);
                    }
                    if child.is_group() {
                        self.stack.push((child, 0));
                    }
                }
            }
        }
    }
}

impl Event {
    pub fn is_group(&self) -> bool {
        self.data().group().is_some()
    }
    pub fn flavor(&self) -> Option<Flavor> {
        self.data().group().map(|group| group.kind.flavor())
    }

    /// Handles of the content. Empty for leaf events.
    pub fn content(&self) -> Vec<Event> {
        self.data()
            .group()
            .map(|group| group.content.clone())
            .unwrap_or_default()
    }
    pub fn child(&self, idx: usize) -> Option<Event> {
        self.data()
            .group()
            .and_then(|group| group.content.get(idx).cloned())
    }
    pub fn last(&self) -> Option<Event> {
        self.data()
            .group()
            .and_then(|group| group.content.last().cloned())
    }
    pub fn len(&self) -> usize {
        self.data().group().map_or(0, |group| group.content.len())
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Onset used to lay out content: zero for unresolved groups.
    pub(crate) fn base_onset(&self) -> f64 {
        self.onset_or(0.0)
    }

    /// Insert event, taking ownership of it.
    ///
    /// Unresolved onset of the event is set by the group flavor: to the
    /// offset of the last element in Sequence, or to the group onset in
    /// Concurrence. Then event is placed to keep content ordered by
    /// onset, searching from the end. Duration of the group is never
    /// changed.
    ///
    /// # Returns
    /// - Err(OwnershipViolation) if event already has a parent, or if
    ///   it is the group itself or one of its ancestors.
    /// - Err(InvalidArgument) if self is not a group.
    ///
    /// # Example
    /// ```
    /// use score_tree::primitives::{Event, Pitch};
    ///
    /// let staff = Event::new_staff().onset(0.0).build().unwrap();
    /// let note = Event::note(Pitch::from(60)).build().unwrap();
    /// staff.insert(note.clone()).unwrap();
    /// assert!(note.parent().unwrap().ptr_eq(&staff));
    /// assert!(staff.insert(note.clone()).is_err());
    /// ```
    pub fn insert(&self, event: Event) -> ScoreResult<()> {
        self.check_insertable(&event)?;
        if !event.onset_state().is_resolved() {
            let onset = match self.flavor() {
                Some(Flavor::Sequence) => match self.last() {
                    Some(last) => last.offset_or(self.base_onset()),
                    None => self.base_onset(),
                },
                _ => self.base_onset(),
            };
            event.set_onset(onset);
        }
        trace!("insert {} into {}", event.describe(), self.describe());
        self.attach(event);
        Ok(())
    }

    pub(crate) fn check_insertable(&self, event: &Event) -> ScoreResult<()> {
        if !self.is_group() {
            return Err(ScoreError::InvalidArgument(format!(
                "can not insert into {}",
                self.describe()
            )));
        }
        if event.is_instance_of(EventType::Score) {
            return Err(ScoreError::InvalidArgument(
                "Score can not have a parent".to_string(),
            ));
        }
        if let Some(owner) = event.parent() {
            return Err(ScoreError::OwnershipViolation(format!(
                "{} already belongs to {}",
                event.describe(),
                owner.describe()
            )));
        }
        if event.ptr_eq(self) || self.has_ancestor(event) {
            return Err(ScoreError::OwnershipViolation(format!(
                "{} can not contain itself",
                event.describe()
            )));
        }
        Ok(())
    }

    /// Put event into content keeping onset order, without touching
    /// its onset. Event must be free.
    pub(crate) fn attach(&self, event: Event) {
        event.data_mut().parent = self.downgrade();
        let onset = event.onset_or(0.0);
        let mut data = self.data_mut();
        if let Some(group) = data.group_mut() {
            let content = &mut group.content;
            let mut idx = content.len();
            while idx > 0 && content[idx - 1].onset_or(0.0) > onset {
                idx -= 1;
            }
            content.insert(idx, event);
        }
    }

    /// Remove event from content, giving up ownership.
    ///
    /// # Returns
    /// The removed event, or None if it is not in content.
    pub fn remove(&self, event: &Event) -> Option<Event> {
        let removed = {
            let mut data = self.data_mut();
            let content = &mut data.group_mut()?.content;
            let idx = content.iter().position(|child| child.ptr_eq(event))?;
            content.remove(idx)
        };
        removed.data_mut().parent = Default::default();
        Some(removed)
    }

    /// Lay out content given at construction, and take ownership of it.
    ///
    /// Sequence: unresolved children (or all, if `pack`) go end-to-end
    /// from the base onset. Concurrence: they start at the base onset.
    pub(crate) fn layout_content(
        &self,
        content: Vec<Event>,
        pack: bool,
        derive_duration: bool,
    ) {
        let base = self.base_onset();
        match self.flavor() {
            Some(Flavor::Sequence) => {
                let mut cursor = base;
                for child in content.iter() {
                    if pack || !child.onset_state().is_resolved() {
                        child.place_at(cursor);
                    }
                    cursor = child.offset_or(cursor);
                }
            }
            Some(Flavor::Concurrence) => {
                for child in content.iter() {
                    if pack || !child.onset_state().is_resolved() {
                        child.place_at(base);
                    }
                }
            }
            None => return,
        }
        let end = content
            .iter()
            .map(|child| child.offset_or(base))
            .fold(base, f64::max);
        for child in content {
            self.attach(child);
        }
        if derive_duration {
            self.set_duration(end - base);
        }
    }

    /// Rearrange content to eliminate gaps, recursively.
    ///
    /// Sequences put their content end-to-end, Concurrences make it all
    /// start with the group. Duration becomes the extent of the content.
    pub fn pack(&self) {
        let onset = self.base_onset();
        self.pack_from(onset);
    }

    fn pack_from(&self, onset: f64) {
        self.data_mut().onset = onset.into();
        let flavor = match self.flavor() {
            Some(flavor) => flavor,
            None => return,
        };
        let mut cursor = onset;
        let mut end = onset;
        for child in self.content() {
            let start = match flavor {
                Flavor::Sequence => cursor,
                Flavor::Concurrence => onset,
            };
            match child.is_group() {
                true => child.pack_from(start),
                false => child.data_mut().onset = start.into(),
            }
            cursor = start + child.duration();
            end = end.max(cursor);
        }
        self.set_duration(end - onset);
    }

    /// All instances of `event_type` inside, depth-first.
    ///
    /// Search does not descend into a match, so it assumes the type is
    /// not nested into itself.
    pub fn find_all(&self, event_type: EventType) -> FindAll {
        FindAll {
            wanted: event_type,
            stack: match self.is_group() {
                true => vec![(self.clone(), 0)],
                false => Vec::new(),
            },
        }
    }
    pub fn list_all(&self, event_type: EventType) -> Vec<Event> {
        self.find_all(event_type).collect()
    }
    pub fn has_instanceof(&self, event_type: EventType) -> bool {
        self.find_all(event_type).next().is_some()
    }
    pub fn has_chords(&self) -> bool {
        self.has_instanceof(EventType::Chord)
    }
    pub fn has_measures(&self) -> bool {
        self.has_instanceof(EventType::Measure)
    }
    pub fn has_rests(&self) -> bool {
        self.has_instanceof(EventType::Rest)
    }
    pub fn has_ties(&self) -> bool {
        self.find_all(EventType::Note).any(|note| note.is_tied())
    }

    /// Call `visit` for self and every event below, parents first.
    pub(crate) fn walk(&self, visit: &mut impl FnMut(&Event)) {
        visit(self);
        for child in self.content() {
            child.walk(visit);
        }
    }

    /// Copy of the subtree, where `rule` decides the fate of every
    /// event below self. Ties inside the copy are relinked.
    pub(crate) fn rebuild_with(&self, rule: &dyn Fn(&Event) -> Rewrite) -> Event {
        self.rebuild_mapped(rule).0
    }

    /// Same as `rebuild_with`, also giving the copy of every original
    /// node that survived, by id of the original.
    pub(crate) fn rebuild_mapped(
        &self,
        rule: &dyn Fn(&Event) -> Rewrite,
    ) -> (Event, HashMap<NodeId, Event>) {
        let mut copies = HashMap::new();
        let copy = self.rebuild_into(rule, &mut copies);
        Event::relink_ties(&copies);
        (copy, copies)
    }

    fn rebuild_into(
        &self,
        rule: &dyn Fn(&Event) -> Rewrite,
        copies: &mut HashMap<NodeId, Event>,
    ) -> Event {
        let copy = self.emptycopy_detached();
        copies.insert(self.id(), copy.clone());
        for child in self.content() {
            copy.rebuild_child(&child, rule, copies);
        }
        copy
    }

    fn rebuild_child(
        &self,
        child: &Event,
        rule: &dyn Fn(&Event) -> Rewrite,
        copies: &mut HashMap<NodeId, Event>,
    ) {
        match rule(child) {
            Rewrite::Keep => self.attach(child.rebuild_into(rule, copies)),
            Rewrite::Drop => trace!("drop {}", child.describe()),
            Rewrite::Lift(types) => {
                debug!("lift content of {}", child.describe());
                for grandchild in child.content() {
                    let wanted = types.map_or(true, |types| {
                        types.iter().any(|t| grandchild.is_instance_of(*t))
                    });
                    if wanted {
                        self.rebuild_child(&grandchild, rule, copies);
                    }
                }
            }
        }
    }
}
