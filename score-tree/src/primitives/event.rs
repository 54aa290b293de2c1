//! A smallest piece of music, and the handle to every node of the tree.
//!
//! Every node (Note, Rest, signatures and all the groups) is an [Event].
//! `Event` is a cheap handle: cloning it does not copy the node. Groups
//! own their content, while the way up (parent) and the way forward
//! (tie) are weak references, so the tree never owns itself.
//!
//! # Developer Note
//! Kind-specific accessors live next to the kind: notes in `note`,
//! groups in `container`, measures and staves in `measure`. This module
//! holds the state every node shares: onset, duration, parent and the
//! property bag.

use std::{
    cell::{Ref, RefCell, RefMut},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use derivative::Derivative;

use super::{
    container::{GroupData, Rewrite},
    note::NoteData,
    KeySignature, Onset, Properties, PropertyValue, TimeSignature,
};
use crate::{
    dom::Score,
    error::{ScoreError, ScoreResult},
};

pub(crate) type NodeRef = Rc<RefCell<EventData>>;
pub(crate) type WeakRef = Weak<RefCell<EventData>>;
/// Identity of a node, valid while the node is alive.
pub(crate) type NodeId = usize;

/// Concrete node kinds, and the abstract ones they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Event,
    EventGroup,
    Sequence,
    Concurrence,
    Score,
    Part,
    Staff,
    Measure,
    Chord,
    Note,
    Rest,
    TimeSignature,
    KeySignature,
}
impl EventType {
    /// True if an event of concrete type `self` is an instance of
    /// `other`. E.g. every Measure is a Sequence, every Chord is a
    /// Concurrence.
    pub fn is_a(self, other: EventType) -> bool {
        if self == other || other == Self::Event {
            return true;
        }
        match other {
            Self::EventGroup => matches!(
                self,
                Self::Sequence
                    | Self::Concurrence
                    | Self::Score
                    | Self::Part
                    | Self::Staff
                    | Self::Measure
                    | Self::Chord
            ),
            Self::Sequence => matches!(self, Self::Staff | Self::Measure),
            Self::Concurrence => {
                matches!(self, Self::Score | Self::Part | Self::Chord)
            }
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum EventKind {
    Note(NoteData),
    Rest,
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    Group(GroupData),
}
impl EventKind {
    pub(crate) fn event_type(&self) -> EventType {
        match self {
            Self::Note(_) => EventType::Note,
            Self::Rest => EventType::Rest,
            Self::TimeSignature(_) => EventType::TimeSignature,
            Self::KeySignature(_) => EventType::KeySignature,
            Self::Group(group) => group.kind.event_type(),
        }
    }
    /// Same kind and attributes, without content.
    pub(crate) fn emptied(&self) -> Self {
        match self {
            Self::Note(note) => Self::Note(note.clone()),
            Self::Rest => Self::Rest,
            Self::TimeSignature(ts) => Self::TimeSignature(*ts),
            Self::KeySignature(ks) => Self::KeySignature(*ks),
            Self::Group(group) => Self::Group(GroupData::new(group.kind.clone())),
        }
    }
    /// Default duration of leaf events.
    pub(crate) fn default_duration(&self) -> f64 {
        match self {
            Self::Note(_) | Self::Rest => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct EventData {
    pub onset: Onset,
    pub duration: f64,
    #[derivative(Debug = "ignore")]
    pub parent: WeakRef,
    pub properties: Option<Properties>,
    pub kind: EventKind,
}
impl EventData {
    pub(crate) fn new(onset: Onset, duration: f64, kind: EventKind) -> Self {
        Self {
            onset,
            duration,
            parent: Weak::new(),
            properties: None,
            kind,
        }
    }
    pub(crate) fn group(&self) -> Option<&GroupData> {
        match &self.kind {
            EventKind::Group(group) => Some(group),
            _ => None,
        }
    }
    pub(crate) fn group_mut(&mut self) -> Option<&mut GroupData> {
        match &mut self.kind {
            EventKind::Group(group) => Some(group),
            _ => None,
        }
    }
    pub(crate) fn note(&self) -> Option<&NoteData> {
        match &self.kind {
            EventKind::Note(note) => Some(note),
            _ => None,
        }
    }
    pub(crate) fn note_mut(&mut self) -> Option<&mut NoteData> {
        match &mut self.kind {
            EventKind::Note(note) => Some(note),
            _ => None,
        }
    }
    fn label(&self) -> String {
        match &self.kind {
            EventKind::Note(note) => note.label(),
            EventKind::Rest => "Rest".to_string(),
            EventKind::TimeSignature(ts) => format!("TimeSignature {}", ts),
            EventKind::KeySignature(ks) => format!("KeySignature {}", ks),
            EventKind::Group(group) => group.kind.label(),
        }
    }
}

/// Handle to a node of the score tree.
///
/// `==` compares trees by value (onsets, durations, attributes and
/// content, never parents). Use [Event::ptr_eq] for identity.
#[derive(Clone)]
pub struct Event(pub(crate) NodeRef);

impl Event {
    pub(crate) fn from_data(data: EventData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }
    pub(crate) fn data(&self) -> Ref<'_, EventData> {
        self.0.borrow()
    }
    pub(crate) fn data_mut(&self) -> RefMut<'_, EventData> {
        self.0.borrow_mut()
    }
    pub(crate) fn id(&self) -> NodeId {
        Rc::as_ptr(&self.0) as *const () as usize
    }
    pub(crate) fn downgrade(&self) -> WeakRef {
        Rc::downgrade(&self.0)
    }
    pub(crate) fn upgrade(weak: &WeakRef) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    /// True if both handles point to the same node.
    pub fn ptr_eq(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn event_type(&self) -> EventType {
        self.data().kind.event_type()
    }
    pub fn is_instance_of(&self, event_type: EventType) -> bool {
        self.event_type().is_a(event_type)
    }

    /// Short human-readable description, used in messages.
    pub fn describe(&self) -> String {
        let data = self.data();
        format!("{} at {}", data.label(), data.onset)
    }

    /// Onset in quarters (or seconds after conversion).
    ///
    /// # Returns
    /// Err if the event was never placed: neither built with onset, nor
    /// inserted into a group.
    pub fn onset(&self) -> ScoreResult<f64> {
        self.data()
            .onset
            .get()
            .ok_or_else(|| ScoreError::UnresolvedOnset(self.describe()))
    }
    pub fn onset_state(&self) -> Onset {
        self.data().onset
    }
    pub fn offset(&self) -> ScoreResult<f64> {
        Ok(self.onset()? + self.duration())
    }
    /// Onset, counting unresolved one as `default`.
    pub(crate) fn onset_or(&self, default: f64) -> f64 {
        self.data().onset.or(default)
    }
    pub(crate) fn offset_or(&self, default: f64) -> f64 {
        let data = self.data();
        data.onset.or(default) + data.duration
    }
    pub fn duration(&self) -> f64 {
        self.data().duration
    }
    pub fn set_duration(&self, duration: f64) {
        self.data_mut().duration = duration;
    }

    /// Set onset of the event.
    ///
    /// The first time a group gets resolved, all its content is moved
    /// by the assigned value: content of an unresolved group is laid
    /// out from zero. Any later assignment moves only the group itself.
    ///
    /// # Example
    /// ```
    /// use score_tree::primitives::{Event, Pitch};
    ///
    /// let seq = Event::sequence()
    ///     .child(Event::note(Pitch::from(60)).build().unwrap())
    ///     .child(Event::note(Pitch::from(62)).build().unwrap())
    ///     .build()
    ///     .unwrap();
    /// assert!(seq.onset().is_err());
    /// seq.set_onset(5.0);
    /// let onsets: Vec<f64> =
    ///     seq.content().iter().map(|n| n.onset().unwrap()).collect();
    /// assert_eq!(onsets, vec![5.0, 6.0]);
    /// seq.set_onset(10.0);
    /// assert_eq!(seq.content()[0].onset().unwrap(), 5.0);
    /// ```
    pub fn set_onset(&self, onset: f64) {
        let shift_content = {
            let data = self.data();
            !data.onset.is_resolved() && data.group().is_some()
        };
        if shift_content {
            for child in self.content() {
                child.time_shift(onset);
            }
        }
        self.data_mut().onset = Onset::Resolved(onset);
    }

    /// Move the event and everything inside it by `increment`.
    ///
    /// Unresolved events stay unresolved: they will be placed relative
    /// to their parent later.
    pub fn time_shift(&self, increment: f64) {
        let resolved = {
            let mut data = self.data_mut();
            match data.onset {
                Onset::Resolved(value) => {
                    data.onset = Onset::Resolved(value + increment);
                    true
                }
                Onset::Unresolved => false,
            }
        };
        if resolved {
            for child in self.content() {
                child.time_shift(increment);
            }
        }
    }

    /// Put the event (with its content) at `onset`.
    pub(crate) fn place_at(&self, onset: f64) {
        match self.onset_state() {
            Onset::Resolved(current) => self.time_shift(onset - current),
            Onset::Unresolved => self.set_onset(onset),
        }
    }

    pub fn parent(&self) -> Option<Event> {
        Self::upgrade(&self.data().parent)
    }
    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// The closest ancestor (never self) of the given type.
    pub fn ancestor(&self, event_type: EventType) -> Option<Event> {
        let mut current = self.parent();
        while let Some(event) = current {
            if event.is_instance_of(event_type) {
                return Some(event);
            }
            current = event.parent();
        }
        None
    }
    pub fn part(&self) -> Option<Event> {
        self.ancestor(EventType::Part)
    }
    pub fn staff(&self) -> Option<Event> {
        self.ancestor(EventType::Staff)
    }
    pub fn score(&self) -> Option<Score> {
        self.ancestor(EventType::Score).map(Score::wrap)
    }
    /// Topmost ancestor, or self, if it has no parent.
    pub fn root(&self) -> Event {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
    /// True if `other` is somewhere above self.
    pub fn has_ancestor(&self, other: &Event) -> bool {
        let mut current = self.parent();
        while let Some(event) = current {
            if event.ptr_eq(other) {
                return true;
            }
            current = event.parent();
        }
        false
    }

    pub fn properties(&self) -> Option<Properties> {
        self.data().properties.clone()
    }
    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        self.data()
            .properties
            .as_ref()
            .and_then(|props| props.get(key).cloned())
    }
    pub fn set_property(
        &self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) {
        self.data_mut()
            .properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
    }
    pub fn remove_property(&self, key: &str) -> Option<PropertyValue> {
        self.data_mut()
            .properties
            .as_mut()
            .and_then(|props| props.remove(key))
    }

    /// Same kind, attributes, onset and duration; no content, no parent.
    pub(crate) fn emptycopy_detached(&self) -> Event {
        let data = self.data();
        let mut copy =
            EventData::new(data.onset, data.duration, data.kind.emptied());
        copy.properties = data.properties.clone();
        Self::from_data(copy)
    }

    /// Clone of the node with identical group attributes but no
    /// content. Inserted into `parent`, if given.
    pub fn emptycopy(&self, parent: Option<&Event>) -> ScoreResult<Event> {
        let copy = self.emptycopy_detached();
        if let Some(parent) = parent {
            parent.insert(copy.clone())?;
        }
        Ok(copy)
    }

    /// Copy of the whole subtree, with no parent.
    ///
    /// Ties between notes of the subtree point to their copies, ties
    /// leaving the subtree still point to the original notes.
    pub(crate) fn deep_copy(&self) -> Event {
        self.rebuild_with(&|_| Rewrite::Keep)
    }

    /// Deep copy of the subtree. Inserted into `parent`, if given.
    ///
    /// Parent is a weak link, so nothing above self is copied.
    pub fn copy(&self, parent: Option<&Event>) -> ScoreResult<Event> {
        let copy = self.deep_copy();
        if let Some(parent) = parent {
            parent.insert(copy.clone())?;
        }
        Ok(copy)
    }

    /// Point ties of copied notes to the copies of their targets.
    pub(crate) fn relink_ties(copies: &HashMap<NodeId, Event>) {
        for copy in copies.values() {
            let target = match copy.tie() {
                Some(target) => target,
                None => continue,
            };
            if let Some(new_target) = copies.get(&target.id()) {
                if let Some(note) = copy.data_mut().note_mut() {
                    note.tie = Some(new_target.downgrade());
                }
            }
        }
    }

    fn fmt_indented(
        &self,
        f: &mut fmt::Formatter<'_>,
        indent: usize,
    ) -> fmt::Result {
        {
            let data = self.data();
            write!(
                f,
                "{:indent$}{} at {} duration {:.3}",
                "",
                data.label(),
                data.onset,
                data.duration,
                indent = indent
            )?;
            if let Some(props) = &data.properties {
                let rendered: Vec<String> = props
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect();
                write!(f, " {{{}}}", rendered.join(", "))?;
            }
            writeln!(f)?;
            if let Some(group) = data.group() {
                if let Some(time_map) = group.kind.time_map() {
                    writeln!(f, "{:indent$}{}", "", time_map, indent = indent + 4)?;
                }
            }
        }
        for child in self.content() {
            child.fmt_indented(f, indent + 4)?;
        }
        Ok(())
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (self.data(), other.data());
        a.onset == b.onset
            && a.duration == b.duration
            && a.properties == b.properties
            && a.kind == b.kind
    }
}
impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f.debug_tuple("Event").field(&*data).finish(),
            Err(_) => f.write_str("Event(<borrowed>)"),
        }
    }
}
/// Indented dump of the whole subtree.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
