//! Constructors of every node kind.
//!
//! Each constructor returns an [EventBuilder]. Optional arguments
//! (onset, duration, content, parent) are set by chained calls, and
//! [EventBuilder::build] validates all of them before anything is
//! created or inserted. So, failed build never leaves the tree changed.
//!
//! # Example
//! ```
//! use score_tree::primitives::{Event, Pitch};
//!
//! let part = Event::new_part().onset(0.0).build().unwrap();
//! let measure = Event::measure()
//!     .number(1)
//!     .child(Event::note(Pitch::from(60)).duration(2.0).build().unwrap())
//!     .child(Event::rest().build().unwrap())
//!     .parent(&part)
//!     .build()
//!     .unwrap();
//! assert_eq!(measure.duration(), 3.0);
//! assert_eq!(measure.content()[1].onset().unwrap(), 2.0);
//! assert!(measure.parent().unwrap().ptr_eq(&part));
//! ```

use std::collections::HashSet;

use log::trace;

use super::{
    container::{GroupData, GroupKind, ScoreData},
    event::{EventData, EventKind},
    note::NoteData,
    Event, EventType, KeySignature, Onset, Pitch, Properties, PropertyValue,
    TimeMap, TimeSignature,
};
use crate::{
    dom::Score,
    error::{ScoreError, ScoreResult},
};

/// Collects optional arguments of a node, see module docs.
#[derive(Debug)]
pub struct EventBuilder {
    kind: EventKind,
    onset: Onset,
    duration: Option<f64>,
    content: Vec<Event>,
    pack: bool,
    parent: Option<Event>,
    properties: Option<Properties>,
    misuse: Option<String>,
}

impl Event {
    pub fn note(pitch: impl Into<Pitch>) -> EventBuilder {
        EventBuilder::new(EventKind::Note(NoteData::new(pitch.into())))
    }
    pub fn rest() -> EventBuilder {
        EventBuilder::new(EventKind::Rest)
    }
    pub fn time_signature(time_signature: TimeSignature) -> EventBuilder {
        EventBuilder::new(EventKind::TimeSignature(time_signature))
    }
    pub fn key_signature(key_signature: KeySignature) -> EventBuilder {
        EventBuilder::new(EventKind::KeySignature(key_signature))
    }
    /// Generic Sequence group.
    pub fn sequence() -> EventBuilder {
        EventBuilder::group(GroupKind::Sequence)
    }
    /// Generic Concurrence group.
    pub fn concurrence() -> EventBuilder {
        EventBuilder::group(GroupKind::Concurrence)
    }
    pub fn chord() -> EventBuilder {
        EventBuilder::group(GroupKind::Chord)
    }
    pub fn measure() -> EventBuilder {
        EventBuilder::group(GroupKind::Measure { number: None })
    }
    /// Staff group; [Event::staff] is the ancestor lookup.
    pub fn new_staff() -> EventBuilder {
        EventBuilder::group(GroupKind::Staff { number: None })
    }
    /// Part group; [Event::part] is the ancestor lookup.
    pub fn new_part() -> EventBuilder {
        EventBuilder::group(GroupKind::Part {
            number: None,
            instrument: None,
        })
    }
}

impl Score {
    /// Score starts at zero with 100 bpm TimeMap, unless told else.
    pub fn builder() -> EventBuilder {
        EventBuilder::group(GroupKind::Score(ScoreData {
            time_map: TimeMap::default(),
            units_are_seconds: false,
        }))
        .onset(0.0)
    }
}

impl EventBuilder {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            onset: Onset::Unresolved,
            duration: None,
            content: Vec::new(),
            pack: false,
            parent: None,
            properties: None,
            misuse: None,
        }
    }
    fn group(kind: GroupKind) -> Self {
        Self::new(EventKind::Group(GroupData::new(kind)))
    }

    fn misused(mut self, what: &str) -> Self {
        let kind = self.kind.event_type();
        self.misuse
            .get_or_insert_with(|| format!("{:?} has no {}", kind, what));
        self
    }

    pub fn onset(mut self, onset: f64) -> Self {
        self.onset = Onset::Resolved(onset);
        self
    }
    /// Without explicit duration, leaves take the default (1 quarter
    /// for Note and Rest, 0 for signatures), and groups take the
    /// extent of their content.
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
    /// Append events to the content.
    pub fn content(mut self, content: impl IntoIterator<Item = Event>) -> Self {
        self.content.extend(content);
        self
    }
    pub fn child(mut self, event: Event) -> Self {
        self.content.push(event);
        self
    }
    /// Reposition all the content by the group flavor, not only
    /// the unresolved events.
    pub fn pack(mut self, pack: bool) -> Self {
        self.pack = pack;
        self
    }
    /// Insert built event into `parent`.
    pub fn parent(mut self, parent: &Event) -> Self {
        self.parent = Some(parent.clone());
        self
    }
    pub fn property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }

    /// Number of Part, Staff or Measure.
    pub fn number(mut self, value: u32) -> Self {
        match &mut self.kind {
            EventKind::Group(GroupData {
                kind:
                    GroupKind::Part { number, .. }
                    | GroupKind::Staff { number }
                    | GroupKind::Measure { number },
                ..
            }) => {
                *number = Some(value);
                self
            }
            _ => self.misused("number"),
        }
    }
    pub fn instrument(mut self, name: impl Into<String>) -> Self {
        match &mut self.kind {
            EventKind::Group(GroupData {
                kind: GroupKind::Part { instrument, .. },
                ..
            }) => {
                *instrument = Some(name.into());
                self
            }
            _ => self.misused("instrument"),
        }
    }
    pub fn dynamic(mut self, dynamic: impl Into<String>) -> Self {
        match &mut self.kind {
            EventKind::Note(note) => {
                note.dynamic = Some(dynamic.into());
                self
            }
            _ => self.misused("dynamic"),
        }
    }
    pub fn lyric(mut self, lyric: impl Into<String>) -> Self {
        match &mut self.kind {
            EventKind::Note(note) => {
                note.lyric = Some(lyric.into());
                self
            }
            _ => self.misused("lyric"),
        }
    }
    pub fn time_map(mut self, time_map: TimeMap) -> Self {
        match &mut self.kind {
            EventKind::Group(GroupData {
                kind: GroupKind::Score(score),
                ..
            }) => {
                score.time_map = time_map;
                self
            }
            _ => self.misused("time map"),
        }
    }

    fn validate(&self) -> ScoreResult<()> {
        if let Some(misuse) = &self.misuse {
            return Err(ScoreError::InvalidArgument(misuse.clone()));
        }
        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ScoreError::InvalidArgument(format!(
                    "duration must be non-negative, got {}",
                    duration
                )));
            }
        }
        if !self.kind.is_group() && !self.content.is_empty() {
            return Err(ScoreError::InvalidArgument(format!(
                "{:?} can not have content",
                self.kind.event_type()
            )));
        }
        let mut seen = HashSet::new();
        for child in self.content.iter() {
            if child.is_instance_of(EventType::Score) {
                return Err(ScoreError::InvalidArgument(
                    "Score can not have a parent".to_string(),
                ));
            }
            if let Some(owner) = child.parent() {
                return Err(ScoreError::OwnershipViolation(format!(
                    "{} already belongs to {}",
                    child.describe(),
                    owner.describe()
                )));
            }
            if !seen.insert(child.id()) {
                return Err(ScoreError::OwnershipViolation(format!(
                    "{} is given twice",
                    child.describe()
                )));
            }
        }
        if let Some(parent) = &self.parent {
            if matches!(self.kind, EventKind::Group(GroupData {
                kind: GroupKind::Score(_),
                ..
            })) {
                return Err(ScoreError::InvalidArgument(
                    "Score can not have a parent".to_string(),
                ));
            }
            if !parent.is_group() {
                return Err(ScoreError::InvalidArgument(format!(
                    "can not insert into {}",
                    parent.describe()
                )));
            }
            let root = parent.root();
            if self.content.iter().any(|child| child.ptr_eq(&root)) {
                return Err(ScoreError::OwnershipViolation(format!(
                    "{} can not contain itself",
                    parent.describe()
                )));
            }
        }
        Ok(())
    }

    /// Create the event, lay out its content and insert it to parent.
    pub fn build(self) -> ScoreResult<Event> {
        self.validate()?;
        let is_group = self.kind.is_group();
        let duration = self
            .duration
            .unwrap_or_else(|| self.kind.default_duration());
        let mut data = EventData::new(self.onset, duration, self.kind);
        data.properties = self.properties;
        let event = Event::from_data(data);
        if is_group {
            event.layout_content(self.content, self.pack, self.duration.is_none());
        }
        trace!("built {}", event.describe());
        if let Some(parent) = self.parent {
            parent.insert(event.clone())?;
        }
        Ok(event)
    }

    /// Build, and wrap into typed [Score] handle.
    ///
    /// # Returns
    /// Err(InvalidArgument) if the builder is not for a Score.
    pub fn build_score(self) -> ScoreResult<Score> {
        Score::try_from(self.build()?)
    }
}

impl EventKind {
    pub(crate) fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}
