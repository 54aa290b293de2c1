//! Score level of the tree.
//!
//! [Score] is a typed handle to the root [Event]: everything an Event
//! can do is available through `Deref`, and Score adds the TimeMap
//! and the whole-score transformations: flattening and collapsing of
//! parts into a plain list of notes, which is what most analysis
//! consumes.

use std::{collections::HashMap, fmt, ops::Deref};

use itertools::Itertools;
use log::{debug, warn};

use crate::{
    error::{ScoreError, ScoreResult},
    primitives::{
        container::{GroupData, GroupKind, Rewrite, ScoreData},
        event::{EventData, EventKind, NodeId},
        Event, EventType, Onset, Pitch, TimeMap,
    },
};

pub mod ties;
pub mod transform;

/// Choice of a Part or a Staff in [Score::collapse_parts].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// zero-based position among parts (or staves of a part)
    Index(usize),
    /// `number` attribute
    Number(u32),
    /// instrument of a Part
    Name(String),
}
impl Selector {
    fn matches(&self, idx: usize, event: &Event) -> bool {
        match self {
            Self::Index(index) => *index == idx,
            Self::Number(number) => event.number() == Some(*number),
            Self::Name(name) => event.instrument().as_deref() == Some(name.as_str()),
        }
    }
}

/// How [Score::from_melody_with] places the notes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spacing<'a> {
    /// each note starts where the previous ends
    Legato,
    /// inter-onset intervals, one less than notes
    Iois(&'a [f64]),
    /// onset of every note
    Onsets(&'a [f64]),
}

/// Root of the tree, the only event without parent which owns a
/// [TimeMap].
#[derive(Clone, Debug, PartialEq)]
pub struct Score(Event);

impl Deref for Score {
    type Target = Event;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl TryFrom<Event> for Score {
    type Error = ScoreError;
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        if event.event_type() != EventType::Score {
            return Err(ScoreError::InvalidArgument(format!(
                "{} is not a Score",
                event.describe()
            )));
        }
        Ok(Self(event))
    }
}
impl From<Score> for Event {
    fn from(score: Score) -> Self {
        score.0
    }
}
impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Score {
    /// Empty score at zero, with 100 bpm TimeMap.
    pub fn new() -> Self {
        Self::with_time_map(TimeMap::default())
    }
    pub fn with_time_map(time_map: TimeMap) -> Self {
        Self(Event::from_data(EventData::new(
            Onset::Resolved(0.0),
            0.0,
            EventKind::Group(GroupData::new(GroupKind::Score(ScoreData {
                time_map,
                units_are_seconds: false,
            }))),
        )))
    }
    /// Caller guarantees that event is a Score.
    pub(crate) fn wrap(event: Event) -> Self {
        Self(event)
    }
    pub fn event(&self) -> &Event {
        &self.0
    }

    fn score_data<R>(&self, f: impl FnOnce(&ScoreData) -> R) -> R {
        match &self.0.data().kind {
            EventKind::Group(GroupData {
                kind: GroupKind::Score(score),
                ..
            }) => f(score),
            // Score handles are created only around Score nodes.
            _ => f(&ScoreData {
                time_map: TimeMap::default(),
                units_are_seconds: false,
            }),
        }
    }
    fn score_data_mut(&self, f: impl FnOnce(&mut ScoreData)) {
        if let EventKind::Group(GroupData {
            kind: GroupKind::Score(score),
            ..
        }) = &mut self.0.data_mut().kind
        {
            f(score)
        }
    }

    pub fn time_map(&self) -> TimeMap {
        self.score_data(|score| score.time_map.clone())
    }
    pub fn set_time_map(&self, time_map: TimeMap) {
        self.score_data_mut(|score| score.time_map = time_map);
    }
    /// See [TimeMap::append_beat_tempo].
    pub fn append_beat_tempo(&self, beat: f64, bpm: f64) -> ScoreResult<()> {
        let mut result = Ok(());
        self.score_data_mut(|score| {
            result = score.time_map.append_beat_tempo(beat, bpm)
        });
        result
    }
    pub fn beat_to_time(&self, beat: f64) -> f64 {
        self.score_data(|score| score.time_map.beat_to_time(beat))
    }
    pub fn time_to_beat(&self, time: f64) -> f64 {
        self.score_data(|score| score.time_map.time_to_beat(time))
    }
    /// True after [Score::convert_to_seconds].
    pub fn units_are_seconds(&self) -> bool {
        self.score_data(|score| score.units_are_seconds)
    }

    /// Monophonic score: one Part of notes, each starting where the
    /// previous one ends. Single duration is used for all the notes.
    ///
    /// # Example
    /// ```
    /// use score_tree::dom::Score;
    ///
    /// let score = Score::from_melody([60, 62, 64], &[1.0]).unwrap();
    /// assert_eq!(score.part_count(), 1);
    /// assert_eq!(score.duration(), 3.0);
    /// ```
    pub fn from_melody<P: Into<Pitch>>(
        pitches: impl IntoIterator<Item = P>,
        durations: &[f64],
    ) -> ScoreResult<Self> {
        Self::from_melody_with(pitches, durations, Spacing::Legato)
    }

    /// Monophonic score with explicit spacing of notes.
    ///
    /// # Returns
    /// Err(InvalidArgument) if lengths of lists do not match, or if any
    /// note ends after the next one starts.
    pub fn from_melody_with<P: Into<Pitch>>(
        pitches: impl IntoIterator<Item = P>,
        durations: &[f64],
        spacing: Spacing,
    ) -> ScoreResult<Self> {
        let pitches: Vec<Pitch> = pitches.into_iter().map(Into::into).collect();
        let count = pitches.len();
        let durations: Vec<f64> = match durations.len() {
            1 => vec![durations[0]; count],
            n if n == count => durations.to_vec(),
            n => {
                return Err(ScoreError::InvalidArgument(format!(
                    "{} durations for {} pitches",
                    n, count
                )))
            }
        };
        let onsets: Vec<f64> = match spacing {
            Spacing::Onsets(onsets) => {
                if onsets.len() != count {
                    return Err(ScoreError::InvalidArgument(format!(
                        "{} onsets for {} pitches",
                        onsets.len(),
                        count
                    )));
                }
                onsets.to_vec()
            }
            Spacing::Legato => iois_to_onsets(&durations[..count.saturating_sub(1)]),
            Spacing::Iois(iois) => {
                if iois.len() != count.saturating_sub(1) {
                    return Err(ScoreError::InvalidArgument(format!(
                        "{} inter-onset intervals for {} pitches",
                        iois.len(),
                        count
                    )));
                }
                iois_to_onsets(iois)
            }
        };
        for idx in 1..count {
            let end = onsets[idx - 1] + durations[idx - 1];
            if end > onsets[idx] {
                return Err(ScoreError::InvalidArgument(format!(
                    "Notes overlap: note {} ends at {:.2} but note {} starts at {:.2}",
                    idx - 1,
                    end,
                    idx,
                    onsets[idx]
                )));
            }
        }

        let score = Self::new();
        let part = Event::new_part().onset(0.0).parent(&score).build()?;
        let mut end = 0.0_f64;
        for ((pitch, onset), duration) in pitches.into_iter().zip(onsets).zip(durations) {
            Event::note(pitch)
                .onset(onset)
                .duration(duration)
                .parent(&part)
                .build()?;
            end = end.max(onset + duration);
        }
        part.set_duration(end);
        score.set_duration(end);
        Ok(score)
    }

    /// Deep copy of the whole score.
    pub fn copy(&self) -> Self {
        Self(self.0.deep_copy())
    }

    pub fn parts(&self) -> Vec<Event> {
        self.content()
            .into_iter()
            .filter(|event| event.event_type() == EventType::Part)
            .collect()
    }
    pub fn part_count(&self) -> usize {
        self.parts().len()
    }

    /// Units which hold independent note sequences.
    ///
    /// Staves of every Part, or the Part itself if it has no staves
    /// (e.g. after flattening).
    pub fn note_containers(&self) -> Vec<Event> {
        let mut containers = Vec::new();
        for part in self.parts() {
            match part.child(0) {
                Some(first) if first.event_type() == EventType::Staff => containers.extend(
                    part.content()
                        .into_iter()
                        .filter(|event| event.event_type() == EventType::Staff),
                ),
                _ => containers.push(part),
            }
        }
        containers
    }

    /// True if Score contains only Parts, and Parts contain only Notes.
    pub fn is_flat(&self) -> bool {
        self.content().iter().all(|part| {
            part.event_type() == EventType::Part
                && part
                    .content()
                    .iter()
                    .all(|event| event.event_type() == EventType::Note)
        })
    }
    /// Flat Score with a single Part.
    pub fn is_flat_and_collapsed(&self) -> bool {
        self.part_count() == 1 && self.is_flat()
    }

    pub fn merge_tied_notes(&self) -> ScoreResult<Self> {
        Ok(Self(self.0.merge_tied_notes(None)?))
    }
    pub fn expand_chords(&self) -> ScoreResult<Self> {
        Ok(Self(self.0.expand_chords(None)?))
    }
    pub fn remove_rests(&self) -> ScoreResult<Self> {
        Ok(Self(self.0.remove_rests(None)?))
    }
    pub fn remove_measures(&self) -> ScoreResult<Self> {
        Ok(Self(self.0.remove_measures(None)?))
    }

    /// Copy of the score with tied notes merged, where Parts contain
    /// only Notes.
    ///
    /// If `collapse`, all the notes go into a single new Part, ordered
    /// by onset, and by pitch from high to low within one onset.
    ///
    /// # Example
    /// ```
    /// use score_tree::{dom::Score, primitives::Event};
    ///
    /// let score = Score::from_melody([60, 62, 64], &[1.0]).unwrap();
    /// Event::new_part()
    ///     .child(Event::note(72).duration(3.0).build().unwrap())
    ///     .parent(&score)
    ///     .build()
    ///     .unwrap();
    /// let flat = score.flatten(true).unwrap();
    /// assert!(flat.is_flat_and_collapsed());
    /// let keys: Vec<f64> = flat.parts()[0]
    ///     .content()
    ///     .iter()
    ///     .map(|note| note.key_num().unwrap())
    ///     .collect();
    /// assert_eq!(keys, vec![72.0, 60.0, 62.0, 64.0]);
    /// ```
    pub fn flatten(&self, collapse: bool) -> ScoreResult<Self> {
        let merged = self.0.merge_tied_notes(None)?;
        Ok(Self(flatten_merged(&merged, collapse)?))
    }

    /// Flat score with a single Part, made from selected parts and
    /// staves.
    ///
    /// Without `part` every Part is taken, without `staff` every Staff
    /// of the selected Parts. Parts left empty are skipped. If
    /// `has_ties`, tied notes are merged inside the selection.
    ///
    /// # Returns
    /// Err(InvalidArgument) if staves are selected in a Part, which
    /// has no staves, or if staff is selected by name.
    pub fn collapse_parts(
        &self,
        part: Option<&Selector>,
        staff: Option<&Selector>,
        has_ties: bool,
    ) -> ScoreResult<Self> {
        if let Some(Selector::Name(name)) = staff {
            return Err(ScoreError::InvalidArgument(format!(
                "staves have no name, got {}",
                name
            )));
        }
        let mut selected = Vec::new();
        for (idx, candidate) in self.parts().into_iter().enumerate() {
            if !part.map_or(true, |selector| selector.matches(idx, &candidate)) {
                continue;
            }
            if let (Some(_), Some(first)) = (staff, candidate.child(0)) {
                if first.event_type() != EventType::Staff {
                    return Err(ScoreError::InvalidArgument(format!(
                        "Expected {} to contain Staff",
                        candidate.describe()
                    )));
                }
            }
            selected.push(candidate.id());
        }
        let rule = |event: &Event| {
            match event.event_type() {
                EventType::Part if !selected.contains(&event.id()) => Rewrite::Drop,
                EventType::Staff => {
                    let (selector, part) = match (staff, event.parent()) {
                        (Some(selector), Some(part)) => (selector, part),
                        _ => return Rewrite::Keep,
                    };
                    let idx = part
                        .content()
                        .iter()
                        .filter(|e| e.event_type() == EventType::Staff)
                        .position(|e| e.ptr_eq(event));
                    match idx {
                        Some(idx) if selector.matches(idx, event) => Rewrite::Keep,
                        _ => Rewrite::Drop,
                    }
                }
                _ => Rewrite::Keep,
            }
        };
        let selection = self.0.rebuild_with(&rule);
        for emptied in selection.content() {
            if emptied.event_type() == EventType::Part && emptied.is_empty() {
                selection.remove(&emptied);
            }
        }
        debug!("collapse {} parts", selection.len());
        let merged = match has_ties {
            true => selection.merge_tied_notes(None)?,
            false => selection,
        };
        Ok(Self(flatten_merged(&merged, true)?))
    }

    /// Copy with all onsets and durations converted to seconds.
    pub fn convert_to_seconds(&self) -> Self {
        self.convert_units(true)
    }
    /// Copy with all onsets and durations converted to quarters.
    pub fn convert_to_quarters(&self) -> Self {
        self.convert_units(false)
    }

    fn convert_units(&self, to_seconds: bool) -> Self {
        let copy = self.copy();
        if self.units_are_seconds() == to_seconds {
            return copy;
        }
        let time_map = self.time_map();
        let convert = |value: f64| match to_seconds {
            true => time_map.beat_to_time(value),
            false => time_map.time_to_beat(value),
        };
        copy.0.walk(&mut |event| {
            let mut data = event.data_mut();
            let start = data.onset.or(0.0);
            let end = start + data.duration;
            let new_start = convert(start);
            if data.onset.is_resolved() {
                data.onset = Onset::Resolved(new_start);
            }
            data.duration = convert(end) - new_start;
        });
        copy.score_data_mut(|score| score.units_are_seconds = to_seconds);
        debug!(
            "converted score to {}",
            if to_seconds { "seconds" } else { "quarters" }
        );
        copy
    }
}

fn iois_to_onsets(iois: &[f64]) -> Vec<f64> {
    let mut onsets = vec![0.0];
    let mut current = 0.0;
    for ioi in iois {
        current += ioi;
        onsets.push(current);
    }
    onsets
}

/// Copy notes of a tree without ties into flat parts.
fn flatten_merged(merged: &Event, collapse: bool) -> ScoreResult<Event> {
    let score = merged.emptycopy_detached();
    let mut copies = HashMap::new();
    let mut copy_note = |note: &Event| {
        let copy = note.emptycopy_detached();
        copies.insert(note.id(), copy.clone());
        copy
    };
    if collapse {
        let base = score.base_onset();
        let part = Event::new_part().onset(base).build()?;
        let notes = merged
            .find_all(EventType::Note)
            .sorted_by(|a, b| {
                a.onset_or(base)
                    .total_cmp(&b.onset_or(base))
                    .then_with(|| b.pitch().cmp(&a.pitch()))
            })
            .collect_vec();
        let mut end = base;
        for note in notes.iter() {
            let copy = copy_note(note);
            end = end.max(copy.offset_or(base));
            part.attach(copy);
        }
        part.set_duration(end - base);
        score.set_duration(end - base);
        score.attach(part);
    } else {
        for source in merged.content() {
            if source.event_type() != EventType::Part {
                debug!("flatten skips {}", source.describe());
                continue;
            }
            let part = source.emptycopy_detached();
            for note in source.find_all(EventType::Note) {
                part.attach(copy_note(&note));
            }
            score.attach(part);
        }
    }
    confine_ties(&copies)?;
    Ok(score)
}

/// Relink ties of copied notes to the copies, drop all the rest.
fn confine_ties(copies: &HashMap<NodeId, Event>) -> ScoreResult<()> {
    Event::relink_ties(copies);
    for copy in copies.values() {
        let inside = match copy.tie() {
            None => continue,
            Some(target) => copies.values().any(|other| other.ptr_eq(&target)),
        };
        if !inside {
            warn!("tie of {} leaves flattened score, dropped", copy.describe());
            copy.set_tie(None)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use once_cell::sync::OnceCell;

    use super::{flatten_merged, Score, Selector, Spacing};
    use crate::{
        error::ScoreError,
        primitives::{Event, EventType, MapBeat, Pitch, TimeMap},
    };

    static TIME_MAP: OnceCell<TimeMap> = OnceCell::new();

    fn get_time_map() -> TimeMap {
        TIME_MAP
            .get_or_init(|| {
                TimeMap::from_breakpoints(
                    [MapBeat::new(4.0, 4.0), MapBeat::new(8.0, 6.0)],
                    Some(30.0),
                )
                .unwrap()
            })
            .clone()
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn note(key_num: i32, duration: f64) -> Event {
        Event::note(Pitch::from(key_num))
            .duration(duration)
            .build()
            .unwrap()
    }

    /// Score with a piano Part of two staves and a violin Part.
    fn piano_and_violin() -> Score {
        let score = Score::new();
        let piano = Event::new_part()
            .number(1)
            .instrument("Piano")
            .parent(&score)
            .build()
            .unwrap();
        let tied = note(67, 2.0);
        let continuation = note(67, 2.0);
        tied.set_tie(Some(&continuation)).unwrap();
        Event::new_staff()
            .number(1)
            .child(Event::measure().content([note(72, 2.0), tied]).build().unwrap())
            .child(
                Event::measure()
                    .content([continuation, note(76, 2.0)])
                    .build()
                    .unwrap(),
            )
            .parent(&piano)
            .build()
            .unwrap();
        Event::new_staff()
            .number(2)
            .child(
                Event::measure()
                    .child(
                        Event::chord()
                            .content([note(48, 4.0), note(55, 4.0)])
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .child(Event::measure().child(note(43, 4.0)).build().unwrap())
            .parent(&piano)
            .build()
            .unwrap();
        Event::new_part()
            .number(2)
            .instrument("Violin")
            .child(
                Event::new_staff()
                    .child(
                        Event::measure()
                            .content([Event::rest().duration(3.0).build().unwrap(), note(79, 1.0)])
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .parent(&score)
            .build()
            .unwrap();
        score
    }

    fn keys(part: &Event) -> Vec<f64> {
        part.content()
            .iter()
            .map(|n| n.key_num().unwrap())
            .collect()
    }

    #[test]
    fn structure_queries() {
        init();
        let score = piano_and_violin();
        assert_eq!(score.part_count(), 2);
        assert!(score.is_measured());
        assert!(!score.is_flat());
        assert_eq!(score.note_containers().len(), 3);
        let melody = Score::from_melody([60, 62], &[1.0]).unwrap();
        assert!(melody.is_flat_and_collapsed());
        assert_eq!(melody.note_containers().len(), 1);
        assert!(!melody.is_measured());
    }

    #[test]
    fn flatten_keeps_parts() {
        init();
        let score = piano_and_violin();
        let flat = score.flatten(false).unwrap();
        assert!(flat.is_flat());
        assert!(!flat.is_flat_and_collapsed());
        let parts = flat.parts();
        assert_eq!(parts[0].instrument(), Some("Piano".to_string()));
        assert_eq!(keys(&parts[0]), vec![72.0, 48.0, 55.0, 67.0, 43.0, 76.0]);
        let merged = &parts[0].content()[3];
        assert_eq!(merged.onset().unwrap(), 2.0);
        assert_eq!(merged.duration(), 4.0);
        assert_eq!(keys(&parts[1]), vec![79.0]);
        // source untouched
        assert!(score.has_ties());
    }

    #[test]
    fn flatten_collapse() {
        init();
        let score = piano_and_violin();
        let flat = score.flatten(true).unwrap();
        assert!(flat.is_flat_and_collapsed());
        let part = &flat.parts()[0];
        assert_eq!(
            keys(part),
            vec![72.0, 55.0, 48.0, 67.0, 79.0, 43.0, 76.0]
        );
        assert_eq!(part.duration(), 8.0);
        assert_eq!(flat.duration(), 8.0);
        assert_eq!(flat.flatten(true).unwrap(), flat);
        assert!(!flat.has_ties());
    }

    #[test]
    fn collapse_parts() {
        init();
        let score = piano_and_violin();
        let violin = score
            .collapse_parts(Some(&Selector::Name("Violin".to_string())), None, true)
            .unwrap();
        assert_eq!(keys(&violin.parts()[0]), vec![79.0]);

        let bass = score
            .collapse_parts(
                Some(&Selector::Number(1)),
                Some(&Selector::Index(1)),
                true,
            )
            .unwrap();
        assert_eq!(keys(&bass.parts()[0]), vec![55.0, 48.0, 43.0]);

        let upper = score
            .collapse_parts(None, Some(&Selector::Number(1)), true)
            .unwrap();
        let part = &upper.parts()[0];
        assert_eq!(keys(part), vec![72.0, 67.0, 76.0]);
        assert_eq!(part.content()[1].duration(), 4.0);

        // selection without merging keeps ties inside the selection
        let unmerged = score
            .collapse_parts(Some(&Selector::Index(0)), Some(&Selector::Index(0)), false)
            .unwrap();
        assert_eq!(unmerged.parts()[0].len(), 4);
        assert!(unmerged.has_ties());

        let flat = score.flatten(false).unwrap();
        assert!(matches!(
            flat.collapse_parts(None, Some(&Selector::Index(0)), true),
            Err(ScoreError::InvalidArgument(_))
        ));
        let nothing = score
            .collapse_parts(Some(&Selector::Number(5)), None, true)
            .unwrap();
        assert_eq!(nothing.parts()[0].len(), 0);
    }

    #[test]
    fn flattened_ties_stay_inside() {
        init();
        let score = Score::new();
        let head = note(64, 1.0);
        let outside = note(64, 1.0);
        Event::new_part()
            .child(head.clone())
            .parent(&score)
            .build()
            .unwrap();
        Event::sequence()
            .child(outside.clone())
            .parent(&score)
            .build()
            .unwrap();
        head.set_tie(Some(&outside)).unwrap();

        let flat = flatten_merged(&score, false).unwrap();
        assert_eq!(flat.len(), 1);
        let notes = flat.list_all(EventType::Note);
        assert_eq!(notes.len(), 1);
        assert!(!notes[0].is_tied());
        assert!(head.tie().unwrap().ptr_eq(&outside));
    }

    #[test]
    fn collapse_parts_cuts_ties_at_selection() {
        init();
        let score = Score::new();
        let part = Event::new_part().parent(&score).build().unwrap();
        let head = note(60, 1.0);
        let continuation = note(60, 2.0);
        head.set_tie(Some(&continuation)).unwrap();
        Event::new_staff()
            .number(1)
            .child(head.clone())
            .parent(&part)
            .build()
            .unwrap();
        Event::new_staff()
            .number(2)
            .content([Event::rest().build().unwrap(), continuation])
            .parent(&part)
            .build()
            .unwrap();

        let upper = score
            .collapse_parts(None, Some(&Selector::Number(1)), true)
            .unwrap();
        let notes = upper.parts()[0].content();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].duration(), 1.0);
        assert!(!notes[0].is_tied());

        let lower = score
            .collapse_parts(None, Some(&Selector::Number(2)), true)
            .unwrap();
        let notes = lower.parts()[0].content();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].onset().unwrap(), 1.0);
        assert_eq!(notes[0].duration(), 2.0);

        assert!(head.is_tied());
    }

    #[test]
    fn from_melody() {
        init();
        let score = Score::from_melody([60, 62, 64], &[1.0, 1.0, 1.0]).unwrap();
        let part = &score.parts()[0];
        let onsets: Vec<f64> = part.content().iter().map(|n| n.onset().unwrap()).collect();
        assert_eq!(onsets, vec![0.0, 1.0, 2.0]);
        assert_eq!(score.duration(), 3.0);

        let spaced =
            Score::from_melody_with([60, 62, 64], &[1.0], Spacing::Iois(&[2.0, 2.0])).unwrap();
        assert_eq!(spaced.duration(), 5.0);
        let placed = Score::from_melody_with(
            [Pitch::from_name("C4").unwrap(), Pitch::from_name("Db4").unwrap()],
            &[0.5],
            Spacing::Onsets(&[1.0, 3.0]),
        )
        .unwrap();
        assert_eq!(placed.duration(), 3.5);
        assert_eq!(placed.parts()[0].content()[1].pitch().unwrap().name(), "Db");

        let empty = Score::from_melody(Vec::<i32>::new(), &[]).unwrap();
        assert_eq!(empty.part_count(), 1);
        assert_eq!(empty.duration(), 0.0);

        assert_eq!(
            Score::from_melody_with([60, 62], &[2.0], Spacing::Onsets(&[0.0, 1.0])),
            Err(ScoreError::InvalidArgument(
                "Notes overlap: note 0 ends at 2.00 but note 1 starts at 1.00".to_string()
            ))
        );
        assert!(Score::from_melody([60, 62, 64], &[1.0, 1.0]).is_err());
        assert!(Score::from_melody_with([60, 62], &[1.0], Spacing::Iois(&[])).is_err());
    }

    #[test]
    fn time_map_and_units() {
        init();
        let score = Score::with_time_map(get_time_map());
        assert_eq!(score.beat_to_time(6.0), 5.0);
        assert_eq!(score.time_to_beat(5.0), 6.0);
        score.append_beat_tempo(10.0, 60.0).unwrap();
        assert!(matches!(
            score.append_beat_tempo(9.0, 60.0),
            Err(ScoreError::NonMonotonicTimeMap { .. })
        ));
        assert_eq!(score.time_map().breakpoints().len(), 4);

        let melody = Score::from_melody([60, 62], &[3.0]).unwrap();
        melody.set_time_map(get_time_map());
        let seconds = melody.convert_to_seconds();
        assert!(seconds.units_are_seconds());
        assert!(!melody.units_are_seconds());
        let notes = seconds.list_all(EventType::Note);
        assert_eq!(notes[1].onset().unwrap(), 3.0);
        // 4 -> 4s, then two beats per second
        assert_eq!(notes[1].duration(), 2.0);
        assert_eq!(seconds.duration(), 5.0);
        let quarters = seconds.convert_to_quarters();
        assert_eq!(quarters, melody);
        assert_eq!(seconds.convert_to_seconds(), seconds);
    }

    #[test]
    fn typed_handle() {
        let score = Score::builder().build_score().unwrap();
        assert_eq!(score.onset().unwrap(), 0.0);
        assert!(Event::new_part().build_score().is_err());
        assert!(Score::try_from(note(60, 1.0)).is_err());
        let part = Event::new_part().parent(&score).build().unwrap();
        assert_eq!(part.score().unwrap(), score);
        assert!(part.score().unwrap().ptr_eq(&score));
        let event: Event = score.clone().into();
        assert!(Score::builder().parent(&event).build().is_err());
    }
}
