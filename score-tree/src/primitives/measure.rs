//! Numbered groups: Part, Staff and Measure.
//!
//! Measured hierarchy is Score-Part-Staff-Measure-(Note or Chord-Note).
//! Staff and Measure may also hold signatures and rests, so the checks
//! below look for illegal content instead of listing the legal one.

use super::{container::GroupKind, Event, EventType};
use crate::error::{ScoreError, ScoreResult};

impl Event {
    /// Number of a Part, Staff or Measure, if it was given.
    pub fn number(&self) -> Option<u32> {
        match self.data().group().map(|group| &group.kind) {
            Some(GroupKind::Part { number, .. })
            | Some(GroupKind::Staff { number })
            | Some(GroupKind::Measure { number }) => *number,
            _ => None,
        }
    }
    pub fn set_number(&self, new: Option<u32>) -> ScoreResult<()> {
        let mut data = self.data_mut();
        match data.group_mut().map(|group| &mut group.kind) {
            Some(GroupKind::Part { number, .. })
            | Some(GroupKind::Staff { number })
            | Some(GroupKind::Measure { number }) => {
                *number = new;
                Ok(())
            }
            _ => Err(ScoreError::InvalidArgument(
                "only Part, Staff and Measure are numbered".to_string(),
            )),
        }
    }

    /// Instrument name of a Part.
    pub fn instrument(&self) -> Option<String> {
        match self.data().group().map(|group| &group.kind) {
            Some(GroupKind::Part { instrument, .. }) => instrument.clone(),
            _ => None,
        }
    }
    pub fn set_instrument(&self, name: Option<String>) -> ScoreResult<()> {
        let mut data = self.data_mut();
        match data.group_mut().map(|group| &mut group.kind) {
            Some(GroupKind::Part { instrument, .. }) => {
                *instrument = name;
                Ok(())
            }
            _ => Err(ScoreError::InvalidArgument(
                "only Part has an instrument".to_string(),
            )),
        }
    }

    /// Measures directly inside a Staff.
    pub fn measures(&self) -> Vec<Event> {
        self.content()
            .into_iter()
            .filter(|event| event.event_type() == EventType::Measure)
            .collect()
    }

    /// True if the subtree follows the measured hierarchy.
    ///
    /// Never fails: anything which is not a Score, Part, Staff or
    /// Measure is not measured.
    pub fn is_measured(&self) -> bool {
        match self.event_type() {
            EventType::Score => self
                .content()
                .iter()
                .all(|part| part.event_type() == EventType::Part && part.is_measured()),
            EventType::Part => self
                .content()
                .iter()
                .all(|staff| staff.event_type() == EventType::Staff && staff.is_measured()),
            EventType::Staff => self.content().iter().all(|event| {
                match event.event_type() {
                    EventType::Measure => event.is_measured(),
                    EventType::TimeSignature | EventType::KeySignature => true,
                    _ => false,
                }
            }),
            EventType::Measure => self.content().iter().all(|event| {
                !matches!(
                    event.event_type(),
                    EventType::Staff | EventType::Part | EventType::Score
                )
            }),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::primitives::{Event, KeySignature, Pitch, TimeSignature};

    fn measure(number: u32) -> Event {
        Event::measure()
            .number(number)
            .child(Event::note(Pitch::from(60)).build().unwrap())
            .child(
                Event::chord()
                    .child(Event::note(Pitch::from(64)).build().unwrap())
                    .build()
                    .unwrap(),
            )
            .child(Event::rest().build().unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn numbers() {
        let m = measure(3);
        assert_eq!(m.number(), Some(3));
        m.set_number(Some(4)).unwrap();
        assert_eq!(m.number(), Some(4));
        assert!(Event::chord().build().unwrap().set_number(Some(1)).is_err());
        let part = Event::new_part().instrument("Piano").build().unwrap();
        assert_eq!(part.instrument(), Some("Piano".to_string()));
        assert_eq!(part.number(), None);
        assert_eq!(m.instrument(), None);
    }

    #[test]
    fn measured_hierarchy() {
        let staff = Event::new_staff()
            .child(Event::time_signature(TimeSignature::new(3.0, 4)).build().unwrap())
            .child(Event::key_signature(KeySignature::new(1)).build().unwrap())
            .content([measure(1), measure(2)])
            .build()
            .unwrap();
        assert!(staff.is_measured());
        assert_eq!(staff.measures().len(), 2);
        let part = Event::new_part().child(staff.clone()).build().unwrap();
        assert!(part.is_measured());

        let flat = Event::new_part()
            .child(Event::note(Pitch::from(60)).build().unwrap())
            .build()
            .unwrap();
        assert!(!flat.is_measured());
        let loose = Event::new_staff()
            .child(Event::note(Pitch::from(60)).build().unwrap())
            .build()
            .unwrap();
        assert!(!loose.is_measured());
        assert!(!Event::rest().build().unwrap().is_measured());
    }
}
