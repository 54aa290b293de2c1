//! Elements, from which score tree constructed.
//!
//! At first, leaves are created: notes, rests and signatures.
//! Then they are collected into groups: chords and measures,
//! measures into staves, staves into parts.
//! Then parts are collected into Score, which owns the TimeMap.
//!
//! Groups may be built before their position is known: their onset
//! stays unresolved until they are inserted somewhere.

pub mod builder;
pub mod container;
pub mod event;
pub mod measure;
pub mod note;
pub mod onset;
pub mod pitch;
pub mod properties;
pub mod signature;
pub mod time_map;

pub use builder::EventBuilder;
pub use container::{FindAll, Flavor};
pub use event::{Event, EventType};
pub use onset::Onset;
pub use pitch::{Accidental, Pitch, DEFAULT_OCTAVE};
pub use properties::{Properties, PropertyValue};
pub use signature::{KeySignature, TimeSignature};
pub use time_map::{MapBeat, TimeMap, DEFAULT_BPM};
