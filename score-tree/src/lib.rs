//! Symbolic music as a time-aware tree.
//!
//! Score → Part → Staff → Measure → Note / Rest / Chord.
//!
//! - [primitives] holds the building blocks: [primitives::Pitch],
//!   [primitives::TimeMap] and the [primitives::Event] handle, which
//!   is every node of the tree.
//! - [dom] holds the root [dom::Score] and the whole-score
//!   transformations, like flattening into plain note lists.
//!
//! The tree is single-threaded: events are `Rc` handles, every event
//! has at most one owner, and the way up (parent) or forward (tie) is
//! never owning.
//!
//! # Example
//! ```
//! use score_tree::{dom::Score, primitives::{Event, Pitch}};
//!
//! let score = Score::new();
//! let part = Event::new_part().instrument("Flute").parent(&score).build().unwrap();
//! let first = Event::note(Pitch::from_name("A4").unwrap()).build().unwrap();
//! let second = Event::note(Pitch::from_name("A4").unwrap()).build().unwrap();
//! first.set_tie(Some(&second)).unwrap();
//! Event::new_staff()
//!     .child(Event::measure().child(first).build().unwrap())
//!     .child(Event::measure().child(second).build().unwrap())
//!     .parent(&part)
//!     .build()
//!     .unwrap();
//!
//! let flat = score.flatten(true).unwrap();
//! let notes = flat.parts()[0].content();
//! assert_eq!(notes.len(), 1);
//! assert_eq!(notes[0].duration(), 2.0);
//! ```

pub mod dom;
pub mod error;
pub mod primitives;

pub use error::{ScoreError, ScoreResult};
