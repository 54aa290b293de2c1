use itertools::Itertools;
use once_cell::sync::Lazy;
use score_tree::{
    dom::Score,
    primitives::{Event, EventType, MapBeat, Pitch, TimeMap},
    ScoreError,
};

static TIME_MAP: Lazy<TimeMap> = Lazy::new(|| {
    let mut time_map = TimeMap::from_breakpoints(
        [MapBeat::new(2.0, 1.0), MapBeat::new(6.0, 5.0)],
        None,
    )
    .expect("Can not build time map");
    time_map
        .append_beat_tempo(10.0, 90.0)
        .expect("Can not append tempo");
    time_map
});

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn note(key_num: i32, duration: f64) -> Event {
    Event::note(Pitch::from(key_num))
        .duration(duration)
        .build()
        .expect("Can not build note")
}

fn onsets(group: &Event) -> Vec<f64> {
    group
        .content()
        .iter()
        .map(|e| e.onset().expect("unresolved onset"))
        .collect()
}

/// Two parts: melody with ties and chords, and a bass line.
fn score() -> Score {
    let score = Score::with_time_map(TIME_MAP.clone());
    let melody = Event::new_part()
        .number(1)
        .instrument("Oboe")
        .parent(&score)
        .build()
        .expect("Can not build part");
    let (a, b, c) = (note(69, 1.0), note(69, 2.0), note(69, 1.0));
    a.set_tie(Some(&b)).expect("Can not tie");
    b.set_tie(Some(&c)).expect("Can not tie");
    Event::new_staff()
        .child(
            Event::measure()
                .number(1)
                .content([note(67, 2.0), Event::rest().build().unwrap(), a])
                .build()
                .unwrap(),
        )
        .child(
            Event::measure()
                .number(2)
                .content([
                    b,
                    Event::chord()
                        .content([note(72, 1.0), note(76, 1.0)])
                        .build()
                        .unwrap(),
                    Event::rest().build().unwrap(),
                ])
                .build()
                .unwrap(),
        )
        .child(Event::measure().number(3).child(c).build().unwrap())
        .parent(&melody)
        .build()
        .expect("Can not build staff");
    let bass = Event::new_part()
        .number(2)
        .instrument("Cello")
        .parent(&score)
        .build()
        .unwrap();
    Event::new_staff()
        .child(Event::measure().number(1).child(note(43, 4.0)).build().unwrap())
        .child(Event::measure().number(2).child(note(48, 4.0)).build().unwrap())
        .parent(&bass)
        .build()
        .unwrap();
    score
}

#[test]
fn ownership() {
    init();
    let staff = Event::new_staff().onset(0.0).build().unwrap();
    let other = Event::new_staff().onset(0.0).build().unwrap();
    let n = note(60, 1.0);
    staff.insert(n.clone()).expect("Can not insert");
    assert!(n.parent().expect("no parent").ptr_eq(&staff));
    assert!(matches!(
        other.insert(n.clone()),
        Err(ScoreError::OwnershipViolation(_))
    ));
    assert!(matches!(
        staff.insert(n.clone()),
        Err(ScoreError::OwnershipViolation(_))
    ));
    staff.remove(&n).expect("Can not remove");
    other.insert(n).expect("Can not insert removed event");
}

#[test]
fn sequences_are_ordered() {
    init();
    let score = score();
    for staff in score.list_all(EventType::Staff) {
        assert!(onsets(&staff).windows(2).all(|w| w[0] <= w[1]));
        for measure in staff.measures() {
            assert!(onsets(&measure).windows(2).all(|w| w[0] <= w[1]));
        }
    }
    let staff = &score.list_all(EventType::Staff)[0];
    assert_eq!(onsets(staff), vec![0.0, 4.0, 8.0]);
    assert_eq!(staff.duration(), 9.0);
}

#[test]
fn copy_round_trip() {
    init();
    let score = score();
    let staff = &score.list_all(EventType::Staff)[0];
    let copy = staff.copy(None).expect("Can not copy");
    assert!(copy.parent().is_none());
    assert_eq!(&copy, staff);
    assert_eq!(copy.onset().unwrap(), staff.onset().unwrap());
    assert_eq!(copy.duration(), staff.duration());
    copy.list_all(EventType::Note)
        .into_iter()
        .zip_eq(staff.list_all(EventType::Note))
        .for_each(|(a, b)| {
            assert!(!a.ptr_eq(&b));
            assert_eq!(a, b);
        });
    // ties inside the copy point to copies
    let tied = copy
        .find_all(EventType::Note)
        .find(|n| n.is_tied())
        .expect("no tied note");
    assert!(tied.tie().unwrap().has_ancestor(&copy));

    let whole = score.copy();
    assert_eq!(whole, score);
    assert!(!whole.ptr_eq(&score));
}

#[test]
fn flatten_idempotence() {
    init();
    let score = score();
    let flat = score.flatten(true).expect("Can not flatten");
    assert!(flat.is_flat_and_collapsed());
    assert_eq!(flat.flatten(true).expect("Can not flatten"), flat);
    let keys = flat.parts()[0]
        .content()
        .iter()
        .map(|n| n.key_num().unwrap())
        .collect_vec();
    assert_eq!(keys, vec![67.0, 43.0, 69.0, 48.0, 76.0, 72.0]);
    let merged = &flat.parts()[0].content()[2];
    assert_eq!(merged.onset().unwrap(), 3.0);
    assert_eq!(merged.duration(), 4.0);
}

#[test]
fn tie_merge() {
    init();
    let durations = [0.5, 1.5, 0.25, 2.0];
    let notes = durations.iter().map(|d| note(64, *d)).collect_vec();
    for (a, b) in notes.iter().tuple_windows() {
        a.set_tie(Some(b)).expect("Can not tie");
    }
    let staff = Event::new_staff()
        .onset(1.0)
        .content(notes)
        .build()
        .unwrap();
    let merged = staff.merge_tied_notes(None).expect("Can not merge");
    assert_eq!(merged.len(), 1);
    let note = &merged.content()[0];
    assert_eq!(note.onset().unwrap(), 1.0);
    assert_eq!(note.duration(), durations.iter().sum::<f64>());
}

#[test]
fn two_tied_quarters() {
    init();
    let first = note(60, 1.0);
    let second = note(60, 1.0);
    first.set_tie(Some(&second)).unwrap();
    let score = Score::new();
    Event::new_part()
        .child(Event::new_staff().content([first, second]).build().unwrap())
        .parent(&score)
        .build()
        .unwrap();
    let merged = score.merge_tied_notes().expect("Can not merge");
    let notes = merged.list_all(EventType::Note);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].onset().unwrap(), 0.0);
    assert_eq!(notes[0].duration(), 2.0);
    assert_eq!(notes[0].key_num(), Some(60.0));
}

#[test]
fn deferred_onset_shift() {
    init();
    let seq = Event::sequence()
        .content([note(60, 1.0), note(62, 1.0)])
        .build()
        .unwrap();
    seq.set_onset(5.0);
    assert_eq!(onsets(&seq), vec![5.0, 6.0]);
    seq.set_onset(10.0);
    assert_eq!(onsets(&seq), vec![5.0, 6.0]);
}

#[test]
fn time_map_monotonic_round_trip() {
    init();
    let beats = (0..60).map(|step| step as f64 * 0.37).collect_vec();
    for (b1, b2) in beats.iter().tuple_windows() {
        assert!(TIME_MAP.beat_to_time(*b1) <= TIME_MAP.beat_to_time(*b2));
    }
    for beat in beats {
        let back = TIME_MAP.time_to_beat(TIME_MAP.beat_to_time(beat));
        assert!((back - beat).abs() < 1e-9, "{} -> {}", beat, back);
    }
}

#[test]
fn melody() {
    init();
    let score = Score::from_melody([60, 62, 64], &[1.0, 1.0, 1.0])
        .expect("Can not build melody");
    assert_eq!(score.part_count(), 1);
    let part = &score.parts()[0];
    assert_eq!(part.len(), 3);
    assert_eq!(onsets(part), vec![0.0, 1.0, 2.0]);
    assert_eq!(score.duration(), 3.0);
}

#[test]
fn enharmonic_spelling() {
    let sharp = Pitch::new(61.0, 1.0);
    let flat = Pitch::new(61.0, -1.0);
    assert_eq!(sharp.name_with_octave(), "C#4");
    assert_eq!(flat.name_with_octave(), "Db4");
    assert_ne!(sharp, flat);
    assert_eq!(sharp.key_num(), flat.key_num());
}

#[test]
fn transforms_leave_source_untouched() {
    init();
    let score = score();
    let before = score.copy();
    let no_chords = score.expand_chords().unwrap();
    let no_rests = score.remove_rests().unwrap();
    let no_measures = score.remove_measures().unwrap();
    assert_eq!(score, before);
    assert!(!no_chords.has_chords());
    assert!(!no_rests.has_rests());
    assert!(!no_measures.has_measures());
    // chords live in measures, so removing measures drops them
    assert_eq!(no_measures.list_all(EventType::Note).len(), 6);
    assert_eq!(no_chords.list_all(EventType::Note).len(), 8);
}
