//! Main "ruler" for converting between quarters and seconds.
//!
//! The map is piecewise linear: a list of (beat, time) breakpoints,
//! always starting at (0, 0), plus the tempo holding after the last one.
use std::fmt;

use log::{debug, warn};

use crate::error::{ScoreError, ScoreResult};

/// Tempo assumed when nothing else can tell.
pub const DEFAULT_BPM: f64 = 100.0;

fn beats_per_second(bpm: f64) -> ScoreResult<f64> {
    match bpm.is_finite() && bpm > 0.0 {
        true => Ok(bpm / 60.0),
        false => Err(ScoreError::InvalidArgument(format!(
            "tempo must be positive, got {} bpm",
            bpm
        ))),
    }
}

/// One breakpoint of the [TimeMap].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBeat {
    /// quarters
    pub beat: f64,
    /// seconds
    pub time: f64,
}
impl MapBeat {
    pub fn new(beat: f64, time: f64) -> Self {
        Self { beat, time }
    }
}

/// Converts beat (quarter-note) positions to seconds and back.
///
/// # Example
/// ```
/// use score_tree::primitives::TimeMap;
///
/// let mut time_map = TimeMap::new(60.0);
/// time_map.append_beat_tempo(4.0, 120.0).unwrap();
/// assert_eq!(time_map.beat_to_time(2.0), 2.0);
/// assert_eq!(time_map.beat_to_time(6.0), 5.0);
/// assert_eq!(time_map.time_to_beat(5.0), 6.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMap {
    beats: Vec<MapBeat>,
    /// beats per second after the last breakpoint
    last_tempo: Option<f64>,
}
impl Default for TimeMap {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}
impl TimeMap {
    /// Map with a single constant tempo in beats per minute.
    ///
    /// A tempo which is not positive counts as absent, so the map
    /// falls back to [DEFAULT_BPM].
    pub fn new(bpm: f64) -> Self {
        let last_tempo = match beats_per_second(bpm) {
            Ok(bps) => Some(bps),
            Err(err) => {
                warn!("{}, using {} bpm", err, DEFAULT_BPM);
                None
            }
        };
        Self {
            beats: vec![MapBeat::new(0.0, 0.0)],
            last_tempo,
        }
    }

    /// Build from explicit breakpoints.
    ///
    /// (0, 0) is prepended if missing. Breakpoints must ascend in both
    /// beat and time. Without `last_bpm` the map extrapolates from the
    /// last two breakpoints.
    pub fn from_breakpoints(
        breakpoints: impl IntoIterator<Item = MapBeat>,
        last_bpm: Option<f64>,
    ) -> ScoreResult<Self> {
        let mut beats = vec![MapBeat::new(0.0, 0.0)];
        for point in breakpoints {
            let last = beats[beats.len() - 1];
            if !point.beat.is_finite() || !point.time.is_finite() {
                return Err(ScoreError::InvalidArgument(format!(
                    "breakpoint {:?} is not finite",
                    point
                )));
            }
            if point == last {
                continue;
            }
            if point.beat <= last.beat || point.time <= last.time {
                return Err(ScoreError::NonMonotonicTimeMap {
                    beat: point.beat,
                    last: last.beat,
                });
            }
            beats.push(point);
        }
        Ok(Self {
            beats,
            last_tempo: last_bpm.map(beats_per_second).transpose()?,
        })
    }

    pub fn breakpoints(&self) -> &[MapBeat] {
        &self.beats
    }

    /// Tempo after the last breakpoint in bpm, if fixed.
    pub fn last_tempo(&self) -> Option<f64> {
        self.last_tempo.map(|bps| bps * 60.0)
    }

    /// Change tempo at `beat`. The tempo (bpm) holds from `beat` on,
    /// until the next call.
    ///
    /// # Returns
    /// Err if `beat` is before the last breakpoint: tempo can not be
    /// changed in the middle of the map. Err if `bpm` is not a positive
    /// number.
    pub fn append_beat_tempo(&mut self, beat: f64, bpm: f64) -> ScoreResult<()> {
        let bps = beats_per_second(bpm)?;
        if !beat.is_finite() {
            return Err(ScoreError::InvalidArgument(format!(
                "beat must be finite, got {}",
                beat
            )));
        }
        let last = self.beats[self.beats.len() - 1].beat;
        if beat < last {
            return Err(ScoreError::NonMonotonicTimeMap { beat, last });
        }
        if beat > last {
            let time = self.beat_to_time(beat);
            self.beats.push(MapBeat::new(beat, time));
        }
        self.last_tempo = Some(bps);
        debug!("tempo {} bpm from beat {}", bpm, beat);
        Ok(())
    }

    /// Index of the first breakpoint with `beat > beat`.
    fn locate_beat(&self, beat: f64) -> usize {
        self.beats.partition_point(|mb| beat > mb.beat)
    }

    /// Index of the first breakpoint with `time > time`.
    fn locate_time(&self, time: f64) -> usize {
        self.beats.partition_point(|mb| time > mb.time)
    }

    /// Pair of breakpoints to interpolate (or extrapolate) with, when
    /// `index` points past the last breakpoint and no tempo is fixed.
    fn last_segment(&self) -> Option<(MapBeat, MapBeat)> {
        match self.beats.len() {
            0 | 1 => None,
            n => Some((self.beats[n - 2], self.beats[n - 1])),
        }
    }

    /// Quarters to seconds. Non-positive beats map to themselves.
    pub fn beat_to_time(&self, beat: f64) -> f64 {
        if beat <= 0.0 {
            return beat;
        }
        let idx = self.locate_beat(beat);
        let (mb0, mb1) = if idx == self.beats.len() {
            let last = self.beats[idx - 1];
            if let Some(bps) = self.last_tempo {
                return last.time + (beat - last.beat) / bps;
            }
            match self.last_segment() {
                Some(segment) => segment,
                None => return beat * 60.0 / DEFAULT_BPM,
            }
        } else {
            // idx >= 1, since beats[0] is at 0 and beat > 0
            (self.beats[idx - 1], self.beats[idx])
        };
        mb0.time + (beat - mb0.beat) * (mb1.time - mb0.time) / (mb1.beat - mb0.beat)
    }

    /// Seconds to quarters. Non-positive times map to themselves.
    pub fn time_to_beat(&self, time: f64) -> f64 {
        if time <= 0.0 {
            return time;
        }
        let idx = self.locate_time(time);
        let (mb0, mb1) = if idx == self.beats.len() {
            let last = self.beats[idx - 1];
            if let Some(bps) = self.last_tempo {
                return last.beat + (time - last.time) * bps;
            }
            match self.last_segment() {
                Some(segment) => segment,
                None => return time * DEFAULT_BPM / 60.0,
            }
        } else {
            (self.beats[idx - 1], self.beats[idx])
        };
        mb0.beat + (time - mb0.time) * (mb1.beat - mb0.beat) / (mb1.time - mb0.time)
    }

    /// Tempo in bpm at `beat`. On a tempo change, the tempo before it.
    pub fn beat_to_tempo(&self, beat: f64) -> f64 {
        self.index_to_tempo(self.locate_beat(beat))
    }

    fn index_to_tempo(&self, idx: usize) -> f64 {
        let (mb0, mb1) = if idx >= self.beats.len() || self.beats.len() <= 1 {
            if let Some(bps) = self.last_tempo {
                return bps * 60.0;
            }
            match self.last_segment() {
                Some(segment) => segment,
                None => return DEFAULT_BPM,
            }
        } else if idx == 0 {
            (self.beats[0], self.beats[1])
        } else {
            (self.beats[idx - 1], self.beats[idx])
        };
        (mb1.beat - mb0.beat) * 60.0 / (mb1.time - mb0.time)
    }
}
impl fmt::Display for TimeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeMap: [ ")?;
        for (idx, mb) in self.beats.iter().enumerate() {
            write!(
                f,
                "({:.2}, {:.3}s, {:.3}bpm) ",
                mb.beat,
                mb.time,
                self.index_to_tempo(idx + 1)
            )?;
        }
        write!(f, "]")
    }
}
