//! Tempo maps. A [`TempoMap`] is the ordered list of points where the tempo changes, built from
//! the Set Tempo meta events of one or more decoded tracks

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{chunk::track::Track, timing::tempo_to_bpm};

/// Tempo in effect until a Set Tempo event says otherwise, 120 beats per minute
pub const DEFAULT_TEMPO: u32 = 500_000;

/// A point where the tempo changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TempoBreakpoint {
    /// Absolute tick the tempo takes effect at
    pub ticks: u64,
    /// Microseconds per quarter note from this tick on
    pub micros_per_beat: u32,
}

impl TempoBreakpoint {
    /// The tempo in beats per minute
    pub fn bpm(&self) -> f64 {
        tempo_to_bpm(self.micros_per_beat)
    }
}

/// Tempo breakpoints sorted by tick. The first breakpoint is always at tick 0
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TempoMap {
    /// Breakpoints, ascending by tick with no two at the same tick
    breakpoints: Vec<TempoBreakpoint>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            breakpoints: vec![TempoBreakpoint {
                ticks: 0,
                micros_per_beat: DEFAULT_TEMPO,
            }],
        }
    }
}

impl TempoMap {
    /// Builds a map from `(tick, microseconds per beat)` changes in the order they were seen.
    /// When several changes share a tick the last one wins, and the default tempo fills tick 0 if
    /// no change sits there
    pub fn new(changes: impl IntoIterator<Item = (u64, u32)>) -> Self {
        let mut changes: Vec<_> = changes
            .into_iter()
            .map(|(ticks, micros_per_beat)| TempoBreakpoint {
                ticks,
                micros_per_beat,
            })
            .collect();

        // Stable, so changes at one tick stay in the order they were seen
        changes.sort_by_key(|change| change.ticks);

        let mut map = Self::default();
        for change in changes {
            match map.breakpoints.last_mut() {
                Some(last) if last.ticks == change.ticks => *last = change,
                _ => map.breakpoints.push(change),
            }
        }

        map
    }

    /// Merges the tempo changes of tracks sharing one tick clock. Tracks are visited in order,
    /// so a later track's change overrides an earlier track's change at the same tick
    pub fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> Self {
        Self::new(tracks.into_iter().flat_map(Track::tempo_changes))
    }

    /// The breakpoints in tick order
    pub fn breakpoints(&self) -> &[TempoBreakpoint] {
        &self.breakpoints
    }

    /// Index of the breakpoint in effect at `tick`, the last one at or before it
    pub fn index_at(&self, tick: u64) -> usize {
        self.breakpoints
            .partition_point(|breakpoint| breakpoint.ticks <= tick)
            .saturating_sub(1)
    }

    /// The tempo in effect at `tick`
    pub fn tempo_at(&self, tick: u64) -> u32 {
        self.breakpoints[self.index_at(tick)].micros_per_beat
    }
}
