//! Tick to seconds conversion.
//!
//! With a metrical division a tick lasts `tempo / ticks_per_beat` microseconds, and the tempo can
//! change at any breakpoint of the [`TempoMap`]. The elapsed time at a tick is therefore the sum of
//! every tempo segment before it plus the part of the segment it falls in. Applying only the tempo
//! in effect at the tick to the whole tick count gives wrong results as soon as the tempo changes.
//!
//! With an SMPTE division ticks are subdivisions of video frames and the tempo plays no part.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::header::{Division, SmpteTicks},
    tempo::TempoMap,
};

/// Microseconds in a second
const MICROS_PER_SECOND: f64 = 1_000_000.0;
/// Microseconds in a minute
const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// Converts microseconds per beat to beats per minute
pub fn tempo_to_bpm(micros_per_beat: u32) -> f64 {
    MICROS_PER_MINUTE / micros_per_beat as f64
}

/// Converts beats per minute to microseconds per beat
pub fn bpm_to_tempo(bpm: f64) -> u32 {
    (MICROS_PER_MINUTE / bpm).round() as u32
}

/// Seconds spanned by `ticks` at one constant tempo
pub fn ticks_to_seconds_at(ticks: u64, ticks_per_beat: u16, micros_per_beat: u32) -> f64 {
    segment_micros(ticks, ticks_per_beat, micros_per_beat) / MICROS_PER_SECOND
}

/// Microseconds spanned by `ticks` at one constant tempo
fn segment_micros(ticks: u64, ticks_per_beat: u16, micros_per_beat: u32) -> f64 {
    ticks as f64 * micros_per_beat as f64 / ticks_per_beat as f64
}

/// Seconds since the start for a tick under an SMPTE division. Frame rates the format does not
/// define are taken at face value
fn smpte_seconds(tick: u64, smpte: SmpteTicks) -> f64 {
    let fps = smpte.fps().unwrap_or_else(|| -(smpte.smpte() as f64));
    tick as f64 / (fps * smpte.ticks_per_frame() as f64)
}

/// Seconds from the start of a track to `tick`, integrating over each tempo segment of `map`
/// before it. `map` is ignored for SMPTE divisions
pub fn tick_to_seconds(tick: u64, map: &TempoMap, division: Division) -> f64 {
    match division {
        Division::Metrical(tpb) => {
            let breakpoints = &map.breakpoints()[..=map.index_at(tick)];

            let full: f64 = breakpoints
                .windows(2)
                .map(|pair| {
                    segment_micros(pair[1].ticks - pair[0].ticks, tpb, pair[0].micros_per_beat)
                })
                .sum();

            let current = breakpoints[breakpoints.len() - 1];
            let partial = segment_micros(tick - current.ticks, tpb, current.micros_per_beat);

            (full + partial) / MICROS_PER_SECOND
        }
        Division::TimeCodeBased(smpte) => smpte_seconds(tick, smpte),
    }
}

/// Resolves ticks to seconds for one tempo map, caching the elapsed time at every breakpoint so a
/// lookup costs one binary search
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeResolver {
    /// The tempo map
    map: TempoMap,
    /// The header's division
    division: Division,
    /// Microseconds elapsed at each breakpoint of `map`
    elapsed_micros: Vec<f64>,
}

impl TimeResolver {
    /// Creates a resolver for a tempo map under a division
    pub fn new(map: TempoMap, division: Division) -> Self {
        let elapsed_micros = match division {
            Division::Metrical(tpb) => {
                let mut elapsed = Vec::with_capacity(map.breakpoints().len());
                let mut total = 0.0;
                elapsed.push(total);

                for pair in map.breakpoints().windows(2) {
                    let ticks = pair[1].ticks - pair[0].ticks;
                    total += segment_micros(ticks, tpb, pair[0].micros_per_beat);
                    elapsed.push(total);
                }

                elapsed
            }
            Division::TimeCodeBased(_) => vec![],
        };

        Self {
            map,
            division,
            elapsed_micros,
        }
    }

    /// The tempo map this resolver converts with
    pub fn tempo_map(&self) -> &TempoMap {
        &self.map
    }

    /// Seconds from the start to `tick`
    pub fn seconds(&self, tick: u64) -> f64 {
        match self.division {
            Division::Metrical(tpb) => {
                let idx = self.map.index_at(tick);
                let current = self.map.breakpoints()[idx];
                let partial = segment_micros(tick - current.ticks, tpb, current.micros_per_beat);

                (self.elapsed_micros[idx] + partial) / MICROS_PER_SECOND
            }
            Division::TimeCodeBased(smpte) => smpte_seconds(tick, smpte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{bpm_to_tempo, tempo_to_bpm, tick_to_seconds, ticks_to_seconds_at, TimeResolver};
    use crate::{
        chunk::header::{Division, SmpteTicks},
        tempo::TempoMap,
    };

    #[test]
    fn tempo_changes_are_integrated() {
        let map = TempoMap::new([(0, 500_000), (960, 250_000)]);
        let division = Division::Metrical(480);

        assert_eq!(tick_to_seconds(960, &map, division), 1.0);
        assert_eq!(tick_to_seconds(1920, &map, division), 1.5);

        // Applying the final tempo to every tick would give 1.0 rather than 1.5, and applying
        // the first tempo would give 2.0
        assert_ne!(ticks_to_seconds_at(1920, 480, 250_000), 1.5);
        assert_eq!(ticks_to_seconds_at(1920, 480, 500_000), 2.0);
    }

    #[test]
    fn resolver_matches_direct_integration() {
        let map = TempoMap::new([
            (0, 500_000),
            (960, 250_000),
            (1000, 1_000_000),
            (4000, 333_333),
        ]);
        let division = Division::Metrical(96);
        let resolver = TimeResolver::new(map.clone(), division);

        for tick in (0..6000).step_by(37) {
            let direct = tick_to_seconds(tick, &map, division);
            let cached = resolver.seconds(tick);
            assert!((direct - cached).abs() < 1e-9, "tick {tick}: {direct} vs {cached}");
        }
    }

    #[test]
    fn seconds_never_decrease() {
        let map = TempoMap::new([(10, 200_000), (30, 2_000_000), (31, 1)]);
        let resolver = TimeResolver::new(map, Division::Metrical(24));

        let mut previous = 0.0;
        for tick in 0..200 {
            let seconds = resolver.seconds(tick);
            assert!(seconds >= previous);
            previous = seconds;
        }
    }

    #[test]
    fn smpte_division_ignores_tempo() {
        let map = TempoMap::new([(0, 250_000)]);
        let division = Division::TimeCodeBased(SmpteTicks::new(25, 40));

        // 25 frames of 40 ticks make a second
        assert_eq!(tick_to_seconds(1000, &map, division), 1.0);
        assert_eq!(TimeResolver::new(map, division).seconds(2500), 2.5);
    }

    #[test]
    fn bpm_conversions() {
        assert_eq!(tempo_to_bpm(500_000), 120.0);
        assert_eq!(bpm_to_tempo(120.0), 500_000);
        assert_eq!(bpm_to_tempo(140.0), 428_571);
    }
}
