//! Human-like randomized delay generator.
//!
//! Every suspension point in the sequence executor and the traffic
//! controller draws its delay from here instead of calling a uniform RNG
//! directly, so that timing texture (sweet-spot bias, anti-clustering,
//! bounded noise) is centralized and independently testable.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

/// A named timing range. The "generic" variant lets a caller register an
/// ad-hoc range without touching this enum, e.g. for a step's explicit
/// `(min_delay, max_delay)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingRange {
    BufferLow,
    BufferMedium,
    BufferHigh,
    KeyDown,
    EchoHit,
    HoldRelease,
    DualOffset,
    TrafficWait,
    Generic,
}

impl TimingRange {
    pub fn default_bounds(self) -> (u32, u32) {
        match self {
            TimingRange::BufferLow => (129, 163),
            TimingRange::BufferMedium => (229, 263),
            TimingRange::BufferHigh => (513, 667),
            TimingRange::KeyDown => (23, 38),
            TimingRange::EchoHit => (15, 25),
            TimingRange::HoldRelease => (7, 18),
            TimingRange::DualOffset => (4, 10),
            TimingRange::TrafficWait => (10, 30),
            TimingRange::Generic => (0, 0),
        }
    }
}

/// Non-human-biased tier bounds used by the sequence executor's "plain"
/// buffer-tier lookup: low/medium/high, distinct from the timing oracle's
/// "human" sweet-spot versions — see DESIGN.md open question #3.
pub fn plain_buffer_tier_bounds(tier: BufferTier) -> (u32, u32) {
    match tier {
        BufferTier::Low => (11, 17),
        BufferTier::Medium => (15, 24),
        BufferTier::High => (980, 1270),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferTier {
    Low,
    Medium,
    High,
}

/// A single `value -> target probability` entry. Probabilities for a range
/// must sum to at most 1.
#[derive(Debug, Clone, Copy)]
pub struct SweetSpot {
    pub value: u32,
    pub probability: f64,
}

#[derive(Default)]
struct RangeHistory {
    recent: VecDeque<u32>,
}

const HISTORY_CAP: usize = 50;

impl RangeHistory {
    fn push(&mut self, v: u32) {
        self.recent.push_back(v);
        if self.recent.len() > HISTORY_CAP {
            self.recent.pop_front();
        }
    }

    fn fraction_equal(&self, v: u32) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        let hits = self.recent.iter().filter(|&&x| x == v).count();
        hits as f64 / self.recent.len() as f64
    }
}

/// Deterministic xorshift-style PRNG. Not cryptographic; this is purely
/// for timing texture, not security.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

struct RangeState {
    bounds: (u32, u32),
    sweet_spots: Vec<SweetSpot>,
    history: RangeHistory,
}

/// Produces an integer in `[min, max]` for any of the named ranges, biased
/// toward configured "sweet spot" values but always within bounds.
pub struct TimingOracle {
    rng: Mutex<SplitMix64>,
    ranges: Mutex<HashMap<TimingRange, RangeState>>,
}

impl TimingOracle {
    pub fn new(seed: u64) -> Self {
        let mut ranges = HashMap::default();
        for range in [
            TimingRange::BufferLow,
            TimingRange::BufferMedium,
            TimingRange::BufferHigh,
            TimingRange::KeyDown,
            TimingRange::EchoHit,
            TimingRange::HoldRelease,
            TimingRange::DualOffset,
            TimingRange::TrafficWait,
        ] {
            ranges.insert(
                range,
                RangeState {
                    bounds: range.default_bounds(),
                    sweet_spots: Vec::new(),
                    history: RangeHistory::default(),
                },
            );
        }
        Self {
            rng: Mutex::new(SplitMix64(seed | 1)),
            ranges: Mutex::new(ranges),
        }
    }

    /// Configure (or overwrite) the sweet-spot distribution for a range.
    /// The sum of probabilities must not exceed 1; callers outside tests
    /// should treat a violation as a configuration bug, so this only logs
    /// a warning rather than panicking — the engine favors degraded
    /// behavior over crashing.
    pub fn configure_sweet_spots(&self, range: TimingRange, spots: Vec<SweetSpot>) {
        let total: f64 = spots.iter().map(|s| s.probability).sum();
        if total > 1.0 + f64::EPSILON {
            log::warn!(
                "sweet-spot probabilities for {range:?} sum to {total}, clamping is in effect"
            );
        }
        let mut ranges = self.ranges.lock();
        let entry = ranges.entry(range).or_insert_with(|| RangeState {
            bounds: range.default_bounds(),
            sweet_spots: Vec::new(),
            history: RangeHistory::default(),
        });
        entry.sweet_spots = spots;
    }

    pub fn set_bounds(&self, range: TimingRange, min: u32, max: u32) {
        let mut ranges = self.ranges.lock();
        let entry = ranges.entry(range).or_insert_with(|| RangeState {
            bounds: (min, max),
            sweet_spots: Vec::new(),
            history: RangeHistory::default(),
        });
        entry.bounds = (min, max);
    }

    /// Draw a sample in `[min, max]` for an explicit, one-off range (used
    /// for a step's explicit `(min_delay, max_delay)` pair rather than one
    /// of the seven named ranges).
    pub fn draw_explicit(&self, min: u32, max: u32) -> u32 {
        self.draw_in_bounds(TimingRange::Generic, min, max, &[])
    }

    pub fn draw(&self, range: TimingRange) -> u32 {
        let (bounds, spots) = {
            let ranges = self.ranges.lock();
            let state = ranges.get(&range).expect("all named ranges are pre-registered");
            (state.bounds, state.sweet_spots.clone())
        };
        self.draw_in_bounds(range, bounds.0, bounds.1, &spots)
    }

    fn draw_in_bounds(&self, range: TimingRange, min: u32, max: u32, spots: &[SweetSpot]) -> u32 {
        if min >= max {
            return min;
        }
        let (base, is_configured_spot) = self.weighted_pick(min, max, spots, range);

        // A value picked by landing on a configured sweet spot is the
        // distribution's whole point; re-jittering it by up to +-10% would
        // scatter it across a neighborhood of values and silently blow the
        // configured probability. Noise only applies to the uniform/
        // non-spot branch, where it adds texture without undermining the
        // sweet-spot contract.
        let clamped = if is_configured_spot {
            base
        } else {
            let noise = {
                let mut rng = self.rng.lock();
                0.9 + rng.next_f64() * 0.2 // multiplicative noise in [0.9, 1.1]
            };
            let jittered = (base as f64 * noise).round() as i64;
            jittered.clamp(min as i64, max as i64) as u32
        };

        if range != TimingRange::Generic {
            let mut ranges = self.ranges.lock();
            if let Some(state) = ranges.get_mut(&range) {
                state.history.push(clamped);
            }
        }
        clamped
    }

    /// Returns the picked value and whether it landed on a configured
    /// sweet spot (as opposed to the uniform remainder-mass branch).
    fn weighted_pick(&self, min: u32, max: u32, spots: &[SweetSpot], range: TimingRange) -> (u32, bool) {
        if spots.is_empty() {
            let mut rng = self.rng.lock();
            let span = (max - min) as u64 + 1;
            return (min + (rng.next_u64() % span) as u32, false);
        }

        // Weight each sweet-spot value by its configured probability, with
        // a mild anti-clustering correction: a value that has appeared
        // disproportionately often in the recent history window gets
        // pushed down, so the oracle doesn't repeat the same "human"
        // value many times in a row.
        let mut weights: Vec<(u32, f64)> = spots
            .iter()
            .map(|s| {
                let recent_frac = {
                    let ranges = self.ranges.lock();
                    ranges
                        .get(&range)
                        .map(|st| st.history.fraction_equal(s.value))
                        .unwrap_or(0.0)
                };
                let correction = (1.0 - recent_frac * 0.6).max(0.25);
                (s.value, (s.probability * correction).max(0.0001))
            })
            .collect();

        // Remainder probability mass is spread uniformly over the full
        // range so non-sweet-spot values still occur and bounds are
        // always reachable.
        let spot_mass: f64 = spots.iter().map(|s| s.probability).sum::<f64>().min(1.0);
        let remainder = (1.0 - spot_mass).max(0.0);
        let span = (max - min) as u64 + 1;
        let uniform_weight_each = remainder / span as f64;

        let total_weight: f64 =
            weights.iter().map(|(_, w)| *w).sum::<f64>() + uniform_weight_each * span as f64;

        let mut roll = {
            let mut rng = self.rng.lock();
            rng.next_f64() * total_weight
        };

        for (value, w) in weights.drain(..) {
            if roll < w {
                return (value, true);
            }
            roll -= w;
        }
        for v in min..=max {
            if roll < uniform_weight_each {
                return (v, false);
            }
            roll -= uniform_weight_each;
        }
        (max, false)
    }
}

impl Default for TimingOracle {
    fn default() -> Self {
        Self::new(0xA5A5_1234_F00D_BEEF)
    }
}
