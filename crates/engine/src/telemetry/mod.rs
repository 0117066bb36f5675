//! Usefulness, pollution, and interval-counter bookkeeping.
//!
//! This module owns every raw telemetry counter the feedback controller
//! consumes, plus the structures that feed them:
//! 1. **Usefulness bits:** one per `(set, way)` slot, set when a tracked
//!    prefetch fills the slot and consumed by the first subsequent hit.
//! 2. **Pollution filter:** a hashed bitmap of prefetched lines evicted
//!    before use (see [`pollution`]).
//! 3. **Outstanding table:** the prefetch MSHR mirror (see
//!    [`outstanding`]), updated here on misses and fills.
//!
//! The controller never reaches into this state directly; it receives a
//! counter snapshot from [`Telemetry::take_interval`] once per interval.

/// Outstanding-prefetch table (prefetch MSHR mirror).
pub mod outstanding;
/// Hashed evicted-before-use bitmap.
pub mod pollution;

pub use self::outstanding::OutstandingTable;
pub use self::pollution::PollutionFilter;

/// Raw event counts accumulated over one feedback interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalCounters {
    /// Hits credited to a tracked prefetch (usefulness-bit hits plus
    /// late-prefetch misses).
    pub used: u32,
    /// Prefetch fills observed.
    pub prefetched: u32,
    /// Misses to lines whose tracked prefetch was in flight (arrived too
    /// late to help).
    pub late: u32,
    /// Demand misses observed.
    pub miss: u32,
    /// Misses whose folded address hit the pollution filter.
    pub miss_prefetch: u32,
}

/// Telemetry state for one engine instance.
pub struct Telemetry {
    useful: Vec<bool>,
    sets: usize,
    ways: usize,
    pollution: PollutionFilter,
    counters: IntervalCounters,
    evictions: u64,
}

impl Telemetry {
    /// Creates cleared telemetry for a `sets` x `ways` cache with a
    /// pollution filter of `pollution_entries` slots.
    pub fn new(sets: usize, ways: usize, pollution_entries: usize) -> Self {
        Self {
            useful: vec![false; sets * ways],
            sets,
            ways,
            pollution: PollutionFilter::new(pollution_entries),
            counters: IntervalCounters::default(),
            evictions: 0,
        }
    }

    fn slot(&self, set: usize, way: usize) -> usize {
        debug_assert!(set < self.sets && way < self.ways);
        set * self.ways + way
    }

    /// Records a demand hit at the given slot.
    ///
    /// A set usefulness bit is a one-shot credit: it counts as "used"
    /// here and is cleared.
    pub fn record_hit(&mut self, set: usize, way: usize) {
        let slot = self.slot(set, way);
        if self.useful[slot] {
            self.counters.used += 1;
            self.useful[slot] = false;
        }
    }

    /// Records a demand miss for `line`.
    ///
    /// A tracked, still-late prefetch for the same line means the
    /// prefetch was issued but arrived too late: it is counted both late
    /// and used, and its late flag is consumed so the eventual fill does
    /// not credit the slot again. A pollution-filter hit marks the miss
    /// as pollution-attributable.
    pub fn record_miss(&mut self, line: u64, outstanding: &mut OutstandingTable) {
        self.counters.miss += 1;

        if outstanding.consume_late(line) {
            self.counters.late += 1;
            self.counters.used += 1;
        }

        if self.pollution.probe(line) {
            self.counters.miss_prefetch += 1;
        }
    }

    /// Records a line insertion at `(set, way)`.
    ///
    /// Resolves the outstanding table for the filled line and copies the
    /// late flag into the slot's usefulness bit, so the prefetch can be
    /// credited when the slot is next hit. Prefetch fills that evict a
    /// live line mark the victim in the pollution filter; demand fills
    /// clear both the usefulness bit and the victim's filter slot. The
    /// filled line's own filter slot is always cleared — it is resident
    /// again.
    pub fn record_fill(
        &mut self,
        line: u64,
        set: usize,
        way: usize,
        was_prefetch: bool,
        evicted_line: Option<u64>,
        outstanding: &mut OutstandingTable,
    ) {
        let slot = self.slot(set, way);

        if evicted_line.is_some() {
            self.evictions += 1;
        }

        if let Some(late) = outstanding.resolve(line) {
            self.useful[slot] = late;
        }

        if was_prefetch {
            self.counters.prefetched += 1;
            if let Some(victim) = evicted_line {
                self.pollution.mark(victim);
            }
        } else {
            self.useful[slot] = false;
            if let Some(victim) = evicted_line {
                self.pollution.unmark(victim);
            }
        }

        self.pollution.unmark(line);
    }

    /// Returns the interval counters accumulated so far and resets them.
    pub fn take_interval(&mut self) -> IntervalCounters {
        std::mem::take(&mut self.counters)
    }

    /// Current interval counters, for diagnostics and tests.
    pub const fn counters(&self) -> &IntervalCounters {
        &self.counters
    }

    /// Total evictions observed since construction.
    pub const fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Usefulness bit at `(set, way)`, for diagnostics and tests.
    pub fn is_useful(&self, set: usize, way: usize) -> bool {
        self.useful[self.slot(set, way)]
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("sets", &self.sets)
            .field("ways", &self.ways)
            .field("counters", &self.counters)
            .field("evictions", &self.evictions)
            .finish()
    }
}
