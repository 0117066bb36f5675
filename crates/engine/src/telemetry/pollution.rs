//! Hashed pollution filter.
//!
//! Tracks lines whose prefetch was evicted from the cache before ever
//! being used. A miss that lands on a set bit is attributed to prefetch
//! pollution. Indexing folds the line address's low bits against the next
//! group of bits with XOR, so distinct lines can alias; the filter is a
//! lossy approximation, not an exact per-address map.

/// Fixed-size bitmap of evicted-before-use prefetched lines.
pub struct PollutionFilter {
    slots: Vec<bool>,
    mask: u64,
    shift: u32,
}

impl PollutionFilter {
    /// Creates a cleared filter with `entries` slots.
    ///
    /// `entries` must be a non-zero power of two (validated by
    /// [`EngineConfig::validate`](crate::config::EngineConfig::validate)).
    pub fn new(entries: usize) -> Self {
        debug_assert!(entries.is_power_of_two());
        Self {
            slots: vec![false; entries],
            mask: entries as u64 - 1,
            shift: entries.trailing_zeros(),
        }
    }

    /// Folds a line address into a filter index.
    fn index(&self, line: u64) -> usize {
        ((line & self.mask) ^ ((line >> self.shift) & self.mask)) as usize
    }

    /// Flags `line` as a prefetch evicted before use.
    pub fn mark(&mut self, line: u64) {
        let idx = self.index(line);
        self.slots[idx] = true;
    }

    /// Clears the flag at `line`'s folded index.
    pub fn unmark(&mut self, line: u64) {
        let idx = self.index(line);
        self.slots[idx] = false;
    }

    /// Tests `line`'s folded index.
    pub fn probe(&self, line: u64) -> bool {
        self.slots[self.index(line)]
    }

    /// Clears every slot.
    pub fn clear(&mut self) {
        self.slots.fill(false);
    }
}

impl std::fmt::Debug for PollutionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollutionFilter")
            .field("entries", &self.slots.len())
            .field("set", &self.slots.iter().filter(|s| **s).count())
            .finish()
    }
}
