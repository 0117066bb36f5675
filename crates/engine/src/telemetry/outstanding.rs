//! Outstanding-prefetch table.
//!
//! A prefetch-only mirror of the host's miss-status holding registers.
//! Each entry records a line address whose prefetch has been issued but
//! whose fill has not yet been observed, plus a late-eligibility flag for
//! prefetches issued on the aggressive path. The table is fixed-size and
//! linearly scanned; insertion when full is a silent drop, which caps the
//! number of concurrently tracked prefetches.

/// A single tracked prefetch.
#[derive(Clone, Copy, Default)]
struct OutstandingEntry {
    /// Line address (byte address shifted by the line size).
    line: u64,
    /// Entry holds live data.
    valid: bool,
    /// Lateness accounting applies to this prefetch.
    late: bool,
}

/// Fixed-capacity table of outstanding (unresolved) prefetches.
///
/// Invariant: at most one valid entry exists per line address. The
/// linear-scan dedup in [`register`](Self::register) enforces this.
pub struct OutstandingTable {
    entries: Vec<OutstandingEntry>,
}

impl OutstandingTable {
    /// Creates an empty table with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![OutstandingEntry::default(); capacity],
        }
    }

    fn position(&self, line: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.valid && e.line == line)
    }

    /// Tracks a newly issued prefetch for `line`.
    ///
    /// No-op if the line is already tracked. Silently drops the request
    /// when the table is full: an untracked prefetch still fills the
    /// cache, it just stops contributing to lateness accounting.
    pub fn register(&mut self, line: u64, late: bool) {
        if self.position(line).is_some() {
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| !e.valid) {
            *entry = OutstandingEntry {
                line,
                valid: true,
                late,
            };
        }
    }

    /// Resolves the entry for `line` on a fill, invalidating it.
    ///
    /// Returns the late flag of the resolved entry, or `None` if the fill
    /// was a demand miss or an untracked prefetch.
    pub fn resolve(&mut self, line: u64) -> Option<bool> {
        let idx = self.position(line)?;
        let late = self.entries[idx].late;
        self.entries[idx] = OutstandingEntry::default();
        Some(late)
    }

    /// Tests whether `line` is tracked, without mutating the table.
    ///
    /// Returns the entry's late flag when found.
    pub fn lookup(&self, line: u64) -> Option<bool> {
        self.position(line)
            .map(|idx| self.entries[idx].late)
    }

    /// Consumes the late flag of a tracked entry on the miss path.
    ///
    /// Returns `true` at most once per registered-late entry. Only the
    /// flag is cleared; the entry stays valid until a fill resolves it,
    /// so the fill that eventually arrives no longer sets the slot's
    /// usefulness bit (credit was already taken here).
    pub fn consume_late(&mut self, line: u64) -> bool {
        let Some(idx) = self.position(line) else {
            return false;
        };
        let was_late = self.entries[idx].late;
        self.entries[idx].late = false;
        was_late
    }

    /// Number of valid entries.
    pub fn occupancy(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Invalidates every entry.
    pub fn clear(&mut self) {
        self.entries.fill(OutstandingEntry::default());
    }
}

impl std::fmt::Debug for OutstandingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutstandingTable")
            .field("capacity", &self.capacity())
            .field("occupancy", &self.occupancy())
            .finish()
    }
}
