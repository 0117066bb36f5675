//! Access-map pattern-matching detector.
//!
//! Tracks a small set of resident 4 KiB pages, each with a 64-bit access
//! map (one bit per line offset) and a parallel prefetch map. On every
//! access the detector scans for strides repeated twice — forward and
//! backward — and prefetches one stride ahead of the access. This is a
//! page-scoped variant of the Access Map Pattern Matching design: no
//! per-instruction state, just the spatial footprint of each page.
//!
//! Tier policy: forward prefetches go near-tier while miss-handling
//! occupancy is low but are never tracked; backward prefetches tolerate
//! more occupancy and are registered late-eligible, so the backward
//! direction carries the lateness signal for the feedback loop.

use super::{Access, PatternDetector};
use crate::addr;
use crate::config::AccessMapConfig;
use crate::control::Aggressiveness;
use crate::host::{CacheHost, FillLevel};
use crate::telemetry::OutstandingTable;

/// Longest stride the scans consider, in line offsets.
const MAX_STRIDE: i32 = 16;

/// State for one resident page.
#[derive(Clone, Copy, Default)]
struct PageMapEntry {
    /// Page number being tracked.
    page: u64,
    /// One bit per line offset, set once that offset was accessed.
    access_map: u64,
    /// One bit per line offset, set once that offset was prefetched.
    prefetch_map: u64,
    /// Host cycle of the last touch, for LRU replacement.
    last_touched: u64,
}

const fn bit(map: u64, offset: i32) -> bool {
    (map >> offset) & 1 == 1
}

/// Access-map detector state.
pub struct AccessMapDetector {
    pages: Vec<PageMapEntry>,
    degree: usize,
    near_forward_occupancy: usize,
    near_backward_occupancy: usize,
}

impl AccessMapDetector {
    /// Creates a detector with all page entries reset and the reference
    /// initial degree.
    pub fn new(config: &AccessMapConfig) -> Self {
        Self {
            pages: vec![PageMapEntry::default(); config.page_entries],
            degree: Aggressiveness::default().prefetch_degree(),
            near_forward_occupancy: config.near_forward_occupancy,
            near_backward_occupancy: config.near_backward_occupancy,
        }
    }

    /// Finds the entry for `page`, or evicts the LRU entry and resets it.
    fn resolve_page(&mut self, page: u64, now: u64) -> usize {
        let index = match self.pages.iter().position(|e| e.page == page) {
            Some(index) => index,
            None => {
                let lru = self
                    .pages
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.last_touched)
                    .map_or(0, |(i, _)| i);
                self.pages[lru] = PageMapEntry {
                    page,
                    ..PageMapEntry::default()
                };
                lru
            }
        };
        self.pages[index].last_touched = now;
        index
    }

    /// Runs one directional scan and issues up to `degree` prefetches.
    ///
    /// `direction` is +1 for the forward scan and -1 for the backward
    /// mirror. A target is issued only when the stride behind it is
    /// confirmed twice (`offset - i` and `offset - 2i` in scan space).
    fn scan(
        &mut self,
        index: usize,
        offset: i32,
        direction: i32,
        trigger: u64,
        host: &mut dyn CacheHost,
        outstanding: &mut OutstandingTable,
    ) {
        let mut issued = 0;
        for i in 1..=MAX_STRIDE {
            let confirm1 = offset - direction * i;
            let confirm2 = offset - direction * 2 * i;
            let target = offset + direction * i;

            if !(0..=addr::MAX_OFFSET).contains(&confirm2)
                || !(0..=addr::MAX_OFFSET).contains(&target)
            {
                break;
            }
            if issued >= self.degree {
                break;
            }

            let entry = &self.pages[index];
            if bit(entry.access_map, target) || bit(entry.prefetch_map, target) {
                continue;
            }
            if !(bit(entry.access_map, confirm1) && bit(entry.access_map, confirm2)) {
                continue;
            }

            // Stride repeated twice: issue one prefetch ahead of it.
            let target_addr = addr::compose(entry.page, target);
            if direction > 0 {
                if host.tracked_occupancy() < self.near_forward_occupancy {
                    host.prefetch_line(trigger, target_addr, FillLevel::Near);
                } else {
                    host.prefetch_line(trigger, target_addr, FillLevel::Far);
                }
            } else if host.tracked_occupancy() < self.near_backward_occupancy {
                host.prefetch_line(trigger, target_addr, FillLevel::Near);
                outstanding.register(addr::line_of(target_addr), true);
            } else {
                host.prefetch_line(trigger, target_addr, FillLevel::Far);
            }

            self.pages[index].prefetch_map |= 1 << target;
            issued += 1;
        }
    }
}

impl PatternDetector for AccessMapDetector {
    fn name(&self) -> &'static str {
        "access-map"
    }

    /// Marks the accessed offset in its page map and runs the forward
    /// and backward stride scans.
    fn observe(
        &mut self,
        access: &Access,
        host: &mut dyn CacheHost,
        outstanding: &mut OutstandingTable,
    ) {
        let page = addr::page_of(access.addr);
        let offset = addr::page_offset(access.addr);

        let index = self.resolve_page(page, host.current_cycle());
        self.pages[index].access_map |= 1 << offset;

        self.scan(index, offset, 1, access.addr, host, outstanding);
        self.scan(index, offset, -1, access.addr, host, outstanding);
    }

    fn reconfigure(&mut self, level: Aggressiveness) {
        self.degree = level.prefetch_degree();
    }
}

impl std::fmt::Debug for AccessMapDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessMapDetector")
            .field("pages", &self.pages.len())
            .field("degree", &self.degree)
            .finish()
    }
}
