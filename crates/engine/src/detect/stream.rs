//! Stream direction detector.
//!
//! Maintains one detector per recently seen 4 KiB page, replaced in
//! round-robin order. Each detector trains on the direction of movement
//! between the page's frontier offset and each new access: two pieces of
//! consistent in-window evidence lock the stream, after which the
//! frontier runs ahead of the accesses and every advance issues one
//! prefetch. A direction reversal restarts training from zero.
//!
//! Tier policy: under miss-handling pressure prefetches drop to the far
//! tier untracked; otherwise they go near-tier and are registered
//! late-eligible, except when the host already holds the target line.

use super::{Access, PatternDetector};
use crate::addr;
use crate::config::StreamConfig;
use crate::control::Aggressiveness;
use crate::host::{CacheHost, FillLevel};
use crate::telemetry::OutstandingTable;

/// Confidence needed before prefetching begins.
const CONFIDENCE_THRESHOLD: u32 = 2;

/// State for one monitored page.
#[derive(Clone, Copy)]
struct StreamEntry {
    /// Page number being monitored.
    page: u64,
    /// Stream direction: -1, 0 (untrained), or +1.
    direction: i32,
    /// Consistent-evidence counter; never decremented, only reset.
    confidence: u32,
    /// Last line offset either accessed or prefetched-to.
    frontier: i32,
}

impl Default for StreamEntry {
    fn default() -> Self {
        Self {
            page: 0,
            direction: 0,
            confidence: 0,
            frontier: -1,
        }
    }
}

/// Stream detector state.
pub struct StreamDetector {
    detectors: Vec<StreamEntry>,
    /// Round-robin replacement cursor.
    cursor: usize,
    degree: usize,
    window: i32,
    far_occupancy: usize,
}

impl StreamDetector {
    /// Creates a detector set with the reference initial degree and
    /// window.
    pub fn new(config: &StreamConfig) -> Self {
        let initial = Aggressiveness::default();
        Self {
            detectors: vec![StreamEntry::default(); config.detectors],
            cursor: 0,
            degree: initial.prefetch_degree(),
            window: initial.stream_window(),
            far_occupancy: config.far_occupancy,
        }
    }

    /// Finds the detector for `page`, or claims the next one in
    /// rotation and restarts it at `offset`.
    fn resolve_detector(&mut self, page: u64, offset: i32) -> usize {
        if let Some(index) = self.detectors.iter().position(|d| d.page == page) {
            return index;
        }
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.detectors.len();
        self.detectors[index] = StreamEntry {
            page,
            direction: 0,
            confidence: 0,
            frontier: offset,
        };
        index
    }
}

impl PatternDetector for StreamDetector {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn observe(
        &mut self,
        access: &Access,
        host: &mut dyn CacheHost,
        outstanding: &mut OutstandingTable,
    ) {
        let page = addr::page_of(access.addr);
        let offset = addr::page_offset(access.addr);
        let (window, degree, far_occupancy) = (self.window, self.degree, self.far_occupancy);

        let index = self.resolve_detector(page, offset);
        let entry = &mut self.detectors[index];

        // Train. Accesses at or beyond the window do not touch the
        // detector; a reversal throws away accumulated confidence.
        if offset > entry.frontier && offset - entry.frontier < window {
            if entry.direction == -1 {
                entry.confidence = 0;
            } else {
                entry.confidence = entry.confidence.saturating_add(1);
            }
            entry.direction = 1;
            entry.frontier = offset;
        } else if offset < entry.frontier && entry.frontier - offset < window {
            if entry.direction == 1 {
                entry.confidence = 0;
            } else {
                entry.confidence = entry.confidence.saturating_add(1);
            }
            entry.direction = -1;
            entry.frontier = offset;
        }

        if entry.confidence < CONFIDENCE_THRESHOLD {
            return;
        }

        // Locked on: run the frontier ahead, one prefetch per advance,
        // stopping at the page edge.
        for _ in 0..degree {
            let next = entry.frontier + entry.direction;
            if !(0..=addr::MAX_OFFSET).contains(&next) {
                break;
            }
            entry.frontier = next;

            let target = addr::compose(page, next);
            if host.tracked_occupancy() > far_occupancy {
                // Miss-handling registers are scarce; fall back to the
                // far tier untracked.
                host.prefetch_line(access.addr, target, FillLevel::Far);
            } else {
                host.prefetch_line(access.addr, target, FillLevel::Near);
                if host.locate(target).is_none() {
                    outstanding.register(addr::line_of(target), true);
                }
            }
        }
    }

    fn reconfigure(&mut self, level: Aggressiveness) {
        self.degree = level.prefetch_degree();
        self.window = level.stream_window();
    }
}

impl std::fmt::Debug for StreamDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDetector")
            .field("detectors", &self.detectors.len())
            .field("degree", &self.degree)
            .field("window", &self.window)
            .finish()
    }
}
