//! Stream Detector Tests.
//!
//! Verifies direction training within the window, confidence reset on
//! reversal, frontier-driven prefetching up to the page edge, and the
//! far-tier fallback under miss-handling pressure.

use prefetch_core::FillLevel;
use prefetch_core::config::StreamConfig;
use prefetch_core::control::Aggressiveness;
use prefetch_core::detect::{Access, PatternDetector, StreamDetector};
use prefetch_core::telemetry::OutstandingTable;

use crate::common::{MockHost, line_addr};

const PAGE: u64 = 7;

fn detector() -> StreamDetector {
    StreamDetector::new(&StreamConfig::default())
}

fn observe(
    det: &mut StreamDetector,
    host: &mut MockHost,
    out: &mut OutstandingTable,
    page: u64,
    offset: u64,
) {
    let access = Access {
        addr: line_addr(page, offset),
        ip: 0x400_000,
        hit: false,
    };
    det.observe(&access, host, out);
}

// ══════════════════════════════════════════════════════════
// 1. Training and confidence
// ══════════════════════════════════════════════════════════

/// Sequential accesses 10,11,12 on a fresh page: the third access
/// reaches confidence 2 and prefetches offsets 13 and 14 (degree 2).
#[test]
fn ascending_stream_prefetches_ahead() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 10);
    observe(&mut det, &mut host, &mut out, PAGE, 11);
    assert!(host.issued.is_empty(), "confidence 1 is not enough");

    observe(&mut det, &mut host, &mut out, PAGE, 12);
    assert_eq!(
        host.targets(),
        vec![line_addr(PAGE, 13), line_addr(PAGE, 14)]
    );
}

/// Descending accesses mirror the ascending case.
#[test]
fn descending_stream_prefetches_behind() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 40);
    observe(&mut det, &mut host, &mut out, PAGE, 39);
    observe(&mut det, &mut host, &mut out, PAGE, 38);

    assert_eq!(
        host.targets(),
        vec![line_addr(PAGE, 37), line_addr(PAGE, 36)]
    );
}

/// A direction reversal resets confidence to zero and retrains.
#[test]
fn reversal_resets_confidence() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 10);
    observe(&mut det, &mut host, &mut out, PAGE, 11);
    observe(&mut det, &mut host, &mut out, PAGE, 12); // locked, frontier runs to 14

    host.issued.clear();
    observe(&mut det, &mut host, &mut out, PAGE, 13); // below frontier: reversal
    assert!(host.issued.is_empty(), "reversal must drop the lock");

    observe(&mut det, &mut host, &mut out, PAGE, 12); // descending, confidence 1
    assert!(host.issued.is_empty());
    observe(&mut det, &mut host, &mut out, PAGE, 11); // descending, confidence 2
    assert_eq!(
        host.targets(),
        vec![line_addr(PAGE, 10), line_addr(PAGE, 9)],
        "retrained descending stream prefetches behind"
    );
}

/// Accesses at or beyond the training window neither train nor move the
/// frontier.
#[test]
fn out_of_window_accesses_do_not_train() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 0);
    // Window is 16 at the initial level; jumps of >= 16 are ignored.
    observe(&mut det, &mut host, &mut out, PAGE, 20);
    observe(&mut det, &mut host, &mut out, PAGE, 40);
    observe(&mut det, &mut host, &mut out, PAGE, 60);

    assert!(host.issued.is_empty());
    assert_eq!(out.occupancy(), 0);
}

// ══════════════════════════════════════════════════════════
// 2. Page edge
// ══════════════════════════════════════════════════════════

/// The frontier stops at offset 63; no prefetch leaves the page.
#[test]
fn frontier_stops_at_page_end() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 61);
    observe(&mut det, &mut host, &mut out, PAGE, 62);
    observe(&mut det, &mut host, &mut out, PAGE, 63);

    // Degree 2 would want 64 and 65; both are off the page.
    assert!(host.issued.is_empty());
}

/// The mirrored stop at offset 0 for descending streams.
#[test]
fn frontier_stops_at_page_start() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 2);
    observe(&mut det, &mut host, &mut out, PAGE, 1);
    observe(&mut det, &mut host, &mut out, PAGE, 0);

    assert!(host.issued.is_empty());
}

/// Near the edge, the advance loop issues what fits and stops.
#[test]
fn partial_advance_at_page_end() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 60);
    observe(&mut det, &mut host, &mut out, PAGE, 61);
    observe(&mut det, &mut host, &mut out, PAGE, 62);

    // Only offset 63 fits; 64 is off the page.
    assert_eq!(host.targets(), vec![line_addr(PAGE, 63)]);
}

// ══════════════════════════════════════════════════════════
// 3. Tier selection and tracking
// ══════════════════════════════════════════════════════════

/// Under low occupancy prefetches go near-tier and are registered
/// late-eligible.
#[test]
fn near_tier_prefetches_are_tracked() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));

    observe(&mut det, &mut host, &mut out, PAGE, 10);
    observe(&mut det, &mut host, &mut out, PAGE, 11);
    observe(&mut det, &mut host, &mut out, PAGE, 12);

    assert_eq!(out.lookup(line_addr(PAGE, 13) >> 6), Some(true));
    assert_eq!(out.lookup(line_addr(PAGE, 14) >> 6), Some(true));
}

/// Occupancy above the threshold drops to the far tier, untracked.
#[test]
fn far_tier_under_pressure_is_untracked() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));
    host.occupancy = 9;

    observe(&mut det, &mut host, &mut out, PAGE, 10);
    observe(&mut det, &mut host, &mut out, PAGE, 11);
    observe(&mut det, &mut host, &mut out, PAGE, 12);

    assert_eq!(host.issued.len(), 2);
    assert!(host.issued.iter().all(|p| p.fill == FillLevel::Far));
    assert_eq!(out.occupancy(), 0);
}

/// A target already resident in the tracked cache is issued but not
/// registered; the advance continues past it.
#[test]
fn resident_targets_skip_registration() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));
    host.place(line_addr(PAGE, 13), 4, 2);

    observe(&mut det, &mut host, &mut out, PAGE, 10);
    observe(&mut det, &mut host, &mut out, PAGE, 11);
    observe(&mut det, &mut host, &mut out, PAGE, 12);

    // Both targets are issued near-tier...
    assert_eq!(host.near_targets().len(), 2);
    // ...but only the non-resident one is tracked.
    assert_eq!(out.lookup(line_addr(PAGE, 13) >> 6), None);
    assert_eq!(out.lookup(line_addr(PAGE, 14) >> 6), Some(true));
}

// ══════════════════════════════════════════════════════════
// 4. Replacement and reconfiguration
// ══════════════════════════════════════════════════════════

/// Round-robin replacement evicts in allocation order, not recency.
#[test]
fn round_robin_replacement() {
    let config = StreamConfig {
        detectors: 2,
        ..StreamConfig::default()
    };
    let mut det = StreamDetector::new(&config);
    let (mut host, mut out) = (MockHost::new(), OutstandingTable::new(64));

    // Train page 7 to a lock on detector 0, page 8 occupies detector 1.
    for offset in [10, 11, 12] {
        observe(&mut det, &mut host, &mut out, PAGE, offset);
    }
    observe(&mut det, &mut host, &mut out, 8, 0);
    // Page 9 claims the rotation cursor (detector 0), evicting page 7's
    // trained state even though page 7 is the more recent stream.
    observe(&mut det, &mut host, &mut out, 9, 0);

    host.issued.clear();
    observe(&mut det, &mut host, &mut out, PAGE, 13);
    assert!(
        host.issued.is_empty(),
        "page 7 was reallocated fresh; a single access cannot re-lock"
    );
}

/// Reconfiguring applies both the degree and the window of the level.
#[test]
fn reconfigure_applies_degree_and_window() {
    let (mut det, mut host, mut out) = (detector(), MockHost::new(), OutstandingTable::new(64));
    det.reconfigure(Aggressiveness::MIN);

    // Window is 4 at the minimum level: the jump to 15 does not train
    // and the frontier stays at 10.
    observe(&mut det, &mut host, &mut out, PAGE, 10);
    observe(&mut det, &mut host, &mut out, PAGE, 15);
    // In-window steps rebuild confidence from the old frontier.
    observe(&mut det, &mut host, &mut out, PAGE, 12);
    observe(&mut det, &mut host, &mut out, PAGE, 13);

    // Degree is 1: the lock issues a single line ahead of the frontier.
    assert_eq!(host.targets(), vec![line_addr(PAGE, 14)]);
}