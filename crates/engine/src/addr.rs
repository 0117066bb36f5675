//! Address arithmetic for lines, pages, and page offsets.
//!
//! The engine works on 64-byte cache lines grouped into 4 KiB pages, so a
//! page holds 64 lines and a line offset within a page fits in 6 bits.
//! These widths are fixed: the detectors' bit-vector state and the scan
//! bounds in the access-map matcher are all sized to 64 lines per page.

/// log2 of the cache-line size in bytes.
pub const LINE_SHIFT: u32 = 6;

/// log2 of the page size in bytes.
pub const PAGE_SHIFT: u32 = 12;

/// Number of cache lines per page.
pub const LINES_PER_PAGE: usize = 64;

/// Highest valid line offset within a page.
pub const MAX_OFFSET: i32 = LINES_PER_PAGE as i32 - 1;

/// Returns the line address (byte address shifted by the line size).
#[inline]
pub const fn line_of(addr: u64) -> u64 {
    addr >> LINE_SHIFT
}

/// Returns the page number containing `addr`.
#[inline]
pub const fn page_of(addr: u64) -> u64 {
    addr >> PAGE_SHIFT
}

/// Returns the line offset of `addr` within its page, in `0..64`.
#[inline]
pub const fn page_offset(addr: u64) -> i32 {
    ((addr >> LINE_SHIFT) & (LINES_PER_PAGE as u64 - 1)) as i32
}

/// Reassembles a byte address from a page number and a line offset.
///
/// The offset must be a valid page offset (`0..=63`).
#[inline]
pub const fn compose(page: u64, offset: i32) -> u64 {
    (page << PAGE_SHIFT) | ((offset as u64) << LINE_SHIFT)
}
