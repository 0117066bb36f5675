//! Boundary contract with the host cache simulator.
//!
//! The engine never touches cache data or timing itself. Everything it
//! needs from the surrounding simulation — issuing a prefetch, reading
//! miss-handling occupancy, coarse time, and line placement — goes through
//! the [`CacheHost`] trait, implemented by the simulator that owns the
//! tracked cache level.

/// Destination tier for an issued prefetch.
///
/// The near tier is the tracked cache level itself: faster, but it
/// consumes miss-handling resources and its fills are monitored for
/// usefulness. The far tier is the next level down: safer under pressure,
/// and its fills are not monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillLevel {
    /// Fill into the tracked cache level.
    Near,
    /// Fill into the next cache level down (e.g. the LLC).
    Far,
}

/// Callbacks the host cache simulator provides to the engine.
///
/// All methods are invoked synchronously from inside
/// [`operate`](crate::PrefetchEngine::operate). None of the queries are
/// assumed to be cheap; the engine calls them only when a decision
/// actually depends on the answer.
pub trait CacheHost {
    /// Requests a prefetch of the line containing `target` into `fill`.
    ///
    /// `trigger` is the demand address whose observation produced this
    /// request, passed through for the host's own bookkeeping.
    fn prefetch_line(&mut self, trigger: u64, target: u64, fill: FillLevel);

    /// Returns the current occupancy of the host's miss-handling
    /// registers for the tracked cache level.
    fn tracked_occupancy(&self) -> usize;

    /// Returns the host's coarse cycle counter.
    ///
    /// Used only as a monotonic timestamp for page-entry LRU replacement.
    fn current_cycle(&self) -> u64;

    /// Returns the `(set, way)` currently holding `addr` in the tracked
    /// cache level, or `None` if the line is not resident.
    fn locate(&self, addr: u64) -> Option<(usize, usize)>;
}
