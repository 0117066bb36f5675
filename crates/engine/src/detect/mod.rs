//! Pattern detectors.
//!
//! This module contains the interface and implementations of the two
//! prediction strategies that decide *what* to prefetch.

/// Access-map detector (per-page bitmap stride matching).
pub mod access_map;

/// Stream detector (per-page monotonic direction tracking).
pub mod stream;

pub use self::access_map::AccessMapDetector;
pub use self::stream::StreamDetector;

use crate::control::Aggressiveness;
use crate::host::CacheHost;
use crate::telemetry::OutstandingTable;

/// One demand access observed at the tracked cache level.
#[derive(Debug, Clone, Copy)]
pub struct Access {
    /// Accessed byte address.
    pub addr: u64,
    /// Instruction pointer of the access (diagnostic only).
    pub ip: u64,
    /// Whether the access hit in the tracked cache.
    pub hit: bool,
}

/// Trait for pattern-detector implementations.
///
/// A detector consumes one access at a time, updates its page state, and
/// may issue prefetch requests through the host. Prefetches it wants
/// lateness accounting for are registered in the shared
/// [`OutstandingTable`].
pub trait PatternDetector: Send + Sync {
    /// Human-readable detector name, for the initialization banner.
    fn name(&self) -> &'static str;

    /// Observes an access and issues zero or more prefetch requests.
    fn observe(
        &mut self,
        access: &Access,
        host: &mut dyn CacheHost,
        outstanding: &mut OutstandingTable,
    );

    /// Applies a new aggressiveness level to the detector's parameters.
    fn reconfigure(&mut self, level: Aggressiveness);
}
