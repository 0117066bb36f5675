//! Configuration system for the prefetch engine.
//!
//! This module defines all configuration structures used to parameterize
//! the engine. It provides:
//! 1. **Defaults:** Baseline table sizes and thresholds matching the
//!    reference configuration.
//! 2. **Structures:** Hierarchical config for geometry, detectors, and
//!    the feedback interval.
//! 3. **Validation:** Construction-time checks for capacities the engine
//!    cannot sanitize on its own.
//!
//! Configuration is supplied by the host (deserialized from JSON) or via
//! `EngineConfig::default()`.

use serde::Deserialize;
use thiserror::Error;

/// Default configuration constants for the engine.
///
/// These values define the reference configuration when not explicitly
/// overridden by the host.
mod defaults {
    /// Cache sets in the tracked level (256 sets × 8 ways = 128 KiB of
    /// 64-byte lines).
    pub const SET_COUNT: usize = 256;

    /// Cache associativity of the tracked level.
    pub const ASSOCIATIVITY: usize = 8;

    /// Entries in the outstanding-prefetch table.
    ///
    /// Sized to the host's maximum concurrent miss-handling capacity so
    /// registration pressure, not capacity, is the limiting factor.
    pub const OUTSTANDING_ENTRIES: usize = 2048;

    /// Entries in the hashed pollution filter (must be a power of two).
    pub const POLLUTION_ENTRIES: usize = 4096;

    /// Fill events per feedback-controller step.
    pub const FEEDBACK_INTERVAL: u32 = 512;

    /// Resident page entries in the access-map detector.
    pub const PAGE_ENTRIES: usize = 64;

    /// Occupancy below which forward access-map prefetches go near-tier.
    pub const NEAR_FORWARD_OCCUPANCY: usize = 8;

    /// Occupancy below which backward access-map prefetches go near-tier.
    pub const NEAR_BACKWARD_OCCUPANCY: usize = 12;

    /// Stream detectors available for round-robin allocation.
    pub const STREAM_DETECTORS: usize = 64;

    /// Occupancy above which stream prefetches fall back to the far tier.
    pub const STREAM_FAR_OCCUPANCY: usize = 8;
}

/// Pattern-detection strategy driving prefetch decisions.
///
/// Exactly one detector is active per engine instance, chosen at
/// construction time. Both share the same outstanding/usefulness/
/// pollution infrastructure and feedback controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DetectorKind {
    /// Access-map pattern matching over per-page bit vectors.
    ///
    /// Detects strides repeated twice in either direction within a page.
    #[default]
    AccessMap,
    /// Per-page monotonic stream direction tracking.
    ///
    /// Prefetches ahead of a detected ascending or descending stream.
    Stream,
}

/// Geometry of the tracked cache level.
///
/// The engine keeps one usefulness bit per `(set, way)` slot, so it must
/// agree with the host about these dimensions; a `fill` outside them is a
/// fatal contract violation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CacheGeometry {
    /// Number of sets in the tracked cache level.
    pub sets: usize,
    /// Number of ways per set.
    pub ways: usize,
}

impl Default for CacheGeometry {
    fn default() -> Self {
        Self {
            sets: defaults::SET_COUNT,
            ways: defaults::ASSOCIATIVITY,
        }
    }
}

/// Tuning for the access-map detector.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AccessMapConfig {
    /// Resident page entries (LRU-replaced).
    pub page_entries: usize,
    /// Forward-direction prefetches go near-tier while the host's
    /// tracked occupancy is below this threshold.
    pub near_forward_occupancy: usize,
    /// Backward-direction prefetches go near-tier (and are registered as
    /// late-eligible) while occupancy is below this threshold.
    pub near_backward_occupancy: usize,
}

impl Default for AccessMapConfig {
    fn default() -> Self {
        Self {
            page_entries: defaults::PAGE_ENTRIES,
            near_forward_occupancy: defaults::NEAR_FORWARD_OCCUPANCY,
            near_backward_occupancy: defaults::NEAR_BACKWARD_OCCUPANCY,
        }
    }
}

/// Tuning for the stream detector.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Detector entries (round-robin replaced).
    pub detectors: usize,
    /// Prefetches fall back to the far tier while the host's tracked
    /// occupancy exceeds this threshold.
    pub far_occupancy: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            detectors: defaults::STREAM_DETECTORS,
            far_occupancy: defaults::STREAM_FAR_OCCUPANCY,
        }
    }
}

/// Host-provided simulation knobs.
///
/// These are opaque to the engine: they do not gate any behavior and are
/// echoed once at initialization so runs can be told apart in logs.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct HostKnobs {
    /// Host load-scrambling knob.
    pub scramble_loads: i64,
    /// Host small-LLC knob.
    pub small_llc: i64,
    /// Host low-bandwidth knob.
    pub low_bandwidth: i64,
}

/// Root engine configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Which pattern detector to construct.
    pub detector: DetectorKind,
    /// Tracked cache geometry.
    pub geometry: CacheGeometry,
    /// Outstanding-prefetch table capacity.
    pub outstanding_entries: usize,
    /// Pollution filter size (power of two).
    pub pollution_entries: usize,
    /// Fill events between feedback-controller steps.
    pub feedback_interval: u32,
    /// Access-map detector tuning.
    pub access_map: AccessMapConfig,
    /// Stream detector tuning.
    pub stream: StreamConfig,
    /// Opaque host knobs, echoed at initialization.
    pub knobs: HostKnobs,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            geometry: CacheGeometry::default(),
            outstanding_entries: defaults::OUTSTANDING_ENTRIES,
            pollution_entries: defaults::POLLUTION_ENTRIES,
            feedback_interval: defaults::FEEDBACK_INTERVAL,
            access_map: AccessMapConfig::default(),
            stream: StreamConfig::default(),
            knobs: HostKnobs::default(),
        }
    }
}

/// Errors detectable when validating an [`EngineConfig`].
///
/// All of these indicate a host-side configuration mistake; the engine
/// has no meaningful fallback for them, so construction refuses to
/// proceed rather than guessing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Cache geometry with zero sets or zero ways.
    #[error("cache geometry must be non-zero (got {sets} sets x {ways} ways)")]
    ZeroGeometry {
        /// Configured set count.
        sets: usize,
        /// Configured way count.
        ways: usize,
    },
    /// Outstanding-prefetch table with no entries.
    #[error("outstanding-prefetch table must have at least one entry")]
    EmptyOutstandingTable,
    /// Pollution filter size that is zero or not a power of two.
    #[error("pollution filter size must be a non-zero power of two (got {0})")]
    BadPollutionSize(usize),
    /// Feedback interval of zero fills.
    #[error("feedback interval must be at least one fill")]
    ZeroInterval,
    /// Detector table with no entries.
    #[error("{0} detector table must have at least one entry")]
    EmptyDetectorTable(&'static str),
}

impl EngineConfig {
    /// Checks table capacities and geometry for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geometry.sets == 0 || self.geometry.ways == 0 {
            return Err(ConfigError::ZeroGeometry {
                sets: self.geometry.sets,
                ways: self.geometry.ways,
            });
        }
        if self.outstanding_entries == 0 {
            return Err(ConfigError::EmptyOutstandingTable);
        }
        if self.pollution_entries == 0 || !self.pollution_entries.is_power_of_two() {
            return Err(ConfigError::BadPollutionSize(self.pollution_entries));
        }
        if self.feedback_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.access_map.page_entries == 0 {
            return Err(ConfigError::EmptyDetectorTable("access-map"));
        }
        if self.stream.detectors == 0 {
            return Err(ConfigError::EmptyDetectorTable("stream"));
        }
        Ok(())
    }
}
