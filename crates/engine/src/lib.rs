//! Adaptive cache-prefetch decision engine.
//!
//! This crate implements the prediction and feedback core of a hardware
//! prefetcher attached to a mid-level cache, with the following:
//! 1. **Detectors:** Two interchangeable pattern detectors — an access-map
//!    (AMPM-style) page-bitmap matcher and a per-page stream direction
//!    tracker — selected at construction time.
//! 2. **Telemetry:** An outstanding-prefetch table, per-slot usefulness
//!    bits, and a hashed pollution filter that together attribute hits,
//!    misses, and evictions to prefetch decisions.
//! 3. **Control:** A five-level aggressiveness controller that folds
//!    interval counters into smoothed accuracy/lateness/pollution metrics
//!    and reconfigures the active detector.
//! 4. **Host boundary:** The [`CacheHost`] trait, through which the engine
//!    issues prefetch requests and queries occupancy, time, and placement.
//!
//! The engine is synchronous and single-threaded: the host calls
//! [`PrefetchEngine::operate`] once per cache access and
//! [`PrefetchEngine::fill`] once per line insertion, and every call
//! completes before the next is issued.

/// Line/page/offset address arithmetic shared by all components.
pub mod addr;
/// Engine configuration (defaults, detector selection, validation).
pub mod config;
/// Aggressiveness level and the closed-loop feedback controller.
pub mod control;
/// Pattern detectors (access-map and stream) and their shared trait.
pub mod detect;
/// Engine top level: `operate`/`fill` entry points and lifecycle hooks.
pub mod engine;
/// Host-simulator boundary (`CacheHost` trait, fill tiers).
pub mod host;
/// Usefulness, pollution, and interval-counter bookkeeping.
pub mod telemetry;

/// Root configuration type; use `EngineConfig::default()` or deserialize from JSON.
pub use crate::config::EngineConfig;
/// Host callback interface the cache simulator must implement.
pub use crate::host::{CacheHost, FillLevel};
/// Main engine type; owns detectors, telemetry, and the controller.
pub use crate::engine::PrefetchEngine;
