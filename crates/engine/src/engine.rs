//! Engine top level.
//!
//! [`PrefetchEngine`] wires one pattern detector to the shared telemetry
//! and the feedback controller, and exposes the two entry points the
//! host cache simulator drives: [`operate`](PrefetchEngine::operate) on
//! every access and [`fill`](PrefetchEngine::fill) on every line
//! insertion. All state is owned by the instance; independent engines
//! (one per simulated core) do not interfere.

use crate::addr;
use crate::config::{ConfigError, DetectorKind, EngineConfig};
use crate::control::{Aggressiveness, FeedbackController};
use crate::detect::{Access, AccessMapDetector, PatternDetector, StreamDetector};
use crate::host::CacheHost;
use crate::telemetry::{IntervalCounters, OutstandingTable, Telemetry};

/// Read-only snapshot of engine state, for reporting.
#[derive(Debug, Clone, Copy)]
pub struct EngineSnapshot {
    /// Current aggressiveness level.
    pub level: u8,
    /// Valid entries in the outstanding-prefetch table.
    pub outstanding: usize,
    /// Total evictions observed since construction.
    pub evictions: u64,
}

/// The prefetch decision engine.
pub struct PrefetchEngine {
    detector: Box<dyn PatternDetector>,
    outstanding: OutstandingTable,
    telemetry: Telemetry,
    controller: FeedbackController,
    sets: usize,
    ways: usize,
    feedback_interval: u32,
    fills_in_interval: u32,
}

impl PrefetchEngine {
    /// Constructs an engine with all tables reset and the detector
    /// configured for the initial aggressiveness level.
    ///
    /// Logs the active detector and echoes the host knobs, so runs can
    /// be told apart from the trace alone.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration fails validation.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let controller = FeedbackController::new();
        let mut detector: Box<dyn PatternDetector> = match config.detector {
            DetectorKind::AccessMap => Box::new(AccessMapDetector::new(&config.access_map)),
            DetectorKind::Stream => Box::new(StreamDetector::new(&config.stream)),
        };
        detector.reconfigure(controller.level());

        tracing::info!(
            detector = detector.name(),
            level = controller.level().level(),
            "prefetch engine initialized"
        );
        tracing::info!(
            scramble_loads = config.knobs.scramble_loads,
            small_llc = config.knobs.small_llc,
            low_bandwidth = config.knobs.low_bandwidth,
            "host knobs visible to the prefetcher"
        );

        Ok(Self {
            detector,
            outstanding: OutstandingTable::new(config.outstanding_entries),
            telemetry: Telemetry::new(
                config.geometry.sets,
                config.geometry.ways,
                config.pollution_entries,
            ),
            controller,
            sets: config.geometry.sets,
            ways: config.geometry.ways,
            feedback_interval: config.feedback_interval,
            fills_in_interval: 0,
        })
    }

    /// Observes one demand access, called by the host before it resolves
    /// the access.
    ///
    /// Updates the usefulness/lateness/pollution counters from the
    /// hit/miss outcome, then lets the active detector train and issue
    /// prefetches through `host`.
    ///
    /// # Panics
    ///
    /// Panics if a hit cannot be located by the host or lands outside
    /// the configured geometry; either means the host and the engine
    /// have desynchronized, which is not locally repairable.
    pub fn operate(&mut self, host: &mut dyn CacheHost, addr: u64, ip: u64, hit: bool) {
        tracing::trace!(addr, ip, hit, "operate");

        if hit {
            let Some((set, way)) = host.locate(addr) else {
                panic!("host reported a hit at {addr:#x} but cannot locate the line");
            };
            assert!(
                set < self.sets && way < self.ways,
                "hit slot ({set}, {way}) outside configured geometry"
            );
            self.telemetry.record_hit(set, way);
        } else {
            self.telemetry
                .record_miss(addr::line_of(addr), &mut self.outstanding);
        }

        let access = Access { addr, ip, hit };
        self.detector
            .observe(&access, host, &mut self.outstanding);
    }

    /// Records one line insertion into the tracked cache level, called
    /// by the host after the new line is committed.
    ///
    /// `evicted_addr` is 0 when the fill evicted nothing. Every
    /// `feedback_interval` fills the controller runs one feedback step
    /// and the detector is reconfigured to the resulting level.
    ///
    /// # Panics
    ///
    /// Panics if `(set, way)` is outside the configured geometry.
    pub fn fill(
        &mut self,
        addr: u64,
        set: usize,
        way: usize,
        was_prefetch: bool,
        evicted_addr: u64,
    ) {
        assert!(set < self.sets, "fill set {set} >= {}", self.sets);
        assert!(way < self.ways, "fill way {way} >= {}", self.ways);

        let evicted_line = (evicted_addr != 0).then(|| addr::line_of(evicted_addr));
        self.telemetry.record_fill(
            addr::line_of(addr),
            set,
            way,
            was_prefetch,
            evicted_line,
            &mut self.outstanding,
        );

        self.fills_in_interval += 1;
        if self.fills_in_interval >= self.feedback_interval {
            self.fills_in_interval = 0;
            let raw = self.telemetry.take_interval();
            let level = self.controller.update(&raw);
            self.detector.reconfigure(level);
        }
    }

    /// Periodic reporting hook; logs a telemetry snapshot.
    pub fn heartbeat(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            level = snapshot.level,
            outstanding = snapshot.outstanding,
            evictions = snapshot.evictions,
            "heartbeat"
        );
    }

    /// Warmup-complete hook; logs the state the measured run starts from.
    pub fn warmup_complete(&self) {
        let (used, prefetched, late, miss, miss_prefetch) = self.controller.totals();
        tracing::info!(
            level = self.controller.level().level(),
            used,
            prefetched,
            late,
            miss,
            miss_prefetch,
            "warmup complete"
        );
    }

    /// End-of-run hook; logs final smoothed totals.
    pub fn final_stats(&self) {
        let (used, prefetched, late, miss, miss_prefetch) = self.controller.totals();
        tracing::info!(
            level = self.controller.level().level(),
            used,
            prefetched,
            late,
            miss,
            miss_prefetch,
            evictions = self.telemetry.evictions(),
            "final stats"
        );
    }

    /// Current aggressiveness level.
    pub const fn aggressiveness(&self) -> Aggressiveness {
        self.controller.level()
    }

    /// Raw counters for the interval in progress, for diagnostics.
    pub const fn interval_counters(&self) -> &IntervalCounters {
        self.telemetry.counters()
    }

    /// Point-in-time snapshot for reporting.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            level: self.controller.level().level(),
            outstanding: self.outstanding.occupancy(),
            evictions: self.telemetry.evictions(),
        }
    }

    /// Whether `line` currently has a tracked outstanding prefetch.
    ///
    /// Diagnostic accessor; the miss path consumes lateness internally.
    pub fn is_outstanding(&self, line: u64) -> bool {
        self.outstanding.lookup(line).is_some()
    }
}

impl std::fmt::Debug for PrefetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchEngine")
            .field("detector", &self.detector.name())
            .field("level", &self.controller.level().level())
            .field("sets", &self.sets)
            .field("ways", &self.ways)
            .finish()
    }
}
