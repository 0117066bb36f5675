//! Closed-loop aggressiveness control.
//!
//! Once per feedback interval the controller folds the raw interval
//! counters into exponentially smoothed totals, derives accuracy,
//! lateness, and pollution ratios, classifies them against fixed
//! thresholds, and steps a five-level aggressiveness state machine. The
//! level maps deterministically onto the active detector's prefetch
//! degree and, for the stream detector, its training window.

use crate::telemetry::IntervalCounters;

/// Smoothing factor for interval totals.
const ALPHA: f64 = 0.5;

/// Totals below this snap to zero to avoid floating drift.
const EPSILON: f64 = 1e-3;

/// Accuracy below this is classified low.
const ACCURACY_LOW: f64 = 0.40;

/// Accuracy at or above this is classified high.
const ACCURACY_HIGH: f64 = 0.75;

/// Lateness ratio at or above this is classified late.
const LATENESS_THRESHOLD: f64 = 0.01;

/// Pollution ratio at or above this is classified high.
const POLLUTION_THRESHOLD: f64 = 0.005;

/// Discrete aggressiveness level in `1..=5`.
///
/// The level is the controller's sole output; everything a detector
/// tunes per level is derived from it through
/// [`prefetch_degree`](Self::prefetch_degree) and
/// [`stream_window`](Self::stream_window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Aggressiveness(u8);

impl Aggressiveness {
    /// Most conservative level.
    pub const MIN: Self = Self(1);

    /// Most aggressive level.
    pub const MAX: Self = Self(5);

    /// Creates a level, clamping into `1..=5`.
    pub const fn new(level: u8) -> Self {
        if level < 1 {
            Self::MIN
        } else if level > 5 {
            Self::MAX
        } else {
            Self(level)
        }
    }

    /// The numeric level.
    pub const fn level(self) -> u8 {
        self.0
    }

    /// Prefetches issued per trigger at this level.
    pub const fn prefetch_degree(self) -> usize {
        match self.0 {
            1 | 2 => 1,
            3 => 2,
            _ => 4,
        }
    }

    /// Stream-detector training window at this level, in line offsets.
    pub const fn stream_window(self) -> i32 {
        match self.0 {
            1 => 4,
            2 => 8,
            3 => 16,
            4 => 32,
            _ => 64,
        }
    }

    /// Applies a signed adjustment, clamping into `1..=5`.
    const fn adjusted(self, delta: i8) -> Self {
        Self::new(self.0.saturating_add_signed(delta))
    }
}

impl Default for Aggressiveness {
    /// The reference initial level (3).
    fn default() -> Self {
        Self(3)
    }
}

/// Accuracy classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccuracyClass {
    Low,
    Medium,
    High,
}

/// Feedback controller: smoothed totals plus the current level.
#[derive(Debug, Default)]
pub struct FeedbackController {
    level: Aggressiveness,
    used_total: f64,
    prefetched_total: f64,
    late_total: f64,
    miss_total: f64,
    miss_prefetch_total: f64,
}

impl FeedbackController {
    /// Creates a controller at the initial level with zeroed totals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current aggressiveness level.
    pub const fn level(&self) -> Aggressiveness {
        self.level
    }

    /// Runs one feedback step over a completed interval.
    ///
    /// Folds `raw` into the smoothed totals, classifies the derived
    /// metrics, applies the transition table, and returns the (possibly
    /// unchanged) new level. Degenerate ratios with a zero denominator
    /// are defined as 0.
    pub fn update(&mut self, raw: &IntervalCounters) -> Aggressiveness {
        self.fold(raw);

        let accuracy = ratio(self.used_total, self.prefetched_total);
        let lateness = ratio(self.late_total, self.used_total);
        let pollution = ratio(self.miss_prefetch_total, self.miss_total);

        tracing::debug!(
            used = raw.used,
            prefetched = raw.prefetched,
            late = raw.late,
            miss = raw.miss,
            miss_prefetch = raw.miss_prefetch,
            accuracy,
            lateness,
            pollution,
            "feedback interval"
        );

        let accuracy_class = if accuracy < ACCURACY_LOW {
            AccuracyClass::Low
        } else if accuracy < ACCURACY_HIGH {
            AccuracyClass::Medium
        } else {
            AccuracyClass::High
        };
        let is_late = lateness >= LATENESS_THRESHOLD;
        let high_pollution = pollution >= POLLUTION_THRESHOLD;

        let delta = Self::adjustment(accuracy_class, is_late, high_pollution);
        let level = self.level.adjusted(delta);
        if level != self.level {
            tracing::debug!(
                from = self.level.level(),
                to = level.level(),
                "aggressiveness level change"
            );
        }
        self.level = level;
        level
    }

    /// The fixed transition table keyed by metric classification.
    const fn adjustment(accuracy: AccuracyClass, late: bool, high_pollution: bool) -> i8 {
        match (accuracy, late) {
            (AccuracyClass::Low, true) => -1,
            (AccuracyClass::Medium, true) => {
                if high_pollution { -1 } else { 1 }
            }
            (AccuracyClass::High, true) => 1,
            (_, false) => {
                if high_pollution { -1 } else { 0 }
            }
        }
    }

    fn fold(&mut self, raw: &IntervalCounters) {
        fold_one(&mut self.used_total, raw.used);
        fold_one(&mut self.prefetched_total, raw.prefetched);
        fold_one(&mut self.late_total, raw.late);
        fold_one(&mut self.miss_total, raw.miss);
        fold_one(&mut self.miss_prefetch_total, raw.miss_prefetch);
    }

    /// Smoothed totals `(used, prefetched, late, miss, miss_prefetch)`,
    /// for diagnostics.
    pub const fn totals(&self) -> (f64, f64, f64, f64, f64) {
        (
            self.used_total,
            self.prefetched_total,
            self.late_total,
            self.miss_total,
            self.miss_prefetch_total,
        )
    }
}

fn fold_one(total: &mut f64, raw: u32) {
    *total = ALPHA * *total + (1.0 - ALPHA) * f64::from(raw);
    if *total < EPSILON {
        *total = 0.0;
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
