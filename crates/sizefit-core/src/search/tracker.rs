//! Convergence bookkeeping for the quality search.
//!
//! The tracker watches the stream of encoded sizes and decides whether the
//! search is still making meaningful progress. Every per-format loop (JPEG,
//! PNG, WebP; exact or range) uses the same fixed thresholds.

/// A size reduction smaller than this (in KB) counts as a "small change".
pub const SMALL_CHANGE_KB: f64 = 5.0;

/// Consecutive small changes that end the search.
pub const STALL_STREAK: u32 = 3;

/// Verdict for one observed size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Not there yet, but still shrinking meaningfully.
    Continue,
    /// The size is at or below the ceiling.
    Converged,
    /// Third consecutive small change; carries the smallest size seen.
    Stalled { best_kb: f64 },
}

/// Tracks previous size and the small-change streak.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    ceiling_kb: Option<f64>,
    previous_kb: f64,
    best_kb: Option<f64>,
    small_change_streak: u32,
}

impl Default for ConvergenceTracker {
    fn default() -> Self {
        Self {
            ceiling_kb: None,
            previous_kb: f64::INFINITY,
            best_kb: None,
            small_change_streak: 0,
        }
    }
}

impl ConvergenceTracker {
    /// A tracker that never reports `Converged`, only progress or stalls.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker that reports `Converged` once a size is at or below
    /// `ceiling_kb`.
    pub fn with_ceiling(ceiling_kb: f64) -> Self {
        Self {
            ceiling_kb: Some(ceiling_kb),
            ..Self::default()
        }
    }

    /// Record one encoded size.
    ///
    /// A size that meets the ceiling converges without touching the streak.
    /// Otherwise `reduction = previous - current`; below [`SMALL_CHANGE_KB`]
    /// the streak grows and reaching [`STALL_STREAK`] stalls, at or above it
    /// the streak resets.
    pub fn observe(&mut self, size_kb: f64) -> Progress {
        let best = self.best_kb.map_or(size_kb, |best| best.min(size_kb));
        self.best_kb = Some(best);

        if let Some(ceiling) = self.ceiling_kb {
            if size_kb <= ceiling {
                return Progress::Converged;
            }
        }

        let reduction = self.previous_kb - size_kb;
        if reduction < SMALL_CHANGE_KB {
            self.small_change_streak += 1;
            if self.small_change_streak >= STALL_STREAK {
                return Progress::Stalled { best_kb: best };
            }
        } else {
            self.small_change_streak = 0;
        }

        self.previous_kb = size_kb;
        Progress::Continue
    }

    /// Smallest size observed so far.
    pub fn best_kb(&self) -> Option<f64> {
        self.best_kb
    }

    /// Size recorded by the last non-terminal observation (`+inf` before any).
    pub fn previous_kb(&self) -> f64 {
        self.previous_kb
    }

    pub fn small_change_streak(&self) -> u32 {
        self.small_change_streak
    }
}
