//! The iterative quality search that drives one encoder toward a size
//! constraint.
//!
//! # Algorithm
//!
//! 1. Encode at the current quality.
//! 2. Feed the size to a [`ConvergenceTracker`] whose ceiling is the
//!    constraint's upper bound.
//! 3. `Converged` ends the search successfully. The result is padded up to
//!    the constraint's floor when it undershoots.
//! 4. `Stalled`, an encoder skip, or running out of attempts ends the search
//!    with [`CompressError::ConvergenceFailure`].
//! 5. Otherwise step the quality down and go again.

use tracing::debug;

use super::tracker::{ConvergenceTracker, Progress};
use crate::constraint::SizeConstraint;
use crate::encode::{EncodeOutcome, ImageFormat};
use crate::error::{CompressError, Result};
use crate::padding;

/// Default attempt cap for one search.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Starting quality for exact-target searches.
pub const EXACT_START_QUALITY: u8 = 80;
/// Quality decrement for exact-target searches.
pub const EXACT_STEP: u8 = 10;
/// Starting quality for range searches when the caller gave none.
pub const RANGE_START_QUALITY: u8 = 90;
/// Quality decrement for range searches and every WebP search.
pub const RANGE_STEP: u8 = 5;
/// WebP never steps below this quality.
pub const WEBP_QUALITY_FLOOR: u8 = 10;

/// Where a search starts and how it steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    pub start: u8,
    pub step: u8,
    pub floor: u8,
}

impl StepPolicy {
    /// Policy for a JPEG or PNG search.
    ///
    /// Exact targets start at 80 and step by 10. Ranges start at
    /// `requested` (or 90) and step by 5.
    pub fn for_constraint(constraint: &SizeConstraint, requested: Option<u8>) -> Self {
        match constraint {
            SizeConstraint::Exact { .. } => Self {
                start: EXACT_START_QUALITY,
                step: EXACT_STEP,
                floor: 1,
            },
            SizeConstraint::Range { .. } => Self {
                start: requested.unwrap_or(RANGE_START_QUALITY),
                step: RANGE_STEP,
                floor: 1,
            },
        }
    }

    /// Policy for a WebP search, whichever the constraint kind.
    pub fn webp(start: u8) -> Self {
        Self {
            start,
            step: RANGE_STEP,
            floor: WEBP_QUALITY_FLOOR,
        }
    }

    fn first(&self) -> u8 {
        self.start.clamp(self.floor.max(1), 100)
    }

    fn next(&self, quality: u8) -> u8 {
        quality.saturating_sub(self.step).max(self.floor).max(1)
    }
}

/// Mutable state of one running search. Never outlives the `run` call.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub current_quality: u8,
    pub attempts: u32,
    tracker: ConvergenceTracker,
}

impl SearchState {
    fn new(start: u8, ceiling_kb: f64) -> Self {
        Self {
            current_quality: start,
            attempts: 0,
            tracker: ConvergenceTracker::with_ceiling(ceiling_kb),
        }
    }

    /// Size seen on the previous non-terminal attempt (`+inf` before any).
    pub fn previous_size_kb(&self) -> f64 {
        self.tracker.previous_kb()
    }

    pub fn small_change_streak(&self) -> u32 {
        self.tracker.small_change_streak()
    }
}

/// A successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Final bytes, padded if needed.
    pub outcome: EncodeOutcome,
    /// Quality of the accepted encode.
    pub quality: u8,
    /// Encoder invocations spent.
    pub attempts: u32,
    /// Whether filler bytes were appended.
    pub padded: bool,
}

/// One parameterized search, shared by every format and constraint kind.
#[derive(Debug, Clone)]
pub struct QualitySearch {
    format: ImageFormat,
    constraint: SizeConstraint,
    policy: StepPolicy,
    max_attempts: u32,
    pad: bool,
}

impl QualitySearch {
    pub fn new(format: ImageFormat, constraint: SizeConstraint, policy: StepPolicy) -> Self {
        Self {
            format,
            constraint,
            policy,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pad: true,
        }
    }

    /// Override the attempt cap (at least one attempt is always made).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Skip the floor padding. Used for intermediate results that are about
    /// to be re-encoded into another format.
    pub fn without_padding(mut self) -> Self {
        self.pad = false;
        self
    }

    /// Run the search.
    ///
    /// `encode` is called with each proposed quality. It returns
    /// `Ok(None)` when the encoder declines to produce output (for example
    /// because the result would be larger than the input).
    ///
    /// # Errors
    ///
    /// - Any error from `encode` is returned immediately.
    /// - An empty buffer from `encode` is an `EncodeFailure`.
    /// - A stall, a skip, or attempt exhaustion is a `ConvergenceFailure`
    ///   carrying the smallest size seen.
    pub fn run<F>(&self, mut encode: F) -> Result<SearchOutcome>
    where
        F: FnMut(u8) -> Result<Option<EncodeOutcome>>,
    {
        let mut state = SearchState::new(self.policy.first(), self.constraint.ceiling_kb());

        while state.attempts < self.max_attempts {
            state.attempts += 1;
            let quality = state.current_quality;

            let Some(outcome) = encode(quality)? else {
                debug!(format = %self.format, quality, "encoder skipped, output would not shrink");
                return Err(self.failure(&state));
            };
            if outcome.is_empty() {
                return Err(CompressError::encode(self.format, "encoder produced no output"));
            }

            let size_kb = outcome.size_kb();
            debug!(
                format = %self.format,
                attempt = state.attempts,
                quality,
                size_kb,
                "search attempt"
            );

            match state.tracker.observe(size_kb) {
                Progress::Converged => return Ok(self.finish(outcome, quality, state.attempts)),
                Progress::Stalled { .. } => return Err(self.failure(&state)),
                Progress::Continue => state.current_quality = self.policy.next(quality),
            }
        }

        Err(self.failure(&state))
    }

    fn finish(&self, outcome: EncodeOutcome, quality: u8, attempts: u32) -> SearchOutcome {
        let before = outcome.len();
        let outcome = if self.pad {
            padding::pad_outcome(outcome, self.constraint.floor_kb())
        } else {
            outcome
        };
        SearchOutcome {
            padded: outcome.len() > before,
            outcome,
            quality,
            attempts,
        }
    }

    fn failure(&self, state: &SearchState) -> CompressError {
        CompressError::ConvergenceFailure {
            format: self.format,
            constraint: self.constraint,
            best_kb: state.tracker.best_kb(),
            attempts: state.attempts,
        }
    }
}


// ============================================================================
// Property-based tests
// ============================================================================
