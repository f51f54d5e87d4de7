//! Size-targeting search.
//!
//! - [`ConvergenceTracker`] decides whether a stream of sizes still makes
//!   progress.
//! - [`QualitySearch`] drives one encoder toward a size constraint.

mod quality;
mod tracker;

pub use quality::{
    QualitySearch, SearchOutcome, SearchState, StepPolicy, DEFAULT_MAX_ATTEMPTS,
    EXACT_START_QUALITY, EXACT_STEP, RANGE_START_QUALITY, RANGE_STEP, WEBP_QUALITY_FLOOR,
};
pub use tracker::{ConvergenceTracker, Progress, SMALL_CHANGE_KB, STALL_STREAK};
