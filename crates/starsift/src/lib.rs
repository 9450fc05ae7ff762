//! Starsift: star-rating filter verification for paginated listings
//!
//! Drives a listing's star-rating checkboxes into each requested
//! combination, walks every result page, and checks that each record's
//! rating badge is allowed by the active filter. Filters are reset after
//! every combination, pass or fail.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    STARSIFT Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌─────────────┐   apply    ┌──────────────────┐                │
//! │   │ Combination │──────────►│ FilterController │──┐             │
//! │   │ Runner      │   reset    └──────────────────┘  │ readiness   │
//! │   │             │           ┌──────────────────┐  ▼             │
//! │   │             │──────────►│ PaginationWalker │ ReadinessWaiter │
//! │   └─────────────┘   walk     └────────┬─────────┘                │
//! │                                       ▼                          │
//! │                              RecordValidator                     │
//! │                                                                  │
//! │              ListingDriver (CDP or MockListing)                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

mod config;
mod diagnostics;
mod driver;
mod filter;
mod pagination;
mod rating;
mod record;
#[cfg(any(feature = "browser", test))]
mod registry;
mod report;
mod result;
mod runner;
mod selectors;
mod validator;
mod wait;

/// Scripted in-memory listing for tests
pub mod mock;

/// Chrome DevTools Protocol driver
#[cfg(feature = "browser")]
pub mod cdp;

pub use config::{
    RunConfig, ToggleStrategy, DEFAULT_LOAD_TIMEOUT_MS, DEFAULT_MAX_PAGES,
    DEFAULT_PAGINATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TOGGLE_TIMEOUT_MS,
    DEFAULT_VIOLATION_REPORT_LIMIT,
};
pub use diagnostics::{DiagnosticsSink, NullDiagnostics, RecordingDiagnostics};
pub use driver::{ElementHandle, ListingDriver};
pub use filter::{toggle_error_label, FilterController};
pub use pagination::{
    mismatch_label, PaginationState, PaginationWalker, WalkSummary, PAGINATION_ERROR_LABEL,
};
pub use rating::{ControlState, FilterCombination, StarRating};
pub use record::{read_page, HotelRecord, RatingObservation};
pub use report::{violation_lines, TextReport};
pub use result::{StarsiftError, StarsiftResult};
pub use runner::{
    CombinationOutcome, CombinationRunner, FailureDetail, RunResult, TEST_FAILURE_LABEL,
};
pub use selectors::ListingSelectors;
pub use validator::{satisfies, ObservedRating, PageOutcome, RecordValidator, Violation};
pub use wait::{poll_for, poll_until, Readiness, ReadinessWaiter, WaitResult, LOAD_ERROR_LABEL};

/// Every combination of one rating, highest first: `[5]`, `[4]`, ... `[0]`
#[must_use]
pub fn single_rating_plan(ratings: &[StarRating]) -> Vec<FilterCombination> {
    let mut ratings = ratings.to_vec();
    ratings.sort_unstable_by(|a, b| b.cmp(a));
    ratings.into_iter().map(FilterCombination::single).collect()
}
