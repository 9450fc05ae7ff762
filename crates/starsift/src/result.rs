//! Result and error types for Starsift.

use crate::rating::{FilterCombination, StarRating};
use crate::validator::Violation;
use thiserror::Error;

/// Result type for Starsift operations
pub type StarsiftResult<T> = Result<T, StarsiftError>;

/// Errors that can occur while verifying a star-rating filter
#[derive(Debug, Error)]
pub enum StarsiftError {
    /// The result surface never became ready
    #[error("Listing did not become ready ({stage}) within {ms}ms")]
    LoadTimeout {
        /// Which readiness step timed out
        stage: String,
        /// Bound that was exceeded
        ms: u64,
    },

    /// A filter control did not reflect the requested state
    #[error("Filter control for {rating} did not switch {} within {ms}ms", on_off(.want_active))]
    FilterToggle {
        /// Offending rating
        rating: StarRating,
        /// State that was requested
        want_active: bool,
        /// Bound that was exceeded
        ms: u64,
    },

    /// Records on a page violate the active filter
    #[error("{} record(s) on page {page} do not match {expected}", .violations.len())]
    ValidationMismatch {
        /// Description of the allowed set
        expected: String,
        /// Page on which the mismatch was found (1-based)
        page: usize,
        /// Every violating record on that page
        violations: Vec<Violation>,
    },

    /// A page that was navigated to contained no records
    #[error("Page {page} contains no records")]
    EmptyPage {
        /// Page number (1-based)
        page: usize,
    },

    /// A combination matched no records at all
    #[error("No records found after filtering by {combination}")]
    EmptyResult {
        /// Combination that matched nothing
        combination: FilterCombination,
    },

    /// Pagination control in an unrecognized state
    #[error("Pagination failed: {message}")]
    Pagination {
        /// Error message
        message: String,
    },

    /// The automation driver reported an error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// A combination could not be built
    #[error("Invalid combination: {message}")]
    InvalidCombination {
        /// Error message
        message: String,
    },

    /// Configuration is unusable
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn on_off(active: &bool) -> &'static str {
    if *active {
        "on"
    } else {
        "off"
    }
}

impl StarsiftError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a pagination error
    #[must_use]
    pub fn pagination(message: impl Into<String>) -> Self {
        Self::Pagination {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Infrastructure faults, as opposed to data findings about the listing
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::LoadTimeout { .. }
                | Self::FilterToggle { .. }
                | Self::Pagination { .. }
                | Self::Driver { .. }
        )
    }

    /// Stable snake_case name of the variant, used in reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LoadTimeout { .. } => "load_timeout",
            Self::FilterToggle { .. } => "filter_toggle",
            Self::ValidationMismatch { .. } => "validation_mismatch",
            Self::EmptyPage { .. } => "empty_page",
            Self::EmptyResult { .. } => "empty_result",
            Self::Pagination { .. } => "pagination",
            Self::Driver { .. } => "driver",
            Self::InvalidCombination { .. } => "invalid_combination",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
        }
    }

    /// Page a finding was made on, if any
    #[must_use]
    pub const fn page(&self) -> Option<usize> {
        match self {
            Self::ValidationMismatch { page, .. } | Self::EmptyPage { page } => Some(*page),
            _ => None,
        }
    }

    /// Violations carried by a validation mismatch
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::ValidationMismatch { violations, .. } => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validator::ObservedRating;

    #[test]
    fn test_load_timeout_message() {
        let err = StarsiftError::LoadTimeout {
            stage: "records".into(),
            ms: 20_000,
        };
        assert!(err.to_string().contains("records"));
        assert!(err.to_string().contains("20000ms"));
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_filter_toggle_message() {
        let err = StarsiftError::FilterToggle {
            rating: StarRating::new(3),
            want_active: true,
            ms: 10,
        };
        assert!(err.to_string().contains("3 stars"));
        assert!(err.to_string().contains(" on "));
    }

    #[test]
    fn test_validation_mismatch_is_finding() {
        let err = StarsiftError::ValidationMismatch {
            expected: "3 stars".into(),
            page: 2,
            violations: vec![Violation::new(
                "Hotel Rossiya",
                "3 stars",
                ObservedRating::Rated(4),
            )],
        };
        assert!(!err.is_infrastructure());
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.kind(), "validation_mismatch");
        assert_eq!(err.page(), Some(2));
        assert!(err.to_string().contains("page 2"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StarsiftError = io_err.into();
        assert!(err.to_string().contains("I/O"));
        assert!(err.violations().is_empty());
    }
}
