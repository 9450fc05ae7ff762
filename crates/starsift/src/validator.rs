//! Record validation against the active filter.
//!
//! The predicate, for an allowed set `A`:
//!
//! | `0 ∈ A` | badge      | valid when        |
//! |---------|------------|-------------------|
//! | yes     | absent     | always            |
//! | yes     | rated `n`  | `n ∈ A \ {0}`     |
//! | no      | absent     | never             |
//! | no      | rated `n`  | `n ∈ A`           |
//!
//! Records that could not be inspected are always violations.

use crate::rating::FilterCombination;
use crate::record::{HotelRecord, RatingObservation};
use crate::result::{StarsiftError, StarsiftResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rating as reported in a violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ObservedRating {
    /// A badge with this rating
    Rated(u8),
    /// No rating badge
    Absent,
    /// The record could not be inspected
    InspectionFailed(String),
}

impl From<&RatingObservation> for ObservedRating {
    fn from(observation: &RatingObservation) -> Self {
        match observation {
            RatingObservation::Rated(n) => Self::Rated(*n),
            RatingObservation::Absent => Self::Absent,
            RatingObservation::Unreadable(reason) => Self::InspectionFailed(reason.clone()),
        }
    }
}

impl fmt::Display for ObservedRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rated(1) => f.write_str("1 star"),
            Self::Rated(n) => write!(f, "{n} stars"),
            Self::Absent => f.write_str("no rating badge found"),
            Self::InspectionFailed(reason) => write!(f, "inspection failed ({reason})"),
        }
    }
}

/// A record that does not satisfy the active filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Record display name
    pub name: String,
    /// Description of the allowed set
    pub expected: String,
    /// What was found
    pub observed: ObservedRating,
}

impl Violation {
    /// Create a violation
    #[must_use]
    pub fn new(name: impl Into<String>, expected: impl Into<String>, observed: ObservedRating) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
            observed,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}': expected {}, found {}",
            self.name, self.expected, self.observed
        )
    }
}

/// Validation result for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutcome {
    /// Page number (1-based)
    pub page: usize,
    /// Records that satisfied the filter
    pub valid: usize,
    /// Records that did not, in page order
    pub violations: Vec<Violation>,
}

impl PageOutcome {
    /// Total records checked
    #[must_use]
    pub fn records(&self) -> usize {
        self.valid + self.violations.len()
    }

    /// Whether every record passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Turn a failed page into a mismatch error
    pub fn into_result(self, expected: &str) -> StarsiftResult<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(StarsiftError::ValidationMismatch {
                expected: expected.to_string(),
                page: self.page,
                violations: self.violations,
            })
        }
    }
}

/// Whether a single observation satisfies the allowed set
#[must_use]
pub fn satisfies(observation: &RatingObservation, allowed: &FilterCombination) -> bool {
    match observation {
        RatingObservation::Absent => allowed.includes_unrated(),
        RatingObservation::Rated(n) => allowed.allows_rated(*n),
        RatingObservation::Unreadable(_) => false,
    }
}

/// Evaluates page snapshots against one combination
#[derive(Debug, Clone)]
pub struct RecordValidator {
    allowed: FilterCombination,
    expected: String,
}

impl RecordValidator {
    /// Create a validator for `allowed`
    #[must_use]
    pub fn new(allowed: &FilterCombination) -> Self {
        Self {
            allowed: allowed.clone(),
            expected: allowed.describe(),
        }
    }

    /// Description of the allowed set used in violations
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Check every record of a page
    ///
    /// Each record contributes exactly one outcome. An empty page is an error.
    pub fn check(&self, page: usize, records: &[HotelRecord]) -> StarsiftResult<PageOutcome> {
        if records.is_empty() {
            return Err(StarsiftError::EmptyPage { page });
        }
        let mut outcome = PageOutcome {
            page,
            valid: 0,
            violations: Vec::new(),
        };
        for record in records {
            if satisfies(&record.rating, &self.allowed) {
                outcome.valid += 1;
            } else {
                outcome.violations.push(Violation::new(
                    record.name.clone(),
                    self.expected.clone(),
                    ObservedRating::from(&record.rating),
                ));
            }
        }
        tracing::debug!(
            page,
            valid = outcome.valid,
            violations = outcome.violations.len(),
            "page checked"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn combo(values: &[u8]) -> FilterCombination {
        FilterCombination::from_values(values).unwrap()
    }

    mod predicate_tests {
        use super::*;

        #[test]
        fn test_unrated_allowed() {
            let allowed = combo(&[0, 3]);
            assert!(satisfies(&RatingObservation::Absent, &allowed));
            assert!(satisfies(&RatingObservation::Rated(3), &allowed));
            assert!(!satisfies(&RatingObservation::Rated(4), &allowed));
        }

        #[test]
        fn test_unrated_not_allowed() {
            let allowed = combo(&[3]);
            assert!(!satisfies(&RatingObservation::Absent, &allowed));
            assert!(satisfies(&RatingObservation::Rated(3), &allowed));
        }

        #[test]
        fn test_unreadable_never_passes() {
            let allowed = combo(&[0, 1, 2, 3, 4, 5]);
            assert!(!satisfies(&RatingObservation::Unreadable("x".into()), &allowed));
        }
    }

    mod check_tests {
        use super::*;

        #[test]
        fn test_multi_select_page() {
            let validator = RecordValidator::new(&combo(&[5, 4, 3]));
            let records = vec![
                HotelRecord::rated("A", 5),
                HotelRecord::rated("B", 3),
                HotelRecord::rated("C", 2),
                HotelRecord::unrated("D"),
            ];
            let outcome = validator.check(1, &records).unwrap();
            assert_eq!(outcome.valid, 2);
            assert_eq!(outcome.records(), 4);
            assert_eq!(outcome.violations[0].name, "C");
            assert_eq!(outcome.violations[1].observed, ObservedRating::Absent);
            assert_eq!(outcome.violations[0].expected, "5, 4 or 3 stars");
        }

        #[test]
        fn test_empty_page() {
            let validator = RecordValidator::new(&combo(&[3]));
            let err = validator.check(4, &[]).unwrap_err();
            assert!(matches!(err, StarsiftError::EmptyPage { page: 4 }));
        }

        #[test]
        fn test_into_result() {
            let validator = RecordValidator::new(&combo(&[3]));
            let ok = validator.check(1, &[HotelRecord::rated("A", 3)]).unwrap();
            assert!(ok.into_result("3 stars").is_ok());
            let bad = validator.check(2, &[HotelRecord::rated("B", 4)]).unwrap();
            let err = bad.into_result("3 stars").unwrap_err();
            assert_eq!(err.violations().len(), 1);
        }

        #[test]
        fn test_violation_display() {
            let v = Violation::new("Hotel Rossiya", "3 stars", ObservedRating::Rated(4));
            assert_eq!(v.to_string(), "'Hotel Rossiya': expected 3 stars, found 4 stars");
        }
    }

    fn observation() -> impl Strategy<Value = RatingObservation> {
        prop_oneof![
            (1u8..=5).prop_map(RatingObservation::Rated),
            Just(RatingObservation::Absent),
            Just(RatingObservation::Unreadable("detached".into())),
        ]
    }

    proptest! {
        #[test]
        fn prop_outcome_per_record(
            allowed in proptest::sample::subsequence(vec![0u8, 1, 2, 3, 4, 5], 1..=6),
            observations in proptest::collection::vec(observation(), 1..30),
        ) {
            let allowed = combo(&allowed);
            let records: Vec<HotelRecord> = observations
                .iter()
                .enumerate()
                .map(|(i, o)| HotelRecord::new(format!("H{i}"), o.clone()))
                .collect();
            let outcome = RecordValidator::new(&allowed).check(1, &records).unwrap();
            prop_assert_eq!(outcome.records(), records.len());
        }

        #[test]
        fn prop_predicate_matches_definition(
            allowed in proptest::sample::subsequence(vec![0u8, 1, 2, 3, 4, 5], 1..=6),
            obs in observation(),
        ) {
            let with_unrated = allowed.contains(&0);
            let expected = match &obs {
                RatingObservation::Absent => with_unrated,
                RatingObservation::Rated(n) => allowed.contains(n),
                RatingObservation::Unreadable(_) => false,
            };
            prop_assert_eq!(satisfies(&obs, &combo(&allowed)), expected);
        }
    }
}
