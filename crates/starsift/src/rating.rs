//! Star ratings, filter combinations and the live control state.
//!
//! A rating of `0` is the "unrated" sentinel: it selects records that carry
//! no rating badge at all rather than a numeric rating.

use crate::result::{StarsiftError, StarsiftResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A star rating identifier as used by the filter controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarRating(u8);

impl StarRating {
    /// The "no rating badge" sentinel
    pub const UNRATED: Self = Self(0);

    /// Create a rating from its numeric identifier
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Numeric identifier (the `value` attribute of the filter checkbox)
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this is the unrated sentinel
    #[must_use]
    pub const fn is_unrated(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "unrated"),
            1 => write!(f, "1 star"),
            n => write!(f, "{n} stars"),
        }
    }
}

impl FromStr for StarRating {
    type Err = StarsiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unrated") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::UNRATED);
        }
        trimmed
            .parse::<u8>()
            .map(Self)
            .map_err(|_| StarsiftError::InvalidCombination {
                message: format!("'{trimmed}' is not a star rating"),
            })
    }
}

/// An ordered, duplicate-free set of ratings to filter by simultaneously
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<StarRating>", into = "Vec<StarRating>")]
pub struct FilterCombination {
    ratings: Vec<StarRating>,
}

impl FilterCombination {
    /// Build a test target. Empty or repeated ratings are rejected.
    pub fn new(ratings: impl IntoIterator<Item = StarRating>) -> StarsiftResult<Self> {
        let ratings: Vec<StarRating> = ratings.into_iter().collect();
        if ratings.is_empty() {
            return Err(StarsiftError::InvalidCombination {
                message: "a combination needs at least one rating".to_string(),
            });
        }
        for (i, rating) in ratings.iter().enumerate() {
            if ratings[..i].contains(rating) {
                return Err(StarsiftError::InvalidCombination {
                    message: format!("{rating} appears more than once"),
                });
            }
        }
        Ok(Self { ratings })
    }

    /// Build a test target from raw identifiers
    pub fn from_values(values: &[u8]) -> StarsiftResult<Self> {
        Self::new(values.iter().copied().map(StarRating::new))
    }

    /// The empty selection, used only as the cleanup target
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ratings: Vec::new(),
        }
    }

    /// A single-rating combination
    #[must_use]
    pub fn single(rating: StarRating) -> Self {
        Self {
            ratings: vec![rating],
        }
    }

    /// Ratings in the order they are applied
    #[must_use]
    pub fn ratings(&self) -> &[StarRating] {
        &self.ratings
    }

    /// Number of ratings
    #[must_use]
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Whether this is the empty (reset) selection
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Membership test
    #[must_use]
    pub fn contains(&self, rating: StarRating) -> bool {
        self.ratings.contains(&rating)
    }

    /// Whether records without a rating badge are allowed
    #[must_use]
    pub fn includes_unrated(&self) -> bool {
        self.contains(StarRating::UNRATED)
    }

    /// Whether a numeric rating read from a badge is allowed
    #[must_use]
    pub fn allows_rated(&self, value: u8) -> bool {
        value != 0 && self.contains(StarRating::new(value))
    }

    /// Human description of the allowed set, e.g. `5, 4 or 3 stars`
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .ratings
            .iter()
            .filter(|r| !r.is_unrated())
            .map(|r| r.value().to_string())
            .collect();
        let stars = match parts.len() {
            0 => None,
            1 => Some(StarRating::new(self.rated_values()[0]).to_string()),
            _ => {
                let last = parts.pop().unwrap_or_default();
                Some(format!("{} or {last} stars", parts.join(", ")))
            }
        };
        match (self.includes_unrated(), stars) {
            (true, Some(stars)) => format!("unrated or {stars}"),
            (true, None) => "unrated".to_string(),
            (false, Some(stars)) => stars,
            (false, None) => "no filter".to_string(),
        }
    }

    /// Fragment usable inside a diagnostic label, e.g. `5_4_3`
    #[must_use]
    pub fn label_fragment(&self) -> String {
        self.ratings
            .iter()
            .map(|r| r.value().to_string())
            .collect::<Vec<_>>()
            .join("_")
    }

    fn rated_values(&self) -> Vec<u8> {
        self.ratings
            .iter()
            .filter(|r| !r.is_unrated())
            .map(|r| r.value())
            .collect()
    }
}

impl fmt::Display for FilterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.ratings.iter().map(|r| r.value().to_string()).collect();
        write!(f, "[{}]", values.join(","))
    }
}

impl FromStr for FilterCombination {
    type Err = StarsiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ratings = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(StarRating::from_str)
            .collect::<StarsiftResult<Vec<_>>>()?;
        Self::new(ratings)
    }
}

impl TryFrom<Vec<StarRating>> for FilterCombination {
    type Error = StarsiftError;

    fn try_from(ratings: Vec<StarRating>) -> Result<Self, Self::Error> {
        Self::new(ratings)
    }
}

impl From<FilterCombination> for Vec<StarRating> {
    fn from(combination: FilterCombination) -> Self {
        combination.ratings
    }
}

/// Snapshot of which filter controls are currently active
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    controls: BTreeMap<StarRating, bool>,
}

impl ControlState {
    /// Create an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the observed state of one control
    pub fn set(&mut self, rating: StarRating, active: bool) {
        let _ = self.controls.insert(rating, active);
    }

    /// Observed state of one control, if it was read
    #[must_use]
    pub fn get(&self, rating: StarRating) -> Option<bool> {
        self.controls.get(&rating).copied()
    }

    /// Active ratings in ascending order
    #[must_use]
    pub fn active(&self) -> Vec<StarRating> {
        self.controls
            .iter()
            .filter(|(_, active)| **active)
            .map(|(rating, _)| *rating)
            .collect()
    }

    /// Whether no control is active
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.controls.values().all(|active| !active)
    }

    /// Whether the snapshot equals the indicator function of `target`
    #[must_use]
    pub fn matches(&self, target: &FilterCombination) -> bool {
        self.controls
            .iter()
            .all(|(rating, active)| *active == target.contains(*rating))
            && target
                .ratings()
                .iter()
                .all(|rating| self.get(*rating) == Some(true))
    }

    /// Number of controls read
    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// Whether nothing was read
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl FromIterator<(StarRating, bool)> for ControlState {
    fn from_iter<T: IntoIterator<Item = (StarRating, bool)>>(iter: T) -> Self {
        Self {
            controls: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod star_rating_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(StarRating::UNRATED.to_string(), "unrated");
            assert_eq!(StarRating::new(1).to_string(), "1 star");
            assert_eq!(StarRating::new(4).to_string(), "4 stars");
        }

        #[test]
        fn test_parse_sentinel_names() {
            assert_eq!("unrated".parse::<StarRating>().unwrap(), StarRating::UNRATED);
            assert_eq!("NONE".parse::<StarRating>().unwrap(), StarRating::UNRATED);
            assert_eq!(" 5 ".parse::<StarRating>().unwrap(), StarRating::new(5));
        }

        #[test]
        fn test_parse_rejects_garbage() {
            assert!("five".parse::<StarRating>().is_err());
            assert!("-1".parse::<StarRating>().is_err());
        }
    }

    mod combination_tests {
        use super::*;

        #[test]
        fn test_rejects_empty_target() {
            assert!(FilterCombination::from_values(&[]).is_err());
            assert!(FilterCombination::empty().is_empty());
        }

        #[test]
        fn test_rejects_duplicates() {
            let err = FilterCombination::from_values(&[3, 4, 3]).unwrap_err();
            assert!(err.to_string().contains("more than once"));
        }

        #[test]
        fn test_preserves_order() {
            let c = FilterCombination::from_values(&[5, 4, 3]).unwrap();
            let values: Vec<u8> = c.ratings().iter().map(|r| r.value()).collect();
            assert_eq!(values, vec![5, 4, 3]);
            assert_eq!(c.to_string(), "[5,4,3]");
            assert_eq!(c.label_fragment(), "5_4_3");
        }

        #[test]
        fn test_parse() {
            let c: FilterCombination = "unrated, 3".parse().unwrap();
            assert!(c.includes_unrated());
            assert!(c.allows_rated(3));
            assert!(!c.allows_rated(0));
            assert!("".parse::<FilterCombination>().is_err());
        }

        #[test]
        fn test_describe() {
            assert_eq!(FilterCombination::from_values(&[3]).unwrap().describe(), "3 stars");
            assert_eq!(
                FilterCombination::from_values(&[5, 4, 3]).unwrap().describe(),
                "5, 4 or 3 stars"
            );
            assert_eq!(FilterCombination::from_values(&[0]).unwrap().describe(), "unrated");
            assert_eq!(
                FilterCombination::from_values(&[0, 2]).unwrap().describe(),
                "unrated or 2 stars"
            );
        }

        #[test]
        fn test_serde_roundtrip_rejects_duplicates() {
            let c = FilterCombination::from_values(&[2, 1]).unwrap();
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, "[2,1]");
            assert!(serde_json::from_str::<FilterCombination>("[1,1]").is_err());
        }
    }

    mod control_state_tests {
        use super::*;

        fn state(pairs: &[(u8, bool)]) -> ControlState {
            pairs
                .iter()
                .map(|(r, a)| (StarRating::new(*r), *a))
                .collect()
        }

        #[test]
        fn test_clear_state() {
            let s = state(&[(0, false), (3, false), (5, false)]);
            assert!(s.is_clear());
            assert!(s.matches(&FilterCombination::empty()));
            assert!(s.active().is_empty());
        }

        #[test]
        fn test_matches_indicator_function() {
            let s = state(&[(0, false), (3, true), (4, true), (5, false)]);
            assert!(s.matches(&FilterCombination::from_values(&[4, 3]).unwrap()));
            assert!(!s.matches(&FilterCombination::from_values(&[3]).unwrap()));
            assert!(!s.matches(&FilterCombination::from_values(&[3, 4, 5]).unwrap()));
        }

        #[test]
        fn test_target_outside_snapshot_does_not_match() {
            let s = state(&[(3, true)]);
            assert!(!s.matches(&FilterCombination::from_values(&[3, 9]).unwrap()));
        }
    }
}
