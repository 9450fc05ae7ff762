//! Run configuration.
//!
//! A `RunConfig` is created once per run and handed to the runner; nothing
//! mutates it afterwards.

use crate::rating::{FilterCombination, StarRating};
use crate::result::{StarsiftError, StarsiftResult};
use crate::selectors::ListingSelectors;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default bound for the listing to become ready (20 seconds)
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 20_000;

/// Default grace period for the loading indicator to show up
pub const DEFAULT_LOADER_GRACE_MS: u64 = 2_000;

/// Default bound for a checkbox to reflect a click
pub const DEFAULT_TOGGLE_TIMEOUT_MS: u64 = 10_000;

/// Default bound for the next page to replace the current one
pub const DEFAULT_PAGINATION_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default number of violations listed per failed combination
pub const DEFAULT_VIOLATION_REPORT_LIMIT: usize = 3;

/// Upper bound on pages walked for one combination
pub const DEFAULT_MAX_PAGES: usize = 200;

/// How the filter controller reaches a target selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToggleStrategy {
    /// Toggle only the controls whose state differs from the target
    Diff,
    /// Switch every active control off, then switch the target on in order
    #[default]
    ClearThenSet,
}

/// Configuration for one verification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Bound for readiness waits (ms)
    pub load_timeout_ms: u64,
    /// Grace period for the loading indicator to appear (ms)
    pub loader_grace_ms: u64,
    /// Bound for a filter checkbox to flip (ms)
    pub toggle_timeout_ms: u64,
    /// Bound for pagination to land on a new page (ms)
    pub pagination_timeout_ms: u64,
    /// Polling interval for every bounded wait (ms)
    pub poll_interval_ms: u64,
    /// Abort the batch after the first failed combination
    pub fail_fast: bool,
    /// Toggle strategy
    pub strategy: ToggleStrategy,
    /// Ratings whose controls the tool manages and resets
    pub managed_ratings: Vec<StarRating>,
    /// Upper bound on pages walked per combination
    pub max_pages: usize,
    /// Violations listed per failed combination in reports
    pub violation_report_limit: usize,
    /// Wait for outstanding XHR when the page exposes a counter
    pub check_network_idle: bool,
    /// Page markup
    pub selectors: ListingSelectors,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            loader_grace_ms: DEFAULT_LOADER_GRACE_MS,
            toggle_timeout_ms: DEFAULT_TOGGLE_TIMEOUT_MS,
            pagination_timeout_ms: DEFAULT_PAGINATION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fail_fast: false,
            strategy: ToggleStrategy::ClearThenSet,
            managed_ratings: (0..=5).map(StarRating::new).collect(),
            max_pages: DEFAULT_MAX_PAGES,
            violation_report_limit: DEFAULT_VIOLATION_REPORT_LIMIT,
            check_network_idle: true,
            selectors: ListingSelectors::default(),
        }
    }
}

impl RunConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> StarsiftResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: &Path) -> StarsiftResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> StarsiftResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> StarsiftResult<()> {
        let bounds = [
            ("load_timeout_ms", self.load_timeout_ms),
            ("toggle_timeout_ms", self.toggle_timeout_ms),
            ("pagination_timeout_ms", self.pagination_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, v)| *v == 0) {
            return Err(StarsiftError::config(format!("{name} must be positive")));
        }
        if self.managed_ratings.is_empty() {
            return Err(StarsiftError::config("managed_ratings is empty"));
        }
        if self.max_pages == 0 {
            return Err(StarsiftError::config("max_pages must be positive"));
        }
        Ok(())
    }

    /// Check that every rating of every combination has a managed control
    pub fn check_plan(&self, plan: &[FilterCombination]) -> StarsiftResult<()> {
        for combination in plan {
            if let Some(rating) = combination
                .ratings()
                .iter()
                .find(|r| !self.managed_ratings.contains(r))
            {
                return Err(StarsiftError::InvalidCombination {
                    message: format!("{combination} uses {rating}, which has no managed control"),
                });
            }
        }
        Ok(())
    }

    /// Set load timeout
    #[must_use]
    pub const fn with_load_timeout(mut self, ms: u64) -> Self {
        self.load_timeout_ms = ms;
        self
    }

    /// Set loader grace period
    #[must_use]
    pub const fn with_loader_grace(mut self, ms: u64) -> Self {
        self.loader_grace_ms = ms;
        self
    }

    /// Set toggle timeout
    #[must_use]
    pub const fn with_toggle_timeout(mut self, ms: u64) -> Self {
        self.toggle_timeout_ms = ms;
        self
    }

    /// Set pagination timeout
    #[must_use]
    pub const fn with_pagination_timeout(mut self, ms: u64) -> Self {
        self.pagination_timeout_ms = ms;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set fail fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set toggle strategy
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ToggleStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set page bound
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set selectors
    #[must_use]
    pub fn with_selectors(mut self, selectors: ListingSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Set managed ratings
    #[must_use]
    pub fn with_managed_ratings(mut self, ratings: impl IntoIterator<Item = StarRating>) -> Self {
        self.managed_ratings = ratings.into_iter().collect();
        self
    }

    /// Load bound as Duration
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Loader grace period as Duration
    #[must_use]
    pub const fn loader_grace(&self) -> Duration {
        Duration::from_millis(self.loader_grace_ms)
    }

    /// Toggle bound as Duration
    #[must_use]
    pub const fn toggle_timeout(&self) -> Duration {
        Duration::from_millis(self.toggle_timeout_ms)
    }

    /// Pagination bound as Duration
    #[must_use]
    pub const fn pagination_timeout(&self) -> Duration {
        Duration::from_millis(self.pagination_timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let config = RunConfig::default();
            assert_eq!(config.load_timeout_ms, DEFAULT_LOAD_TIMEOUT_MS);
            assert_eq!(config.strategy, ToggleStrategy::ClearThenSet);
            assert_eq!(config.managed_ratings.len(), 6);
            assert!(!config.fail_fast);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_builder_chain() {
            let config = RunConfig::new()
                .with_load_timeout(50)
                .with_toggle_timeout(40)
                .with_pagination_timeout(30)
                .with_poll_interval(1)
                .with_fail_fast(true)
                .with_strategy(ToggleStrategy::Diff);
            assert_eq!(config.load_timeout(), Duration::from_millis(50));
            assert_eq!(config.toggle_timeout(), Duration::from_millis(40));
            assert_eq!(config.pagination_timeout(), Duration::from_millis(30));
            assert_eq!(config.poll_interval(), Duration::from_millis(1));
            assert!(config.fail_fast);
            assert_eq!(config.strategy, ToggleStrategy::Diff);
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml() {
            let config = RunConfig::from_yaml_str(
                "fail_fast: true\nstrategy: diff\nselectors:\n  record: div.card\n",
            )
            .unwrap();
            assert!(config.fail_fast);
            assert_eq!(config.strategy, ToggleStrategy::Diff);
            assert_eq!(config.selectors.record, "div.card");
            assert_eq!(config.toggle_timeout_ms, DEFAULT_TOGGLE_TIMEOUT_MS);
        }

        #[test]
        fn test_zero_timeout_rejected() {
            let err = RunConfig::from_yaml_str("toggle_timeout_ms: 0\n").unwrap_err();
            assert!(err.to_string().contains("toggle_timeout_ms"));
        }

        #[test]
        fn test_yaml_roundtrip() {
            let config = RunConfig::default().with_fail_fast(true);
            let yaml = config.to_yaml().unwrap();
            assert_eq!(RunConfig::from_yaml_str(&yaml).unwrap(), config);
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("run.yaml");
            std::fs::write(&path, "max_pages: 7\n").unwrap();
            assert_eq!(RunConfig::load(&path).unwrap().max_pages, 7);
        }
    }

    mod plan_tests {
        use super::*;

        #[test]
        fn test_plan_outside_managed_ratings() {
            let config = RunConfig::default().with_managed_ratings([3, 4].map(StarRating::new));
            let ok = FilterCombination::from_values(&[4, 3]).unwrap();
            let bad = FilterCombination::from_values(&[5]).unwrap();
            assert!(config.check_plan(&[ok.clone()]).is_ok());
            let err = config.check_plan(&[ok, bad]).unwrap_err();
            assert!(err.to_string().contains("5 stars"));
        }
    }
}
