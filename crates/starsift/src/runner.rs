//! Combination runner.
//!
//! Sequences the combinations of a run. Every combination is applied,
//! walked, and then reset, whether or not the walk succeeded.

use crate::config::RunConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::driver::ListingDriver;
use crate::filter::FilterController;
use crate::pagination::{PaginationWalker, WalkSummary};
use crate::rating::FilterCombination;
use crate::result::{StarsiftError, StarsiftResult};
use crate::validator::Violation;
use crate::wait::ReadinessWaiter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Diagnostic label captured when a run ends with failures
pub const TEST_FAILURE_LABEL: &str = "test_failure";

/// Serializable description of why a combination failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Error variant, e.g. `validation_mismatch`
    pub kind: String,
    /// Rendered error message
    pub message: String,
    /// Infrastructure fault rather than a finding about the listing
    pub infrastructure: bool,
    /// Page the failure was found on
    pub page: Option<usize>,
    /// Offending records, for validation mismatches
    pub violations: Vec<Violation>,
}

impl From<&StarsiftError> for FailureDetail {
    fn from(err: &StarsiftError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            infrastructure: err.is_infrastructure(),
            page: err.page(),
            violations: err.violations().to_vec(),
        }
    }
}

/// Result of verifying one combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationOutcome {
    /// Combination under test
    pub combination: FilterCombination,
    /// Human description of the allowed set
    pub description: String,
    /// Whether the combination passed
    pub passed: bool,
    /// Records validated
    pub records: usize,
    /// Pages visited
    pub pages: usize,
    /// Primary failure
    pub failure: Option<FailureDetail>,
    /// Failure of the reset that followed, recorded separately
    pub cleanup_failure: Option<String>,
    /// Wall time spent on the combination, cleanup included
    pub elapsed_ms: u64,
}

impl CombinationOutcome {
    fn new(
        combination: &FilterCombination,
        verdict: &StarsiftResult<WalkSummary>,
        cleanup: Option<&StarsiftError>,
        elapsed: Duration,
    ) -> Self {
        let (records, pages) = match verdict {
            Ok(summary) => (summary.records, summary.pages),
            Err(_) => (0, 0),
        };
        Self {
            combination: combination.clone(),
            description: combination.describe(),
            passed: verdict.is_ok(),
            records,
            pages,
            failure: verdict.as_ref().err().map(FailureDetail::from),
            cleanup_failure: cleanup.map(ToString::to_string),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Results of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Outcomes in execution order
    pub outcomes: Vec<CombinationOutcome>,
    /// Combinations not run because `fail_fast` stopped the run
    #[serde(default)]
    pub skipped: usize,
}

impl RunResult {
    /// Create an empty result
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            outcomes: Vec::new(),
            skipped: 0,
        }
    }

    /// Check if every combination passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    /// Get number of passed combinations
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// Get number of failed combinations
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }

    /// Failed outcomes
    #[must_use]
    pub fn failures(&self) -> Vec<&CombinationOutcome> {
        self.outcomes.iter().filter(|o| !o.passed).collect()
    }

    /// Records validated across the run
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.outcomes.iter().map(|o| o.records).sum()
    }

    /// Pages visited across the run
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.outcomes.iter().map(|o| o.pages).sum()
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> StarsiftResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a sequence of filter combinations against one listing
pub struct CombinationRunner<'a> {
    driver: &'a dyn ListingDriver,
    diagnostics: &'a dyn DiagnosticsSink,
    config: &'a RunConfig,
}

impl std::fmt::Debug for CombinationRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinationRunner")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> CombinationRunner<'a> {
    /// Create a runner
    #[must_use]
    pub fn new(
        driver: &'a dyn ListingDriver,
        diagnostics: &'a dyn DiagnosticsSink,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            driver,
            diagnostics,
            config,
        }
    }

    /// Open `url`, then run every combination
    pub async fn run_at(
        &self,
        url: &str,
        combinations: &[FilterCombination],
    ) -> StarsiftResult<RunResult> {
        Self::into_result(self.run_at_collected(url, combinations).await?)
    }

    /// Like [`Self::run_at`], but a `fail_fast` stop still yields the outcomes
    /// collected so far alongside the error that stopped the run
    pub async fn run_at_collected(
        &self,
        url: &str,
        combinations: &[FilterCombination],
    ) -> StarsiftResult<(RunResult, Option<StarsiftError>)> {
        self.preflight(combinations)?;
        info!(url, "opening listing");
        self.driver.navigate(url).await?;
        self.run_collected(combinations).await
    }

    /// Run every combination against the page already open
    ///
    /// A listing that never becomes ready fails the run before any filter is
    /// touched. Otherwise each combination ends with a reset, and failures are
    /// collected per combination. With `fail_fast` the first failure is
    /// returned once its reset has run.
    pub async fn run_combinations(
        &self,
        combinations: &[FilterCombination],
    ) -> StarsiftResult<RunResult> {
        Self::into_result(self.run_collected(combinations).await?)
    }

    fn into_result(
        (result, stopped): (RunResult, Option<StarsiftError>),
    ) -> StarsiftResult<RunResult> {
        match stopped {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }

    fn preflight(&self, combinations: &[FilterCombination]) -> StarsiftResult<()> {
        self.config.validate()?;
        self.config.check_plan(combinations)
    }

    /// Run every combination, keeping the partial result when `fail_fast`
    /// stops early
    ///
    /// Errors raised before the first combination (bad settings, a listing
    /// that never loads) are returned as `Err`. The stopping failure of a
    /// `fail_fast` run comes back as the second element.
    pub async fn run_collected(
        &self,
        combinations: &[FilterCombination],
    ) -> StarsiftResult<(RunResult, Option<StarsiftError>)> {
        self.preflight(combinations)?;

        let mut result = RunResult::new();
        info!(run_id = %result.run_id, combinations = combinations.len(), "starting run");

        let _ = ReadinessWaiter::new(self.driver, self.diagnostics, self.config)
            .wait()
            .await?;

        let mut controller = FilterController::new(self.driver, self.diagnostics, self.config);
        let walker = PaginationWalker::new(self.driver, self.diagnostics, self.config);

        for (index, combination) in combinations.iter().enumerate() {
            info!(
                combination = %combination,
                index = index + 1,
                total = combinations.len(),
                "verifying combination"
            );
            let start = Instant::now();
            let verdict = Self::verify(&mut controller, &walker, combination).await;
            let cleanup = controller.reset().await;
            let outcome =
                CombinationOutcome::new(combination, &verdict, cleanup.as_ref(), start.elapsed());

            match &verdict {
                Ok(summary) => info!(
                    combination = %combination,
                    records = summary.records,
                    pages = summary.pages,
                    "combination passed"
                ),
                Err(err) => error!(combination = %combination, error = %err, "combination failed"),
            }
            if let Some(err) = &cleanup {
                warn!(combination = %combination, error = %err, "cleanup failed");
            }
            result.outcomes.push(outcome);

            if let Err(err) = verdict {
                if self.config.fail_fast {
                    result.skipped = combinations.len() - index - 1;
                    warn!(skipped = result.skipped, "fail-fast: stopping run");
                    self.diagnostics.capture(TEST_FAILURE_LABEL).await;
                    return Ok((result, Some(err)));
                }
            }
        }

        if !result.all_passed() {
            self.diagnostics.capture(TEST_FAILURE_LABEL).await;
        }
        info!(
            passed = result.passed_count(),
            failed = result.failed_count(),
            records = result.total_records(),
            "run finished"
        );
        Ok((result, None))
    }

    async fn verify(
        controller: &mut FilterController<'_>,
        walker: &PaginationWalker<'_>,
        combination: &FilterCombination,
    ) -> StarsiftResult<WalkSummary> {
        let readiness = controller.apply(combination).await?;
        let summary = walker.run(combination, readiness).await?;
        if summary.records == 0 {
            return Err(StarsiftError::EmptyResult {
                combination: combination.clone(),
            });
        }
        Ok(summary)
    }
}
