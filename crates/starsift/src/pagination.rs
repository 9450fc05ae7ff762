//! Pagination walker.
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            ▼                                          │
//!  ┌─────────────────┐  check page  ┌─────────────┐     │
//!  │      Ready      │─────────────►│   HasNext   │     │
//!  └─────────────────┘              └──────┬──────┘     │
//!            │ no next / disabled /        │ click next │
//!            │ current                     ▼            │
//!            ▼                      ┌─────────────┐     │
//!  ┌─────────────────┐              │   Loading   │─────┘
//!  │    Terminal     │              └─────────────┘
//!  └─────────────────┘
//! ```
//!
//! A page with violations ends the walk immediately.

use crate::config::RunConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::driver::{ElementHandle, ListingDriver};
use crate::rating::FilterCombination;
use crate::record::{read_page, HotelRecord};
use crate::result::{StarsiftError, StarsiftResult};
use crate::selectors::ListingSelectors;
use crate::validator::{PageOutcome, RecordValidator};
use crate::wait::{poll_until, Readiness, ReadinessWaiter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Diagnostic label captured when the pagination control misbehaves
pub const PAGINATION_ERROR_LABEL: &str = "pagination_error";

/// Diagnostic label captured when a page violates `combination`
#[must_use]
pub fn mismatch_label(combination: &FilterCombination) -> String {
    format!("wrong_stars_{}", combination.label_fragment())
}

/// Where the walker is in the result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationState {
    /// Waiting for a new page to render
    Loading,
    /// Page rendered and ready to be read
    Ready,
    /// Page checked, a further page exists
    HasNext,
    /// Page checked, nothing follows
    Terminal,
}

/// Totals of a completed walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    /// Records validated across all pages
    pub records: usize,
    /// Pages visited
    pub pages: usize,
    /// Per-page outcomes, in order
    pub outcomes: Vec<PageOutcome>,
}

/// What identifies the page on screen: the current-page marker when the
/// listing renders one, plus the record names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PageFingerprint {
    marker: Option<String>,
    names: Vec<String>,
}

async fn current_marker(
    driver: &dyn ListingDriver,
    selectors: &ListingSelectors,
) -> StarsiftResult<Option<String>> {
    let Some(selector) = selectors.current_page.as_deref() else {
        return Ok(None);
    };
    match driver.find_one(selector).await? {
        Some(marker) => Ok(Some(driver.text(&marker).await?.trim().to_string())),
        None => Ok(None),
    }
}

impl WalkSummary {
    fn push(&mut self, outcome: PageOutcome) {
        self.records += outcome.records();
        self.pages += 1;
        self.outcomes.push(outcome);
    }
}

/// Walks every result page of the active filter
#[derive(Clone, Copy)]
pub struct PaginationWalker<'a> {
    driver: &'a dyn ListingDriver,
    diagnostics: &'a dyn DiagnosticsSink,
    config: &'a RunConfig,
    waiter: ReadinessWaiter<'a>,
}

impl std::fmt::Debug for PaginationWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationWalker")
            .field("max_pages", &self.config.max_pages)
            .finish_non_exhaustive()
    }
}

impl<'a> PaginationWalker<'a> {
    /// Create a walker
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
            waiter: ReadinessWaiter::new(driver, diagnostics, config),
        }
    }

    /// Validate every page against `combination`
    ///
    /// `first` is the readiness of the page currently shown. An empty listing
    /// yields a summary with zero records.
    pub async fn run(
        &self,
        combination: &FilterCombination,
        first: Readiness,
    ) -> StarsiftResult<WalkSummary> {
        let validator = RecordValidator::new(combination);
        let mut summary = WalkSummary::default();
        if first == Readiness::Empty {
            info!(%combination, "listing is empty");
            return Ok(summary);
        }

        let mut page = 1;
        let mut state = PaginationState::Ready;
        let mut next: Option<ElementHandle> = None;
        let mut fingerprint = PageFingerprint::default();

        loop {
            debug!(page, ?state, "pagination step");
            state = match state {
                PaginationState::Ready => {
                    let records = read_page(self.driver, &self.config.selectors).await?;
                    fingerprint = PageFingerprint {
                        marker: current_marker(self.driver, &self.config.selectors).await?,
                        names: names(&records),
                    };
                    let outcome = validator.check(page, &records)?;
                    if !outcome.passed() {
                        warn!(
                            page,
                            violations = outcome.violations.len(),
                            "records outside the filter"
                        );
                        self.diagnostics.capture(&mismatch_label(combination)).await;
                        return outcome.into_result(validator.expected()).map(|_| summary);
                    }
                    info!(page, records = outcome.records(), "page passed");
                    summary.push(outcome);
                    next = self.inspect_next().await?;
                    if next.is_some() {
                        PaginationState::HasNext
                    } else {
                        PaginationState::Terminal
                    }
                }
                PaginationState::HasNext => {
                    if page >= self.config.max_pages {
                        return Err(self
                            .failed(format!("more than {} pages", self.config.max_pages))
                            .await);
                    }
                    let Some(control) = next.take() else {
                        return Err(self.failed("next control vanished").await);
                    };
                    if let Err(err) = self.advance(&control).await {
                        return Err(self.failed(format!("could not click next: {err}")).await);
                    }
                    page += 1;
                    PaginationState::Loading
                }
                PaginationState::Loading => {
                    let _ = self.waiter.wait().await?;
                    self.wait_for_new_page(&fingerprint, page).await?;
                    PaginationState::Ready
                }
                PaginationState::Terminal => {
                    info!(pages = summary.pages, records = summary.records, "walk complete");
                    return Ok(summary);
                }
            };
        }
    }

    /// The "next" control if it leads somewhere
    async fn inspect_next(&self) -> StarsiftResult<Option<ElementHandle>> {
        let control = match self.driver.find_one(&self.config.selectors.next_page).await {
            Ok(Some(control)) => control,
            Ok(None) => {
                debug!("no next control");
                return Ok(None);
            }
            Err(err) => return Err(self.failed(format!("next control unreadable: {err}")).await),
        };
        let classes = match self.driver.classes(&control).await {
            Ok(classes) => classes,
            Err(err) => return Err(self.failed(format!("next control unreadable: {err}")).await),
        };
        if self.config.selectors.is_terminal(&classes) {
            debug!(?classes, "next control marks the last page");
            Ok(None)
        } else {
            Ok(Some(control))
        }
    }

    async fn advance(&self, control: &ElementHandle) -> StarsiftResult<()> {
        self.driver.scroll_into_view(control).await?;
        self.driver.activate(control).await
    }

    /// A new page shows a different marker or different records
    async fn wait_for_new_page(
        &self,
        previous: &PageFingerprint,
        page: usize,
    ) -> StarsiftResult<()> {
        let driver = self.driver;
        let selectors = &self.config.selectors;
        let changed = poll_until(
            || async move {
                let current = PageFingerprint {
                    marker: current_marker(driver, selectors).await?,
                    names: names(&read_page(driver, selectors).await?),
                };
                Ok::<_, StarsiftError>(current != *previous)
            },
            self.config.pagination_timeout(),
            self.config.poll_interval(),
        )
        .await?;
        if changed.success {
            Ok(())
        } else {
            Err(self
                .failed(format!(
                    "page {page} still shows the records of page {}",
                    page - 1
                ))
                .await)
        }
    }

    async fn failed(&self, message: impl Into<String>) -> StarsiftError {
        let err = StarsiftError::pagination(message);
        warn!(error = %err, "pagination failed");
        self.diagnostics.capture(PAGINATION_ERROR_LABEL).await;
        err
    }
}

fn names(records: &[HotelRecord]) -> Vec<String> {
    records.iter().map(|r| r.name.clone()).collect()
}
