//! Filter controller: drives the star checkboxes into a target selection.
//!
//! The controller is the only writer of the filter group. It never trusts
//! its own bookkeeping: the [`ControlState`] is re-read from the page before
//! and after every change.

use crate::config::{RunConfig, ToggleStrategy};
use crate::diagnostics::DiagnosticsSink;
use crate::driver::{ElementHandle, ListingDriver};
use crate::rating::{ControlState, FilterCombination, StarRating};
use crate::result::{StarsiftError, StarsiftResult};
use crate::wait::{poll_for, poll_until, Readiness, ReadinessWaiter};
use tracing::{debug, info, warn};

/// Diagnostic label captured when the control for `rating` misbehaves
#[must_use]
pub fn toggle_error_label(rating: StarRating) -> String {
    format!("star_filter_{}_error", rating.value())
}

/// Applies and clears filter combinations
pub struct FilterController<'a> {
    driver: &'a dyn ListingDriver,
    diagnostics: &'a dyn DiagnosticsSink,
    config: &'a RunConfig,
    waiter: ReadinessWaiter<'a>,
    state: ControlState,
}

impl std::fmt::Debug for FilterController<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterController")
            .field("strategy", &self.config.strategy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a> FilterController<'a> {
    /// Create a controller
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
            state: ControlState::new(),
        }
    }

    /// Last state read from the page
    #[must_use]
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Refresh the control state from the page
    ///
    /// Managed ratings without a checkbox on the page are left out.
    pub async fn read_state(&mut self) -> StarsiftResult<ControlState> {
        let mut state = ControlState::new();
        for rating in &self.config.managed_ratings {
            let selector = self.config.selectors.checkbox(*rating);
            if let Some(checkbox) = self.driver.find_one(&selector).await? {
                state.set(*rating, self.driver.is_checked(&checkbox).await?);
            }
        }
        debug!(active = ?state.active(), "filter state read");
        self.state = state.clone();
        Ok(state)
    }

    /// Drive the filter group to exactly `target`
    ///
    /// Ends with a readiness wait whose outcome is returned.
    pub async fn apply(&mut self, target: &FilterCombination) -> StarsiftResult<Readiness> {
        info!(combination = %target, strategy = ?self.config.strategy, "applying filter");
        let _ = self.read_state().await?;
        match self.config.strategy {
            ToggleStrategy::Diff => self.apply_diff(target).await?,
            ToggleStrategy::ClearThenSet => {
                self.clear().await?;
                for rating in target.ratings() {
                    self.toggle(*rating, true).await?;
                }
            }
        }

        let state = self.read_state().await?;
        if !state.matches(target) {
            let rating = self
                .config
                .managed_ratings
                .iter()
                .copied()
                .find(|r| state.get(*r).unwrap_or(false) != target.contains(*r))
                .or_else(|| target.ratings().first().copied())
                .unwrap_or(StarRating::UNRATED);
            let want_active = target.contains(rating);
            return Err(self.toggle_failed(rating, want_active).await);
        }
        self.waiter.wait().await
    }

    /// Switch every active control off
    ///
    /// Never fails: a failure is logged and handed back so the caller can
    /// record it next to whatever error it is already handling.
    pub async fn reset(&mut self) -> Option<StarsiftError> {
        let result = match self.read_state().await {
            Ok(_) => self.clear().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                debug!("filters reset");
                None
            }
            Err(err) => {
                warn!(error = %err, "filter reset failed");
                Some(err)
            }
        }
    }

    async fn apply_diff(&mut self, target: &FilterCombination) -> StarsiftResult<()> {
        let stale: Vec<StarRating> = self
            .state
            .active()
            .into_iter()
            .filter(|r| !target.contains(*r))
            .collect();
        for rating in stale {
            self.toggle(rating, false).await?;
        }
        for rating in target.ratings() {
            if self.state.get(*rating) != Some(true) {
                self.toggle(*rating, true).await?;
            }
        }
        Ok(())
    }

    /// Clear phase; expects a fresh state
    async fn clear(&mut self) -> StarsiftResult<()> {
        for rating in self.state.active() {
            self.toggle(rating, false).await?;
        }
        let state = self.read_state().await?;
        if let Some(rating) = state.active().first().copied() {
            return Err(self.toggle_failed(rating, false).await);
        }
        Ok(())
    }

    async fn toggle(&mut self, rating: StarRating, want_active: bool) -> StarsiftResult<()> {
        debug!(%rating, want_active, "toggling filter");
        match self.flip(rating, want_active).await {
            Ok(()) => {
                self.state.set(rating, want_active);
                Ok(())
            }
            Err(StarsiftError::FilterToggle { .. }) => {
                Err(self.toggle_failed(rating, want_active).await)
            }
            Err(err) => {
                self.diagnostics.capture(&toggle_error_label(rating)).await;
                Err(err)
            }
        }
    }

    async fn flip(&self, rating: StarRating, want_active: bool) -> StarsiftResult<()> {
        let checkbox = self.locate(&self.config.selectors.checkbox(rating)).await;
        let Some(checkbox) = checkbox? else {
            return Err(self.toggle_error(rating, want_active));
        };
        if self.driver.is_checked(&checkbox).await? == want_active {
            return Ok(());
        }

        let label = self.locate(&self.config.selectors.label(rating)).await?;
        let Some(label) = label else {
            return Err(self.toggle_error(rating, want_active));
        };
        self.driver.scroll_into_view(&label).await?;
        self.driver.activate(&label).await?;

        let driver = self.driver;
        let checkbox = &checkbox;
        let flipped = poll_until(
            || async move { driver.is_checked(checkbox).await.map(|c| c == want_active) },
            self.config.toggle_timeout(),
            self.config.poll_interval(),
        )
        .await?;
        if !flipped.success {
            return Err(self.toggle_error(rating, want_active));
        }
        let _ = self.waiter.wait().await?;
        Ok(())
    }

    async fn locate(&self, selector: &str) -> StarsiftResult<Option<ElementHandle>> {
        let driver = self.driver;
        poll_for(
            || async move { driver.find_one(selector).await },
            self.config.toggle_timeout(),
            self.config.poll_interval(),
        )
        .await
    }

    fn toggle_error(&self, rating: StarRating, want_active: bool) -> StarsiftError {
        StarsiftError::FilterToggle {
            rating,
            want_active,
            ms: self.config.toggle_timeout_ms,
        }
    }

    async fn toggle_failed(&self, rating: StarRating, want_active: bool) -> StarsiftError {
        let err = self.toggle_error(rating, want_active);
        warn!(error = %err, "filter toggle failed");
        self.diagnostics.capture(&toggle_error_label(rating)).await;
        err
    }
}
