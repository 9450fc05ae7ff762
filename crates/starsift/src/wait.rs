//! Bounded waits and the page readiness waiter.
//!
//! Every wait in the engine is a polling loop with a deadline: the condition
//! is checked, then the task sleeps for the poll interval, until either the
//! condition holds or the bound is exceeded. Nothing waits unbounded.

use crate::config::RunConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::driver::ListingDriver;
use crate::result::{StarsiftError, StarsiftResult};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Diagnostic label captured when the listing never becomes ready
pub const LOAD_ERROR_LABEL: &str = "hotels_load_error";

/// Result of a wait operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the condition held before the bound
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub const fn success(elapsed: Duration) -> Self {
        Self {
            success: true,
            elapsed,
        }
    }

    /// Create a timeout wait result
    #[must_use]
    pub const fn timeout(elapsed: Duration) -> Self {
        Self {
            success: false,
            elapsed,
        }
    }
}

/// Poll `check` until it yields a value or `timeout` elapses
///
/// The check runs at least once. Errors from the check abort the wait.
/// Returns `Ok(None)` on timeout.
pub async fn poll_for<T, F, Fut>(
    mut check: F,
    timeout: Duration,
    interval: Duration,
) -> StarsiftResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StarsiftResult<Option<T>>>,
{
    let start = Instant::now();
    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(None);
        }
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

/// Poll a boolean condition until it holds or `timeout` elapses
pub async fn poll_until<F, Fut>(
    mut predicate: F,
    timeout: Duration,
    interval: Duration,
) -> StarsiftResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StarsiftResult<bool>>,
{
    let start = Instant::now();
    let found = poll_for(
        || {
            let fut = predicate();
            async move { fut.await.map(|ok| ok.then_some(())) }
        },
        timeout,
        interval,
    )
    .await?;
    Ok(match found {
        Some(()) => WaitResult::success(start.elapsed()),
        None => WaitResult::timeout(start.elapsed()),
    })
}

/// State of the result surface once a wait succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one record is rendered
    Ready {
        /// Records present when the wait ended
        records: usize,
    },
    /// The listing shows its "nothing found" marker
    Empty,
}

/// Blocks until the listing is stable after navigation or a filter change
#[derive(Clone, Copy)]
pub struct ReadinessWaiter<'a> {
    driver: &'a dyn ListingDriver,
    diagnostics: &'a dyn DiagnosticsSink,
    config: &'a RunConfig,
}

impl std::fmt::Debug for ReadinessWaiter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessWaiter")
            .field("load_timeout_ms", &self.config.load_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl<'a> ReadinessWaiter<'a> {
    /// Create a waiter
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

    /// Wait for the listing to settle
    ///
    /// On failure a `hotels_load_error` capture is taken before the error is
    /// returned.
    pub async fn wait(&self) -> StarsiftResult<Readiness> {
        match self.settle().await {
            Ok(readiness) => Ok(readiness),
            Err(err) => {
                tracing::warn!(error = %err, "listing did not become ready");
                self.diagnostics.capture(LOAD_ERROR_LABEL).await;
                Err(err)
            }
        }
    }

    async fn settle(&self) -> StarsiftResult<Readiness> {
        self.wait_for_loader().await?;
        let readiness = self.wait_for_records().await?;
        if self.config.check_network_idle {
            self.wait_for_network().await?;
        }
        info!(?readiness, "listing ready");
        Ok(readiness)
    }

    /// A loader that never shows up within the grace period is not an error
    async fn wait_for_loader(&self) -> StarsiftResult<()> {
        let driver = self.driver;
        let loader = self.config.selectors.loader.as_str();
        let interval = self.config.poll_interval();

        let seen = poll_until(
            || async move { driver.find_one(loader).await.map(|h| h.is_some()) },
            self.config.loader_grace(),
            interval,
        )
        .await?;
        if !seen.success {
            debug!("no loading indicator observed");
            return Ok(());
        }

        let gone = poll_until(
            || async move { driver.find_one(loader).await.map(|h| h.is_none()) },
            self.config.load_timeout(),
            interval,
        )
        .await?;
        if gone.success {
            debug!(elapsed_ms = gone.elapsed.as_millis() as u64, "loading indicator gone");
            Ok(())
        } else {
            Err(self.timeout("loading indicator still shown"))
        }
    }

    async fn wait_for_records(&self) -> StarsiftResult<Readiness> {
        let driver = self.driver;
        let selectors = &self.config.selectors;

        let found = poll_for(
            || async move {
                let records = driver.find_all(&selectors.record).await?;
                for record in &records {
                    if driver.is_visible(record).await? {
                        return Ok::<_, StarsiftError>(Some(Readiness::Ready {
                            records: records.len(),
                        }));
                    }
                }
                if records.is_empty() {
                    if let Some(marker) = selectors.empty_results.as_deref() {
                        if driver.find_one(marker).await?.is_some() {
                            return Ok(Some(Readiness::Empty));
                        }
                    }
                }
                Ok(None)
            },
            self.config.load_timeout(),
            self.config.poll_interval(),
        )
        .await?;
        found.ok_or_else(|| self.timeout("no visible records"))
    }

    async fn wait_for_network(&self) -> StarsiftResult<()> {
        let driver = self.driver;
        let idle = poll_until(
            || async move { driver.network_idle().await.map(|idle| idle.unwrap_or(true)) },
            self.config.load_timeout(),
            self.config.poll_interval(),
        )
        .await?;
        if idle.success {
            Ok(())
        } else {
            Err(self.timeout("network requests still pending"))
        }
    }

    fn timeout(&self, stage: &str) -> StarsiftError {
        StarsiftError::LoadTimeout {
            stage: stage.to_string(),
            ms: self.config.load_timeout_ms,
        }
    }
}
