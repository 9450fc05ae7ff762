//! Screenshot archive for failure diagnostics.

use async_trait::async_trait;
use chrono::Local;
use starsift::{DiagnosticsSink, ListingDriver};
use std::path::{Path, PathBuf};

/// Writes `{label}_{YYYYmmdd_HHMMSS}.png` for each capture
pub struct ScreenshotArchive<'a> {
    driver: &'a dyn ListingDriver,
    dir: PathBuf,
}

impl std::fmt::Debug for ScreenshotArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenshotArchive")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl<'a> ScreenshotArchive<'a> {
    /// Archive into `dir`, creating it if needed
    pub fn new(driver: &'a dyn ListingDriver, dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { driver, dir })
    }

    /// Directory screenshots are written to
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a capture taken now
    #[must_use]
    pub fn file_name(label: &str) -> String {
        format!("{label}_{}.png", Local::now().format("%Y%m%d_%H%M%S"))
    }
}

#[async_trait]
impl DiagnosticsSink for ScreenshotArchive<'_> {
    async fn capture(&self, label: &str) {
        let path = self.dir.join(Self::file_name(label));
        let png = match self.driver.screenshot().await {
            Ok(png) => png,
            Err(err) => {
                tracing::warn!(label, error = %err, "could not take screenshot");
                return;
            }
        };
        match tokio::fs::write(&path, png).await {
            Ok(()) => tracing::info!(path = %path.display(), "screenshot saved"),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "could not write screenshot"),
        }
    }
}
