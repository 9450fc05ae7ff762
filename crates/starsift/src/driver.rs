//! ListingDriver - abstract browser automation seam.
//!
//! The engine never talks to a browser directly. Everything it needs from the
//! page goes through this trait, so the CDP driver (`browser` feature) and the
//! in-memory [`MockListing`](crate::mock::MockListing) are interchangeable.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ListingDriver (async trait)                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐          ┌─────────────────────────┐  │
//! │  │  CdpListingDriver  │          │  MockListing            │  │
//! │  │  chromiumoxide     │          │  scripted listing for   │  │
//! │  │  (feature browser) │          │  unit and scenario tests│  │
//! │  └────────────────────┘          └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::result::StarsiftResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an element located by a driver
///
/// Handles are only meaningful to the driver that issued them and may go
/// stale once the page re-renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier
    pub id: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Browser capabilities the verification engine consumes
///
/// Every method is a single round trip; waiting and retrying is the
/// engine's job (see [`crate::wait::poll_until`]).
#[async_trait]
pub trait ListingDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> StarsiftResult<()>;

    /// First element matching `selector`, if any
    async fn find_one(&self, selector: &str) -> StarsiftResult<Option<ElementHandle>>;

    /// Every element matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> StarsiftResult<Vec<ElementHandle>>;

    /// First descendant of `parent` matching `selector`
    async fn find_in(
        &self,
        parent: &ElementHandle,
        selector: &str,
    ) -> StarsiftResult<Option<ElementHandle>>;

    /// Checked state of a checkbox
    async fn is_checked(&self, element: &ElementHandle) -> StarsiftResult<bool>;

    /// Class list of an element
    async fn classes(&self, element: &ElementHandle) -> StarsiftResult<Vec<String>>;

    /// Rendered text of an element
    async fn text(&self, element: &ElementHandle) -> StarsiftResult<String>;

    /// Whether the element is rendered; drivers that cannot tell report `true`
    async fn is_visible(&self, element: &ElementHandle) -> StarsiftResult<bool> {
        let _ = element;
        Ok(true)
    }

    /// Scroll the element to the middle of the viewport
    async fn scroll_into_view(&self, element: &ElementHandle) -> StarsiftResult<()>;

    /// Click/toggle the element
    async fn activate(&self, element: &ElementHandle) -> StarsiftResult<()>;

    /// Whether the page reports no outstanding XHR; `None` when the page
    /// exposes no such signal
    async fn network_idle(&self) -> StarsiftResult<Option<bool>> {
        Ok(None)
    }

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> StarsiftResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_handle_creation() {
        let handle = ElementHandle::new("record:3");
        assert_eq!(handle.id, "record:3");
        assert_eq!(handle.to_string(), "record:3");
    }

    #[test]
    fn test_element_handle_equality() {
        assert_eq!(ElementHandle::new("a"), ElementHandle::new("a"));
        assert_ne!(ElementHandle::new("a"), ElementHandle::new("b"));
    }
}
