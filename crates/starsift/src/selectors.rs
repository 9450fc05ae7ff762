//! Page object for the hotel listing.
//!
//! Collects every selector the engine uses so that the listing's markup is
//! described in exactly one place. Defaults match the hotel search page the
//! tool was first written against.

use crate::rating::StarRating;
use serde::{Deserialize, Serialize};

/// CSS selectors and class conventions of the listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Loading indicator shown while results are fetched
    pub loader: String,
    /// One result record
    pub record: String,
    /// Rating badge inside a record
    pub rating_badge: String,
    /// Class prefix on the badge that carries the numeric rating
    pub rating_class_prefix: String,
    /// Display name inside a record
    pub record_name: String,
    /// Container of the star filter checkboxes
    pub filter_group: String,
    /// Clickable label next to a checkbox, relative to the checkbox
    pub filter_label: String,
    /// The "next page" pagination control
    pub next_page: String,
    /// Classes on the "next" control that mark the last page
    pub terminal_classes: Vec<String>,
    /// Marker shown when a filter matches nothing
    pub empty_results: Option<String>,
    /// Pagination element naming the page on screen
    pub current_page: Option<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            loader: ".placeholder-preloader--active".to_string(),
            record: "li.item[itemtype='https://schema.org/Hotel']".to_string(),
            rating_badge: ".stars[class*='stars-rating-']".to_string(),
            rating_class_prefix: "stars-rating-".to_string(),
            record_name: "[itemprop='name']".to_string(),
            filter_group: "#ch-hotels-stars".to_string(),
            filter_label: "~ span.name".to_string(),
            next_page: ".pagination .next".to_string(),
            terminal_classes: vec!["disabled".to_string(), "current".to_string()],
            empty_results: None,
            current_page: Some(".pagination .active".to_string()),
        }
    }
}

impl ListingSelectors {
    /// Create selectors with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkbox for one rating
    #[must_use]
    pub fn checkbox(&self, rating: StarRating) -> String {
        format!("{} input[value='{}']", self.filter_group, rating.value())
    }

    /// Clickable label for one rating
    #[must_use]
    pub fn label(&self, rating: StarRating) -> String {
        format!("{} {}", self.checkbox(rating), self.filter_label)
    }

    /// Parse the numeric rating out of a badge's class list
    ///
    /// Returns `None` when no class carries the prefix or its suffix is not
    /// a number.
    #[must_use]
    pub fn rating_from_classes<S: AsRef<str>>(&self, classes: &[S]) -> Option<u8> {
        classes
            .iter()
            .find_map(|class| class.as_ref().strip_prefix(&self.rating_class_prefix))
            .and_then(|suffix| suffix.parse().ok())
    }

    /// Whether a "next" control with these classes marks the last page
    #[must_use]
    pub fn is_terminal<S: AsRef<str>>(&self, classes: &[S]) -> bool {
        classes
            .iter()
            .any(|class| self.terminal_classes.iter().any(|t| t == class.as_ref()))
    }

    /// Set the empty-results marker
    #[must_use]
    pub fn with_empty_results(mut self, selector: impl Into<String>) -> Self {
        self.empty_results = Some(selector.into());
        self
    }

    /// Set or clear the current-page marker
    #[must_use]
    pub fn with_current_page(mut self, selector: Option<String>) -> Self {
        self.current_page = selector;
        self
    }
}
