//! In-memory listing for exercising the engine without a browser.
//!
//! `MockListing` interprets the selectors of a [`ListingSelectors`] and
//! simulates the parts of the hotel listing the engine touches: a star
//! filter group whose checkboxes react to label clicks (optionally with
//! lag), a result list filtered server-side, a loading indicator after every
//! change, and a "next" pagination control.

use crate::driver::{ElementHandle, ListingDriver};
use crate::rating::{ControlState, StarRating};
use crate::result::{StarsiftError, StarsiftResult};
use crate::selectors::ListingSelectors;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// A hotel as the mock server knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHotel {
    /// Display name
    pub name: String,
    /// Rating shown on the badge; `None` renders no badge
    pub badge: Option<u8>,
    /// Rating the server files the hotel under when filtering
    pub category: u8,
    /// Badge carries an unparseable rating class
    pub garbled_badge: bool,
    /// Name element cannot be read
    pub unreadable_name: bool,
    /// Record renders no name element at all
    pub missing_name: bool,
}

impl MockHotel {
    /// A hotel with a rating badge, filed under the same rating
    #[must_use]
    pub fn rated(name: impl Into<String>, stars: u8) -> Self {
        Self {
            name: name.into(),
            badge: Some(stars),
            category: stars,
            garbled_badge: false,
            unreadable_name: false,
            missing_name: false,
        }
    }

    /// A hotel without a rating badge, filed under "unrated"
    #[must_use]
    pub fn unrated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            badge: None,
            category: 0,
            garbled_badge: false,
            unreadable_name: false,
            missing_name: false,
        }
    }

    /// File the hotel under a different rating than its badge shows
    #[must_use]
    pub const fn misfiled_as(mut self, category: u8) -> Self {
        self.category = category;
        self
    }

    /// Render a badge whose rating class cannot be parsed
    #[must_use]
    pub const fn with_garbled_badge(mut self) -> Self {
        self.garbled_badge = true;
        self
    }

    /// Make the name element unreadable
    #[must_use]
    pub const fn with_unreadable_name(mut self) -> Self {
        self.unreadable_name = true;
        self
    }

    /// Render the record without a name element
    #[must_use]
    pub const fn without_name_element(mut self) -> Self {
        self.missing_name = true;
        self
    }
}

/// How the "next" control looks on the last page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastPageStyle {
    /// Control present with a `disabled` class
    #[default]
    Disabled,
    /// Control present with a `current` class
    Current,
    /// Control removed from the page
    Absent,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    checked: BTreeMap<u8, bool>,
    pending: BTreeMap<u8, usize>,
    page: usize,
    loader_polls: usize,
    history: Vec<String>,
}

/// Scripted listing implementing [`ListingDriver`]
#[derive(Debug)]
pub struct MockListing {
    selectors: ListingSelectors,
    hotels: Vec<MockHotel>,
    controls: Vec<u8>,
    page_size: usize,
    last_page_style: LastPageStyle,
    pagination_on_single_page: bool,
    loading_polls_per_change: usize,
    toggle_lag_polls: usize,
    stuck_loader: bool,
    stuck_pagination: bool,
    hidden_records: bool,
    page_marker: bool,
    broken_controls: BTreeSet<u8>,
    network_idle: Option<bool>,
    state: Mutex<MockState>,
}

impl MockListing {
    /// Create a listing over `hotels` with default selectors and controls 0-5
    #[must_use]
    pub fn new(hotels: Vec<MockHotel>) -> Self {
        Self {
            selectors: ListingSelectors::default(),
            hotels,
            controls: (0..=5).collect(),
            page_size: 10,
            last_page_style: LastPageStyle::Disabled,
            pagination_on_single_page: true,
            loading_polls_per_change: 1,
            toggle_lag_polls: 0,
            stuck_loader: false,
            stuck_pagination: false,
            hidden_records: false,
            page_marker: true,
            broken_controls: BTreeSet::new(),
            network_idle: Some(true),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Use custom selectors
    #[must_use]
    pub fn with_selectors(mut self, selectors: ListingSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Records per page
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Appearance of the "next" control on the last page
    #[must_use]
    pub const fn with_last_page_style(mut self, style: LastPageStyle) -> Self {
        self.last_page_style = style;
        self
    }

    /// Hide the pagination block when everything fits on one page
    #[must_use]
    pub const fn without_pagination_on_single_page(mut self) -> Self {
        self.pagination_on_single_page = false;
        self
    }

    /// Loader polls observed after each filter or page change
    #[must_use]
    pub const fn with_loading_polls(mut self, polls: usize) -> Self {
        self.loading_polls_per_change = polls;
        self
    }

    /// Checkbox reads that pass before a click is reflected
    #[must_use]
    pub const fn with_toggle_lag(mut self, polls: usize) -> Self {
        self.toggle_lag_polls = polls;
        self
    }

    /// Loader never goes away
    #[must_use]
    pub const fn with_stuck_loader(mut self) -> Self {
        self.stuck_loader = true;
        self
    }

    /// Clicking "next" does nothing
    #[must_use]
    pub const fn with_stuck_pagination(mut self) -> Self {
        self.stuck_pagination = true;
        self
    }

    /// Records are in the DOM but never rendered
    #[must_use]
    pub const fn with_hidden_records(mut self) -> Self {
        self.hidden_records = true;
        self
    }

    /// Render the pagination block without a current-page marker
    #[must_use]
    pub const fn without_page_marker(mut self) -> Self {
        self.page_marker = false;
        self
    }

    /// Clicking this rating's label has no effect
    #[must_use]
    pub fn with_broken_control(mut self, rating: u8) -> Self {
        let _ = self.broken_controls.insert(rating);
        self
    }

    /// Value reported for outstanding XHR
    #[must_use]
    pub const fn with_network_idle(mut self, idle: Option<bool>) -> Self {
        self.network_idle = idle;
        self
    }

    /// Start with a control already checked
    #[must_use]
    pub fn with_checked(self, rating: u8) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let _ = state.checked.insert(rating, true);
        }
        self
    }

    /// Actual state of every control, bypassing lag
    #[must_use]
    pub fn control_state(&self) -> ControlState {
        let state = self.lock_state();
        self.controls
            .iter()
            .map(|r| {
                let checked = state.checked.get(r).copied().unwrap_or(false);
                let flipping = state.pending.contains_key(r);
                (StarRating::new(*r), checked != flipping)
            })
            .collect()
    }

    /// Zero-based page currently shown
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.lock_state().page
    }

    /// Recorded interactions
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock_state().history.clone()
    }

    /// Number of recorded interactions starting with `prefix`
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock_state()
            .history
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.count_calls(prefix) > 0
    }

    fn lock_state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn results(&self, state: &MockState) -> Vec<&MockHotel> {
        let active: Vec<u8> = state
            .checked
            .iter()
            .filter(|(_, on)| **on)
            .map(|(r, _)| *r)
            .collect();
        self.hotels
            .iter()
            .filter(|h| active.is_empty() || active.contains(&h.category))
            .collect()
    }

    fn page_count(&self, state: &MockState) -> usize {
        self.results(state).len().div_ceil(self.page_size)
    }

    fn pagination_shown(&self, state: &MockState) -> bool {
        self.pagination_on_single_page || self.page_count(state) > 1
    }

    fn on_last_page(&self, state: &MockState) -> bool {
        state.page + 1 >= self.page_count(state)
    }

    fn page_hotels<'a>(&'a self, state: &MockState) -> Vec<&'a MockHotel> {
        self.results(state)
            .into_iter()
            .skip(state.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Hotel behind a `record:`/`badge:`/`name:` handle on the current page
    fn hotel_for(&self, state: &MockState, handle: &ElementHandle) -> StarsiftResult<MockHotel> {
        let mut parts = handle.id.split(':').skip(1);
        let page: usize = parse_part(parts.next(), handle)?;
        let index: usize = parse_part(parts.next(), handle)?;
        if page != state.page {
            return Err(StarsiftError::driver(format!("stale element {handle}")));
        }
        self.page_hotels(state)
            .get(index)
            .map(|h| (*h).clone())
            .ok_or_else(|| StarsiftError::driver(format!("stale element {handle}")))
    }

    fn rating_for_selector(&self, selector: &str, label: bool) -> Option<u8> {
        self.controls.iter().copied().find(|r| {
            let rating = StarRating::new(*r);
            let expected = if label {
                self.selectors.label(rating)
            } else {
                self.selectors.checkbox(rating)
            };
            expected == selector
        })
    }

    fn control_id(handle: &ElementHandle, kind: &str) -> Option<u8> {
        handle
            .id
            .strip_prefix(kind)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|r| r.parse().ok())
    }

    fn start_loading(&self, state: &mut MockState) {
        state.loader_polls = self.loading_polls_per_change;
    }
}

fn parse_part(part: Option<&str>, handle: &ElementHandle) -> StarsiftResult<usize> {
    part.and_then(|p| p.parse().ok())
        .ok_or_else(|| StarsiftError::driver(format!("unknown element {handle}")))
}

#[async_trait]
impl ListingDriver for MockListing {
    async fn navigate(&self, url: &str) -> StarsiftResult<()> {
        let mut state = self.lock_state();
        state.history.push(format!("navigate:{url}"));
        state.url = url.to_string();
        state.page = 0;
        self.start_loading(&mut state);
        Ok(())
    }

    async fn find_one(&self, selector: &str) -> StarsiftResult<Option<ElementHandle>> {
        let mut state = self.lock_state();
        if selector == self.selectors.loader {
            if self.stuck_loader {
                return Ok(Some(ElementHandle::new("loader")));
            }
            if state.loader_polls > 0 {
                state.loader_polls -= 1;
                return Ok(Some(ElementHandle::new("loader")));
            }
            return Ok(None);
        }
        if selector == self.selectors.next_page {
            let hidden = !self.pagination_shown(&state)
                || (self.last_page_style == LastPageStyle::Absent && self.on_last_page(&state));
            return Ok((!hidden).then(|| ElementHandle::new("next")));
        }
        if self.selectors.current_page.as_deref() == Some(selector) {
            let shown = self.page_marker && self.pagination_shown(&state);
            return Ok(shown.then(|| ElementHandle::new("page-marker")));
        }
        if self.selectors.empty_results.as_deref() == Some(selector) {
            let empty = self.results(&state).is_empty();
            return Ok(empty.then(|| ElementHandle::new("empty")));
        }
        if selector == self.selectors.record {
            return Ok(self
                .find_all_locked(&state, selector)
                .into_iter()
                .next());
        }
        if let Some(r) = self.rating_for_selector(selector, false) {
            return Ok(Some(ElementHandle::new(format!("checkbox:{r}"))));
        }
        if let Some(r) = self.rating_for_selector(selector, true) {
            return Ok(Some(ElementHandle::new(format!("label:{r}"))));
        }
        Ok(None)
    }

    async fn find_all(&self, selector: &str) -> StarsiftResult<Vec<ElementHandle>> {
        let state = self.lock_state();
        Ok(self.find_all_locked(&state, selector))
    }

    async fn find_in(
        &self,
        parent: &ElementHandle,
        selector: &str,
    ) -> StarsiftResult<Option<ElementHandle>> {
        let state = self.lock_state();
        let hotel = self.hotel_for(&state, parent)?;
        let suffix = parent.id.trim_start_matches("record:");
        if selector == self.selectors.rating_badge {
            return Ok(hotel
                .badge
                .map(|_| ElementHandle::new(format!("badge:{suffix}"))));
        }
        if selector == self.selectors.record_name {
            return Ok((!hotel.missing_name).then(|| ElementHandle::new(format!("name:{suffix}"))));
        }
        Ok(None)
    }

    async fn is_checked(&self, element: &ElementHandle) -> StarsiftResult<bool> {
        let mut state = self.lock_state();
        let rating = Self::control_id(element, "checkbox")
            .ok_or_else(|| StarsiftError::driver(format!("{element} is not a checkbox")))?;
        if let Some(remaining) = state.pending.get_mut(&rating) {
            if *remaining > 0 {
                *remaining -= 1;
            } else {
                let _ = state.pending.remove(&rating);
                let entry = state.checked.entry(rating).or_insert(false);
                *entry = !*entry;
                state.page = 0;
                self.start_loading(&mut state);
            }
        }
        Ok(state.checked.get(&rating).copied().unwrap_or(false))
    }

    async fn classes(&self, element: &ElementHandle) -> StarsiftResult<Vec<String>> {
        let state = self.lock_state();
        if element.id == "next" {
            let mut classes = vec!["next".to_string()];
            if self.on_last_page(&state) {
                match self.last_page_style {
                    LastPageStyle::Disabled => classes.push("disabled".to_string()),
                    LastPageStyle::Current => classes.push("current".to_string()),
                    LastPageStyle::Absent => {}
                }
            }
            return Ok(classes);
        }
        if element.id.starts_with("badge:") {
            let hotel = self.hotel_for(&state, element)?;
            let rating = if hotel.garbled_badge {
                "?".to_string()
            } else {
                hotel.badge.unwrap_or_default().to_string()
            };
            return Ok(vec![
                "stars".to_string(),
                format!("{}{rating}", self.selectors.rating_class_prefix),
            ]);
        }
        Ok(Vec::new())
    }

    async fn text(&self, element: &ElementHandle) -> StarsiftResult<String> {
        let state = self.lock_state();
        if element.id == "page-marker" {
            return Ok((state.page + 1).to_string());
        }
        if element.id.starts_with("name:") {
            let hotel = self.hotel_for(&state, element)?;
            if hotel.unreadable_name {
                return Err(StarsiftError::driver(format!("{element} detached")));
            }
            return Ok(format!("  {}  ", hotel.name));
        }
        Ok(String::new())
    }

    async fn is_visible(&self, element: &ElementHandle) -> StarsiftResult<bool> {
        Ok(!(self.hidden_records && element.id.starts_with("record:")))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> StarsiftResult<()> {
        self.lock_state().history.push(format!("scroll:{element}"));
        Ok(())
    }

    async fn activate(&self, element: &ElementHandle) -> StarsiftResult<()> {
        let mut state = self.lock_state();
        state.history.push(format!("activate:{element}"));
        if element.id == "next" {
            if !self.stuck_pagination && !self.on_last_page(&state) {
                state.page += 1;
                self.start_loading(&mut state);
            }
            return Ok(());
        }
        let rating = Self::control_id(element, "label")
            .ok_or_else(|| StarsiftError::driver(format!("{element} is not clickable")))?;
        if self.broken_controls.contains(&rating) {
            return Ok(());
        }
        if self.toggle_lag_polls == 0 {
            let entry = state.checked.entry(rating).or_insert(false);
            *entry = !*entry;
            state.page = 0;
            self.start_loading(&mut state);
        } else if state.pending.remove(&rating).is_none() {
            let _ = state.pending.insert(rating, self.toggle_lag_polls);
        }
        Ok(())
    }

    async fn network_idle(&self) -> StarsiftResult<Option<bool>> {
        Ok(self.network_idle)
    }

    async fn screenshot(&self) -> StarsiftResult<Vec<u8>> {
        self.lock_state().history.push("screenshot".to_string());
        Ok(vec![0x89, 0x50, 0x4E, 0x47])
    }
}

impl MockListing {
    fn find_all_locked(&self, state: &MockState, selector: &str) -> Vec<ElementHandle> {
        if selector != self.selectors.record {
            return Vec::new();
        }
        (0..self.page_hotels(state).len())
            .map(|i| ElementHandle::new(format!("record:{}:{i}", state.page)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn hotels(n: usize, stars: u8) -> Vec<MockHotel> {
        (0..n)
            .map(|i| MockHotel::rated(format!("Hotel {stars}-{i}"), stars))
            .collect()
    }

    #[tokio::test]
    async fn test_label_click_flips_checkbox() {
        let mock = MockListing::new(hotels(3, 3));
        let selectors = ListingSelectors::default();
        let rating = StarRating::new(3);
        let checkbox = mock.find_one(&selectors.checkbox(rating)).await.unwrap().unwrap();
        let label = mock.find_one(&selectors.label(rating)).await.unwrap().unwrap();
        assert!(!mock.is_checked(&checkbox).await.unwrap());
        mock.activate(&label).await.unwrap();
        assert!(mock.is_checked(&checkbox).await.unwrap());
        assert!(mock.was_called("activate:label:3"));
    }

    #[tokio::test]
    async fn test_toggle_lag() {
        let mock = MockListing::new(hotels(3, 3)).with_toggle_lag(2);
        let selectors = ListingSelectors::default();
        let rating = StarRating::new(3);
        let checkbox = mock.find_one(&selectors.checkbox(rating)).await.unwrap().unwrap();
        let label = mock.find_one(&selectors.label(rating)).await.unwrap().unwrap();
        mock.activate(&label).await.unwrap();
        assert!(!mock.is_checked(&checkbox).await.unwrap());
        assert!(!mock.is_checked(&checkbox).await.unwrap());
        assert!(mock.is_checked(&checkbox).await.unwrap());
    }

    #[tokio::test]
    async fn test_server_side_filtering_and_paging() {
        let mut all = hotels(12, 4);
        all.extend(hotels(2, 5));
        let mock = MockListing::new(all).with_page_size(5).with_checked(4);
        let selectors = ListingSelectors::default();
        assert_eq!(mock.find_all(&selectors.record).await.unwrap().len(), 5);
        let next = mock.find_one(&selectors.next_page).await.unwrap().unwrap();
        mock.activate(&next).await.unwrap();
        mock.activate(&next).await.unwrap();
        assert_eq!(mock.current_page(), 2);
        assert_eq!(mock.find_all(&selectors.record).await.unwrap().len(), 2);
        assert!(mock.classes(&next).await.unwrap().contains(&"disabled".to_string()));
    }

    #[tokio::test]
    async fn test_stale_record_handle() {
        let mock = MockListing::new(hotels(12, 4)).with_page_size(5);
        let selectors = ListingSelectors::default();
        let first = mock.find_one(&selectors.record).await.unwrap().unwrap();
        let next = mock.find_one(&selectors.next_page).await.unwrap().unwrap();
        mock.activate(&next).await.unwrap();
        assert!(mock.find_in(&first, &selectors.record_name).await.is_err());
    }

    #[tokio::test]
    async fn test_loader_visible_after_change() {
        let mock = MockListing::new(hotels(1, 2)).with_loading_polls(2);
        let selectors = ListingSelectors::default();
        mock.navigate("https://example.test/hotels").await.unwrap();
        assert!(mock.find_one(&selectors.loader).await.unwrap().is_some());
        assert!(mock.find_one(&selectors.loader).await.unwrap().is_some());
        assert!(mock.find_one(&selectors.loader).await.unwrap().is_none());
    }

    #[test]
    fn test_control_state_counts_pending_flips() {
        let mock = MockListing::new(Vec::new()).with_checked(5);
        let state = mock.control_state();
        assert_eq!(state.active(), vec![StarRating::new(5)]);
        assert_eq!(state.len(), 6);
    }
}
