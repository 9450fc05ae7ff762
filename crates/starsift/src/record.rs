//! Page snapshots of listing records.

use crate::driver::{ElementHandle, ListingDriver};
use crate::result::{StarsiftError, StarsiftResult};
use crate::selectors::ListingSelectors;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// What the rating badge of a record says
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RatingObservation {
    /// Badge carries a numeric rating
    Rated(u8),
    /// No badge (or a zero badge): the hotel is unrated
    Absent,
    /// Badge or name could not be inspected
    Unreadable(String),
}

impl fmt::Display for RatingObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rated(n) => write!(f, "{n}"),
            Self::Absent => f.write_str("no rating badge found"),
            Self::Unreadable(reason) => write!(f, "inspection failed: {reason}"),
        }
    }
}

/// One record as read from the current page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelRecord {
    /// Display name, trimmed
    pub name: String,
    /// Observed rating
    pub rating: RatingObservation,
}

impl HotelRecord {
    /// Create a record
    #[must_use]
    pub fn new(name: impl Into<String>, rating: RatingObservation) -> Self {
        Self {
            name: name.into(),
            rating,
        }
    }

    /// Shorthand for a rated record
    #[must_use]
    pub fn rated(name: impl Into<String>, stars: u8) -> Self {
        Self::new(name, RatingObservation::Rated(stars))
    }

    /// Shorthand for an unrated record
    #[must_use]
    pub fn unrated(name: impl Into<String>) -> Self {
        Self::new(name, RatingObservation::Absent)
    }
}

/// Read every record rendered on the current page
///
/// Failing to inspect a single record does not fail the read: the record is
/// kept as [`RatingObservation::Unreadable`], under a `record #N` name when
/// its name cannot be read or is missing. Failing to list the records at
/// all is a driver error.
pub async fn read_page(
    driver: &dyn ListingDriver,
    selectors: &ListingSelectors,
) -> StarsiftResult<Vec<HotelRecord>> {
    let handles = driver.find_all(&selectors.record).await?;
    let mut records = Vec::with_capacity(handles.len());
    for (index, handle) in handles.iter().enumerate() {
        records.push(read_record(driver, selectors, handle, index).await);
    }
    debug!(records = records.len(), "page snapshot taken");
    Ok(records)
}

async fn read_record(
    driver: &dyn ListingDriver,
    selectors: &ListingSelectors,
    handle: &ElementHandle,
    index: usize,
) -> HotelRecord {
    let name = match read_name(driver, selectors, handle).await {
        Ok(name) => name,
        Err(err) => {
            return HotelRecord::new(
                format!("record #{}", index + 1),
                RatingObservation::Unreadable(err.to_string()),
            )
        }
    };
    let rating = match read_rating(driver, selectors, handle).await {
        Ok(rating) => rating,
        Err(err) => RatingObservation::Unreadable(err.to_string()),
    };
    HotelRecord::new(name, rating)
}

async fn read_name(
    driver: &dyn ListingDriver,
    selectors: &ListingSelectors,
    handle: &ElementHandle,
) -> StarsiftResult<String> {
    let Some(name) = driver.find_in(handle, &selectors.record_name).await? else {
        return Err(StarsiftError::driver(format!(
            "no name element matches '{}'",
            selectors.record_name
        )));
    };
    Ok(driver.text(&name).await?.trim().to_string())
}

async fn read_rating(
    driver: &dyn ListingDriver,
    selectors: &ListingSelectors,
    handle: &ElementHandle,
) -> StarsiftResult<RatingObservation> {
    let Some(badge) = driver.find_in(handle, &selectors.rating_badge).await? else {
        return Ok(RatingObservation::Absent);
    };
    let classes = driver.classes(&badge).await?;
    Ok(match selectors.rating_from_classes(&classes) {
        Some(0) => RatingObservation::Absent,
        Some(n) => RatingObservation::Rated(n),
        None => RatingObservation::Unreadable(format!(
            "badge classes {:?} carry no {} rating",
            classes, selectors.rating_class_prefix
        )),
    })
}
