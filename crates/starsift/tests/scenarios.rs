//! End-to-end scenarios against the in-memory listing.
//!
//! Each test drives a full run through `CombinationRunner` with a
//! `MockListing` standing in for the browser.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use starsift::mock::{LastPageStyle, MockHotel, MockListing};
use starsift::{
    CombinationRunner, FilterCombination, ObservedRating, RecordingDiagnostics, RunConfig,
    StarsiftError, TextReport, ToggleStrategy,
};

fn fast_config() -> RunConfig {
    RunConfig::default()
        .with_load_timeout(80)
        .with_loader_grace(5)
        .with_toggle_timeout(40)
        .with_pagination_timeout(40)
        .with_poll_interval(1)
}

fn combo(values: &[u8]) -> FilterCombination {
    FilterCombination::from_values(values).unwrap()
}

fn rated(prefix: &str, n: usize, stars: u8) -> Vec<MockHotel> {
    (0..n)
        .map(|i| MockHotel::rated(format!("{prefix} {i}"), stars))
        .collect()
}

// ============================================================================
// Single combinations
// ============================================================================

#[tokio::test]
async fn test_all_five_star_records_pass() {
    let mut hotels = rated("Five", 8, 5);
    hotels.extend(rated("Three", 4, 3));
    let mock = MockListing::new(hotels);
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_at("https://example.test/hotels", &[combo(&[5])])
        .await
        .unwrap();

    assert!(result.all_passed());
    assert_eq!(result.total_records(), 8);
    assert!(result.outcomes[0].failure.is_none());
    assert!(sink.labels().is_empty());
}

#[tokio::test]
async fn test_single_intruder_is_reported_and_filters_cleared() {
    let mut hotels = rated("Three", 9, 3);
    hotels.insert(4, MockHotel::rated("Metropol", 4).misfiled_as(3));
    let mock = MockListing::new(hotels);
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&[combo(&[3])])
        .await
        .unwrap();

    assert!(!result.all_passed());
    let failure = result.outcomes[0].failure.as_ref().unwrap();
    assert_eq!(failure.violations.len(), 1);
    assert_eq!(failure.violations[0].name, "Metropol");
    assert_eq!(failure.violations[0].observed, ObservedRating::Rated(4));
    assert!(result.outcomes[0].cleanup_failure.is_none());
    assert!(mock.control_state().is_clear());
    assert!(sink.contains("wrong_stars_3"));
    assert!(sink.contains("test_failure"));
}

#[tokio::test]
async fn test_unrated_filter_rejects_only_rated_records() {
    let hotels = vec![
        MockHotel::unrated("Hostel A"),
        MockHotel::rated("Palace", 5).misfiled_as(0),
        MockHotel::unrated("Hostel B"),
        MockHotel::rated("Inn", 2).misfiled_as(0),
        MockHotel::unrated("Hostel C"),
    ];
    let mock = MockListing::new(hotels);
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&[combo(&[0])])
        .await
        .unwrap();

    let failure = result.outcomes[0].failure.as_ref().unwrap();
    let names: Vec<&str> = failure.violations.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["Palace", "Inn"]);
    assert_eq!(failure.violations[0].expected, "unrated");
}

#[tokio::test]
async fn test_multi_select_walks_three_pages() {
    let mut hotels = rated("Five", 10, 5);
    hotels.extend(rated("Four", 10, 4));
    hotels.extend(rated("Three", 10, 3));
    hotels.extend(rated("Two", 6, 2));
    let mock = MockListing::new(hotels)
        .with_page_size(10)
        .with_last_page_style(LastPageStyle::Disabled);
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&[combo(&[5, 4, 3])])
        .await
        .unwrap();

    assert!(result.all_passed());
    assert_eq!(result.total_records(), 30);
    assert_eq!(result.total_pages(), 3);
    assert_eq!(mock.count_calls("activate:next"), 2);
}

#[tokio::test]
async fn test_chain_hotels_sharing_a_name_span_pages() {
    let mock = MockListing::new(vec![MockHotel::rated("Ibis", 3), MockHotel::rated("Ibis", 3)])
        .with_page_size(1);
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_at("https://example.test/hotels", &[combo(&[3])])
        .await
        .unwrap();

    assert!(result.all_passed());
    assert_eq!(result.total_records(), 2);
    assert_eq!(result.total_pages(), 2);
    assert!(!sink.contains("pagination_error"));
}

#[tokio::test]
async fn test_initial_load_timeout_runs_nothing() {
    let mock = MockListing::new(rated("Five", 3, 5)).with_stuck_loader();
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let err = CombinationRunner::new(&mock, &sink, &config)
        .run_at("https://example.test/hotels", &[combo(&[5]), combo(&[4])])
        .await
        .unwrap_err();

    assert!(matches!(err, StarsiftError::LoadTimeout { .. }));
    assert!(!mock.was_called("activate:"));
    assert_eq!(sink.labels(), vec!["hotels_load_error"]);
}

// ============================================================================
// Batches
// ============================================================================

#[tokio::test]
async fn test_batch_continues_after_failure() {
    let mut hotels = rated("Five", 3, 5);
    hotels.push(MockHotel::rated("Sneaky", 2).misfiled_as(4));
    hotels.extend(rated("Four", 3, 4));
    let mock = MockListing::new(hotels).with_page_size(2);
    let sink = RecordingDiagnostics::new();
    let config = fast_config().with_strategy(ToggleStrategy::Diff);

    let plan = [combo(&[4]), combo(&[5]), combo(&[5, 4])];
    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&plan)
        .await
        .unwrap();

    let verdicts: Vec<bool> = result.outcomes.iter().map(|o| o.passed).collect();
    assert_eq!(verdicts, vec![false, true, false]);
    assert_eq!(result.outcomes[1].records, 3);
    assert!(mock.control_state().is_clear());

    let report = TextReport::new(&result, config.violation_report_limit).render();
    assert!(report.contains("1 passed, 2 failed"));
    assert!(report.contains("'Sneaky': expected 4 stars, found 2 stars"));
}

#[tokio::test]
async fn test_fail_fast_skips_remaining_combinations() {
    let mut hotels = rated("Three", 3, 3);
    hotels.push(MockHotel::unrated("Nameless").misfiled_as(3));
    hotels.extend(rated("Five", 3, 5));
    let mock = MockListing::new(hotels);
    let sink = RecordingDiagnostics::new();
    let config = fast_config().with_fail_fast(true);

    let err = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&[combo(&[3]), combo(&[5])])
        .await
        .unwrap_err();

    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].observed, ObservedRating::Absent);
    assert!(!mock.was_called("activate:label:5"));
    assert!(mock.control_state().is_clear());
}

#[tokio::test]
async fn test_fail_fast_report_covers_combinations_already_run() {
    let mut hotels = rated("Five", 2, 5);
    hotels.push(MockHotel::rated("Sneaky", 2).misfiled_as(4));
    hotels.extend(rated("Four", 2, 4));
    let mock = MockListing::new(hotels);
    let sink = RecordingDiagnostics::new();
    let config = fast_config().with_fail_fast(true);

    let (result, stopped) = CombinationRunner::new(&mock, &sink, &config)
        .run_at_collected(
            "https://example.test/hotels",
            &[combo(&[5]), combo(&[4]), combo(&[3])],
        )
        .await
        .unwrap();

    assert!(stopped.is_some());
    assert_eq!(result.skipped, 1);
    let report = TextReport::new(&result, config.violation_report_limit).render();
    assert!(report.contains("PASS [5] 5 stars"));
    assert!(report.contains("FAIL [4] 4 stars"));
    assert!(report.contains("stopped early: 1 combination(s) not run"));
    let back: starsift::RunResult = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(back.outcomes.len(), 2);
}

#[tokio::test]
async fn test_cleanup_failure_does_not_mask_primary_error() {
    let mut hotels = rated("Three", 2, 3);
    hotels.push(MockHotel::rated("Budget", 2));
    let mock = MockListing::new(hotels).with_checked(2).with_broken_control(2);
    let sink = RecordingDiagnostics::new();
    let config = fast_config().with_strategy(ToggleStrategy::Diff);

    // the stale rating 2 cannot be cleared, so apply itself fails
    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&[combo(&[3])])
        .await
        .unwrap();

    let outcome = &result.outcomes[0];
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(failure.kind, "filter_toggle");
    assert!(failure.infrastructure);
    assert!(outcome.cleanup_failure.as_ref().unwrap().contains("2 stars"));
    assert!(sink.contains("star_filter_2_error"));
}

#[tokio::test]
async fn test_page_that_never_changes_is_pagination_error() {
    let mock = MockListing::new(rated("Four", 15, 4))
        .with_page_size(5)
        .with_stuck_pagination();
    let sink = RecordingDiagnostics::new();
    let config = fast_config();

    let result = CombinationRunner::new(&mock, &sink, &config)
        .run_combinations(&[combo(&[4])])
        .await
        .unwrap();

    let failure = result.outcomes[0].failure.as_ref().unwrap();
    assert_eq!(failure.kind, "pagination");
    assert!(sink.contains("pagination_error"));
    assert!(mock.control_state().is_clear());
}
