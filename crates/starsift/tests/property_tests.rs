//! Property-based tests for the filter engine.
//!
//! Async paths run on a current-thread runtime inside each proptest case.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use starsift::mock::{MockHotel, MockListing};
use starsift::{
    FilterCombination, FilterController, NullDiagnostics, PaginationWalker, Readiness, RunConfig,
    StarRating, ToggleStrategy,
};

fn fast_config(strategy: ToggleStrategy) -> RunConfig {
    RunConfig::default()
        .with_load_timeout(60)
        .with_loader_grace(2)
        .with_toggle_timeout(30)
        .with_pagination_timeout(30)
        .with_poll_interval(1)
        .with_strategy(strategy)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn listing() -> MockListing {
    let hotels = (0..=5u8)
        .flat_map(|stars| {
            (0..2).map(move |i| {
                if stars == 0 {
                    MockHotel::unrated(format!("Plain {i}"))
                } else {
                    MockHotel::rated(format!("Hotel {stars}-{i}"), stars)
                }
            })
        })
        .collect();
    MockListing::new(hotels)
}

fn combination() -> impl Strategy<Value = Vec<u8>> {
    proptest::sample::subsequence(vec![5u8, 4, 3, 2, 1, 0], 1..=6).prop_shuffle()
}

fn strategy() -> impl Strategy<Value = ToggleStrategy> {
    prop_oneof![Just(ToggleStrategy::Diff), Just(ToggleStrategy::ClearThenSet)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// apply, reset, apply lands where a single apply does.
    #[test]
    fn prop_toggle_convergence(
        target in combination(),
        initial in proptest::sample::subsequence(vec![0u8, 1, 2, 3, 4, 5], 0..=6),
        strategy in strategy(),
    ) {
        let target = FilterCombination::from_values(&target).unwrap();
        let config = fast_config(strategy);
        let mut mock = listing();
        for rating in &initial {
            mock = mock.with_checked(*rating);
        }
        let state = runtime().block_on(async {
            let mut controller = FilterController::new(&mock, &NullDiagnostics, &config);
            controller.apply(&target).await.unwrap();
            assert!(controller.reset().await.is_none());
            controller.apply(&target).await.unwrap();
            mock.control_state()
        });
        prop_assert!(state.matches(&target), "{:?} vs {}", state, target);
    }

    /// Resetting twice clicks nothing the second time.
    #[test]
    fn prop_reset_idempotent(
        initial in proptest::sample::subsequence(vec![0u8, 1, 2, 3, 4, 5], 0..=6),
    ) {
        let config = fast_config(ToggleStrategy::ClearThenSet);
        let mut mock = listing();
        for rating in &initial {
            mock = mock.with_checked(*rating);
        }
        let (first, second) = runtime().block_on(async {
            let mut controller = FilterController::new(&mock, &NullDiagnostics, &config);
            assert!(controller.reset().await.is_none());
            let first = mock.count_calls("activate:");
            assert!(controller.reset().await.is_none());
            (first, mock.count_calls("activate:"))
        });
        prop_assert_eq!(first, initial.len());
        prop_assert_eq!(first, second);
        prop_assert!(mock.control_state().is_clear());
    }

    /// The walker visits exactly ceil(n / page_size) pages.
    #[test]
    fn prop_pagination_terminates(count in 1usize..40, page_size in 1usize..12) {
        let hotels = (0..count)
            .map(|i| MockHotel::rated(format!("Hotel {i}"), 4))
            .collect();
        let mock = MockListing::new(hotels).with_page_size(page_size);
        let config = fast_config(ToggleStrategy::ClearThenSet);
        let target = FilterCombination::single(StarRating::new(4));
        let summary = runtime().block_on(async {
            PaginationWalker::new(&mock, &NullDiagnostics, &config)
                .run(&target, Readiness::Ready { records: 1 })
                .await
                .unwrap()
        });
        prop_assert_eq!(summary.pages, count.div_ceil(page_size));
        prop_assert_eq!(summary.records, count);
    }
}
