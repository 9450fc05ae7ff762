//! Plain-text rendering of run results.

use crate::runner::{CombinationOutcome, RunResult};
use std::fmt::Write as _;

/// Renders a [`RunResult`] for humans
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a> {
    result: &'a RunResult,
    violation_limit: usize,
}

impl<'a> TextReport<'a> {
    /// Create a report listing up to `violation_limit` violations per failure
    #[must_use]
    pub const fn new(result: &'a RunResult, violation_limit: usize) -> Self {
        Self {
            result,
            violation_limit,
        }
    }

    /// One line per combination, details under failures
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let result = self.result;
        let _ = writeln!(
            out,
            "Run {}: {} combination(s), {} passed, {} failed",
            result.run_id,
            result.outcomes.len(),
            result.passed_count(),
            result.failed_count()
        );
        for outcome in &result.outcomes {
            self.render_outcome(&mut out, outcome);
        }
        if result.skipped > 0 {
            let _ = writeln!(out, "  stopped early: {} combination(s) not run", result.skipped);
        }
        let _ = writeln!(
            out,
            "{} record(s) on {} page(s) checked",
            result.total_records(),
            result.total_pages()
        );
        out
    }

    fn render_outcome(&self, out: &mut String, outcome: &CombinationOutcome) {
        let head = format!("{} {}", outcome.combination, outcome.description);
        if outcome.passed {
            let _ = writeln!(
                out,
                "  PASS {head}: {} record(s) on {} page(s) ({}ms)",
                outcome.records, outcome.pages, outcome.elapsed_ms
            );
        } else if let Some(failure) = &outcome.failure {
            let _ = writeln!(out, "  FAIL {head}: {}", failure.message);
            for line in violation_lines(&failure.violations, self.violation_limit) {
                let _ = writeln!(out, "       {line}");
            }
        }
        if let Some(cleanup) = &outcome.cleanup_failure {
            let _ = writeln!(out, "       cleanup failed: {cleanup}");
        }
    }
}

/// First `limit` violations, followed by "... and N more" when truncated
#[must_use]
pub fn violation_lines<T: std::fmt::Display>(violations: &[T], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = violations
        .iter()
        .take(limit)
        .map(|v| format!("- {v}"))
        .collect();
    if violations.len() > limit {
        lines.push(format!("... and {} more", violations.len() - limit));
    }
    lines
}
