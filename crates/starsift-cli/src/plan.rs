//! Turning command-line input into a run configuration and a plan.

use crate::commands::{PlanSource, RunArgs};
use crate::error::{CliError, CliResult};
use starsift::{single_rating_plan, FilterCombination, RunConfig};
use std::path::Path;

/// Load the run configuration, or the defaults when no file is given
pub fn load_run_config(path: Option<&Path>) -> CliResult<RunConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config(format!("{} does not exist", path.display())));
            }
            tracing::debug!(path = %path.display(), "loading run configuration");
            Ok(RunConfig::load(path)?)
        }
        None => Ok(RunConfig::default()),
    }
}

/// Apply `run` flags on top of the file configuration
pub fn effective_config(args: &RunArgs) -> CliResult<RunConfig> {
    let mut config = load_run_config(args.plan.config.as_deref())?;
    if args.fail_fast {
        config.fail_fast = true;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(ms) = args.load_timeout {
        config.load_timeout_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

/// Combinations in execution order: singles first, then explicit combos
pub fn build_plan(source: &PlanSource, config: &RunConfig) -> CliResult<Vec<FilterCombination>> {
    let mut plan = if source.singles {
        single_rating_plan(&config.managed_ratings)
    } else {
        Vec::new()
    };
    plan.extend(source.combos.iter().cloned());
    if plan.is_empty() {
        return Err(CliError::invalid_argument(
            "no combinations given; use --combo or --singles",
        ));
    }
    config.check_plan(&plan)?;
    Ok(plan)
}
