//! Starsift CLI library
//!
//! Command-line front end for the Starsift filter verification engine.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod diagnostics;
mod error;
pub mod logging;
mod output;
mod plan;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, PlanArgs, PlanSource, RunArgs, StrategyArg,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use diagnostics::ScreenshotArchive;
pub use error::{CliError, CliResult};
pub use output::{render_plan, ProgressReporter};
pub use plan::{build_plan, effective_config, load_run_config};
