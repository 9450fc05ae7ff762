//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use starsift::{FilterCombination, ToggleStrategy};
use std::path::PathBuf;

/// Starsift: verify that a listing's star-rating filter constrains every result page
#[derive(Parser, Debug)]
#[command(name = "starsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify filter combinations against a live listing
    Run(RunArgs),

    /// Validate and print the combinations a run would verify
    Plan(PlanArgs),

    /// Show the effective run configuration as YAML
    Config(ConfigArgs),
}

/// Where the combinations of a run come from
#[derive(Args, Debug, Clone, Default)]
pub struct PlanSource {
    /// Combination to verify, e.g. `5` or `5,4,3` or `unrated,3` (repeatable)
    #[arg(short = 'c', long = "combo", value_name = "RATINGS")]
    pub combos: Vec<FilterCombination>,

    /// Verify every managed rating on its own, highest first
    #[arg(long)]
    pub singles: bool,

    /// Run configuration file (YAML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Listing URL
    #[arg(long, env = "TEST_URL")]
    pub url: String,

    #[command(flatten)]
    pub plan: PlanSource,

    /// Stop after the first failed combination
    #[arg(long)]
    pub fail_fast: bool,

    /// How filter controls are driven to a combination
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Readiness bound in milliseconds
    #[arg(long, value_name = "MS")]
    pub load_timeout: Option<u64>,

    /// Write the run result as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report_json: Option<PathBuf>,

    /// Directory for failure screenshots
    #[arg(long, env = "SCREENSHOTS_DIR", default_value = "screenshots")]
    pub screenshots: PathBuf,

    /// Chrome/Chromium executable
    #[arg(long, env = "DRIVER_PATH", value_name = "PATH")]
    pub chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub plan: PlanSource,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Run configuration file (YAML) to merge over the defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Toggle strategy argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    /// Toggle only controls that differ from the target
    Diff,
    /// Clear every control, then set the target
    ClearThenSet,
}

impl From<StrategyArg> for ToggleStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Diff => Self::Diff,
            StrategyArg::ClearThenSet => Self::ClearThenSet,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
