//! Starsift CLI: verify star-rating filters on a live listing
//!
//! ## Usage
//!
//! ```bash
//! starsift run --url https://hotels.example/ --singles     # every rating alone
//! starsift run --url ... --combo 5,4,3 --fail-fast         # one combination
//! starsift plan --singles --combo unrated,3                # print the plan
//! starsift config --config run.yaml                        # effective settings
//! ```

use clap::Parser;
use starsift_cli::{
    build_plan, load_run_config, logging, render_plan, Cli, CliConfig, CliError, CliResult,
    ColorChoice, Commands, ConfigArgs, PlanArgs, RunArgs, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity, config.color.should_color());

    match cli.command {
        Commands::Run(args) => run_verification(&config, &args),
        Commands::Plan(args) => run_plan(&args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

fn run_plan(args: &PlanArgs) -> CliResult<()> {
    let config = load_run_config(args.plan.config.as_deref())?;
    let plan = build_plan(&args.plan, &config)?;
    if args.json {
        let json = serde_json::to_string_pretty(&plan).map_err(starsift::StarsiftError::from)?;
        println!("{json}");
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = load_run_config(args.config.as_deref())?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

#[cfg(feature = "browser")]
fn run_verification(cli_config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    use starsift::cdp::{CdpListingDriver, LaunchOptions};
    use starsift::{CombinationRunner, StarsiftError, TextReport};
    use starsift_cli::{effective_config, ProgressReporter, ScreenshotArchive};
    use std::time::Instant;

    let config = effective_config(args)?;
    let plan = build_plan(&args.plan, &config)?;

    let mut options = LaunchOptions::default();
    if args.headed {
        options = options.headed();
    }
    if args.no_sandbox {
        options = options.with_no_sandbox();
    }
    if let Some(ref chrome) = args.chrome {
        options = options.with_chromium_path(chrome.to_string_lossy());
    }

    let mut reporter = ProgressReporter::new(
        cli_config.color.should_color(),
        cli_config.verbosity.is_quiet(),
    );
    reporter.info(&format!("verifying {} combinations on {}", plan.len(), args.url));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let start = Instant::now();
    let (outcome, stopped) = runtime.block_on(async {
        let driver = CdpListingDriver::launch(options).await?;
        let archive = ScreenshotArchive::new(&driver, &args.screenshots)?;
        reporter.start_spinner("verifying filters");
        let collected = CombinationRunner::new(&driver, &archive, &config)
            .run_at_collected(&args.url, &plan)
            .await;
        reporter.finish();
        drop(archive);
        if let Err(err) = driver.close().await {
            tracing::warn!(error = %err, "browser did not shut down cleanly");
        }
        Ok::<_, StarsiftError>(collected)
    })??;

    print!(
        "{}",
        TextReport::new(&outcome, config.violation_report_limit).render()
    );
    reporter.summary(
        outcome.passed_count(),
        outcome.failed_count(),
        outcome.total_records(),
        start.elapsed(),
    );

    if let Some(ref path) = args.report_json {
        std::fs::write(path, outcome.to_json()?)?;
        reporter.success(&format!("run result written to {}", path.display()));
    }

    if let Some(err) = stopped {
        reporter.failure(&format!(
            "fail-fast: {} combination(s) not run",
            outcome.skipped
        ));
        return Err(err.into());
    }
    if outcome.all_passed() {
        Ok(())
    } else {
        Err(CliError::verification(format!(
            "{} of {} combinations failed",
            outcome.failed_count(),
            outcome.outcomes.len()
        )))
    }
}

#[cfg(not(feature = "browser"))]
fn run_verification(_config: &CliConfig, _args: &RunArgs) -> CliResult<()> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}
