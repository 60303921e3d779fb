//! Campaign command handlers

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use chainfuzz::{
    find_test, Campaign, CampaignConfig, CampaignReport, FuzzTest, ProcessSpawner, TerminalPrompt,
};
use std::fs;
use std::time::Duration;

/// Campaign configuration for a `run` invocation; creates the logs directory
pub fn build_campaign_config(args: &RunArgs) -> CliResult<CampaignConfig> {
    if args.processes == 0 {
        return Err(CliError::invalid_argument("--processes must be at least 1"));
    }
    if args.coverage > args.processes {
        return Err(CliError::invalid_argument(format!(
            "--coverage {} exceeds --processes {}",
            args.coverage, args.processes
        )));
    }
    fs::create_dir_all(&args.logs_dir)?;

    let mut builder = CampaignConfig::builder()
        .process_count(args.processes)
        .seeds(args.seeds.clone())
        .logs_dir(&args.logs_dir)
        .passive(args.passive)
        .network(args.network)
        .coverage_workers(args.coverage)
        .verbose_coverage(args.verbose_coverage)
        .base_port(args.base_port)
        .coverage_dir(&args.coverage_dir);
    if let Some(secs) = args.decision_timeout {
        builder = builder.decision_timeout(Duration::from_secs(secs));
    }
    let config = builder.build();
    config.validate()?;
    Ok(config)
}

/// Execute `run`: spawn workers by re-executing this binary
pub fn execute_run(
    reporter: &Reporter,
    tests: &[&FuzzTest],
    args: &RunArgs,
) -> CliResult<CampaignReport> {
    let test = find_test(tests, &args.test)?;
    let config = build_campaign_config(args)?;
    let mut prompt = TerminalPrompt::new(config.decision_timeout);
    let spawner = ProcessSpawner::current_exe()?;

    reporter.info(&format!(
        "fuzzing {} with {} processes, logs in {}",
        test.qualified_name(),
        config.process_count,
        config.logs_dir.display()
    ));
    let report = Campaign::new(config).run(test, &spawner, &mut prompt)?;
    reporter.campaign(&report);
    Ok(report)
}

/// One line per registered test: name and declared extras
#[must_use]
pub fn render_test_list(tests: &[&FuzzTest]) -> String {
    let mut out = String::new();
    for test in tests {
        out.push_str(&test.qualified_name());
        if !test.params.is_empty() {
            out.push_str(&format!(" ({})", test.params.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Execute `list`
pub fn execute_list(tests: &[&FuzzTest]) {
    print!("{}", render_test_list(tests));
}
