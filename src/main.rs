// Obsidian Suite - research note generator
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;

use obsidian_suite::cli::{explain, format_report, Cli, Commands, ResearchArgs};
use obsidian_suite::config::{load_config, Credentials};
use obsidian_suite::logging::{init_tracing, RunLog};
use obsidian_suite::Researcher;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Research(args) => research(args, &cli).await,
    }
}

async fn research(args: &ResearchArgs, cli: &Cli) -> Result<()> {
    let mut config =
        load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let request = args.to_request().context("Invalid research request")?;
    let credentials = Credentials::from_env();

    let mut researcher = Researcher::from_config(&config, &credentials)?;
    match RunLog::new() {
        Ok(log) => {
            tracing::debug!("Run log: {}", log.today_path().display());
            researcher = researcher.with_run_log(log);
        }
        Err(e) => tracing::warn!("Run log disabled: {:#}", e),
    }

    tracing::info!(
        "Researching \"{}\" into {}",
        request.query,
        researcher.store().root().display()
    );

    match researcher.run(&request).await {
        Ok(report) => {
            print!("{}", format_report(&report));
            if !report.is_success() {
                tracing::warn!(
                    "{} note(s) failed; see the log above for details",
                    report.failures.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            let hint = explain(&e, &credentials);
            let err = anyhow::Error::new(e).context("Research run failed");
            match hint {
                Some(hint) => Err(err.context(hint)),
                None => Err(err),
            }
        }
    }
}
