//! cache-pull - Build cache restore step
//!
//! CLI entry point: reads the step configuration and runs the pull pipeline.

use cache_pull::cli::Cli;
use cache_pull::config::PullConfig;
use cache_pull::error::PullResult;
use cache_pull::ui::{self, UiContext};
use cache_pull::{Pipeline, PullOutcome};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ctx = UiContext::detect();

    // 0 = warn, 1 = info, 2+ or debug mode = debug
    let filter = match (cli.verbose, cli.debug) {
        (_, true) | (2.., _) => EnvFilter::new("cache_pull=debug"),
        (1, _) => EnvFilter::new("cache_pull=info"),
        _ => EnvFilter::new("cache_pull=warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::outro_error(&ctx, "Cache pull failed");
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, ctx: &UiContext) -> PullResult<()> {
    ui::intro(ctx, "Cache pull");

    let config = PullConfig::from_cli(cli)?;
    if config.debug {
        ui::key_value(ctx, "target_dir", &config.target_dir().display().to_string());
        ui::key_value(ctx, "archive_path", &config.archive_path.display().to_string());
    }

    match Pipeline::http(config, *ctx).run()? {
        PullOutcome::Skipped => {
            ui::outro_info(
                ctx,
                "No cache API URL specified, there's no cache to use, exiting.",
            );
        }
        PullOutcome::Restored(report) => {
            ui::outro_success(
                ctx,
                &format!(
                    "Restored {} entries from {} archive (took {:.2?})",
                    report.summary.entries(),
                    report.compression,
                    report.timings.total()
                ),
            );
        }
    }

    Ok(())
}
