//! Stretcher CLI entrypoint.
//!
//! Loads a deployment manifest from a path or URL and runs the deployment
//! pipeline it describes, or prints the planned steps with `--dry-run`.

use clap::Parser;
use log::info;
use std::error::Error as _;
use std::io::Write;
use stretcher::cli::Cli;
use stretcher::deploy::{StagingConfig, deploy, plan};
use stretcher::error::{DeployError, Result};
use stretcher::locator::DefaultSourceOpener;
use stretcher::manifest::load_manifest;
use stretcher::output::{dry_run_text, init_logging, success_message};

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    if let Err(err) = init_logging(cli.log_level()) {
        write_stderr_line(&mut stderr, format!("logging unavailable: {err}"));
    }
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let manifest = load_manifest(&DefaultSourceOpener, &cli.manifest)?;

    if cli.dry_run {
        let plan = plan(&manifest)?;
        write_stderr_line(stderr, dry_run_text(&cli.manifest, &plan));
        return Ok(());
    }

    let staging = StagingConfig {
        temp_root: cli.tmp_dir.clone(),
    };
    let report = deploy(&manifest, staging)?;
    info!("archive digest {} {}", report.algorithm, report.digest);
    if !cli.quiet {
        write_stderr_line(stderr, success_message(&report, manifest.dest()));
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, describe_failure(&err));
            1
        }
    }
}

/// Render `err` with the stage it stopped in and its underlying cause.
fn describe_failure(err: &DeployError) -> String {
    let message = match err.stage() {
        Some(stage) => format!("deploy failed during {stage}: {err}"),
        None => err.to_string(),
    };
    match err.source() {
        Some(source) => format!("{message}: {source}"),
        None => message,
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
