//! Output formatting for the stretcher CLI.
//!
//! Provides the logging setup installed by the binary and the messages it
//! prints around a run.

use crate::deploy::{DeployPlan, DeployReport};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Build the log filter for `level`.
#[must_use]
pub fn log_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

/// Install a stderr `fmt` subscriber filtered at `level`.
///
/// Records emitted through the `log` macros are forwarded to the
/// subscriber.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber or logger is already
/// installed.
pub fn init_logging(level: LevelFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(log_filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
}

/// Format the dry-run preview for `locator`.
#[must_use]
pub fn dry_run_text(locator: &str, plan: &DeployPlan) -> String {
    format!("Dry run - nothing will be fetched or modified\n\nManifest: {locator}\n{plan}")
}

/// Format a success message after deployment.
///
/// # Example
///
/// ```
/// use stretcher::checksum::DigestAlgorithm;
/// use stretcher::deploy::DeployReport;
/// use stretcher::output::success_message;
///
/// let report = DeployReport {
///     bytes_written: 1,
///     digest: "00".repeat(16),
///     algorithm: DigestAlgorithm::Md5,
///     verified: true,
/// };
/// assert_eq!(
///     success_message(&report, "/srv/app"),
///     "Deployed 1 byte to /srv/app (md5 verified)",
/// );
/// ```
#[must_use]
pub fn success_message(report: &DeployReport, dest: &str) -> String {
    let unit = if report.bytes_written == 1 { "byte" } else { "bytes" };
    let check = if report.verified {
        "verified"
    } else {
        "unverified"
    };
    format!(
        "Deployed {} {unit} to {dest} ({} {check})",
        report.bytes_written, report.algorithm
    )
}
