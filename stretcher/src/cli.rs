//! CLI argument definitions for the stretcher binary.
//!
//! Kept apart from the entrypoint so the argument surface can be tested
//! without running a deployment.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Deploy a release archive described by a YAML manifest.
#[derive(Parser, Debug, Default)]
#[command(name = "stretcher")]
#[command(version, about)]
#[command(long_about = concat!(
    "Deploy a release archive described by a YAML manifest.\n\n",
    "The manifest names the archive source, an optional hex checksum, the ",
    "destination directory and optional pre- and post-deploy shell commands. ",
    "The archive is verified before any command runs, unpacked with tar, and ",
    "mirrored onto the destination with rsync --delete.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Deploy from a local manifest:\n",
    "    $ stretcher deploy.yml\n\n",
    "  Deploy from a manifest served over HTTPS:\n",
    "    $ stretcher https://builds.example.com/app/manifest.yml\n\n",
    "  Preview the steps without touching anything:\n",
    "    $ stretcher --dry-run deploy.yml\n",
))]
pub struct Cli {
    /// Manifest location: a filesystem path, file:// URL or http(s):// URL.
    #[arg(value_name = "MANIFEST")]
    pub manifest: String,

    /// Directory for the staged archive and extraction directory
    /// [default: system temporary directory].
    #[arg(long, value_name = "DIR")]
    pub tmp_dir: Option<PathBuf>,

    /// Load and validate the manifest, print the planned steps and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report warnings and errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// The log level selected by `--quiet` and `--verbose`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::WARN;
        }
        match self.verbosity {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
