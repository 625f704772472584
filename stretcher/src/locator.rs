//! Source locator resolution.
//!
//! Turns a locator string into a readable byte stream. `http://` and
//! `https://` locators are fetched with `ureq`; `file://` URLs and bare
//! paths are opened from the local filesystem. A `file://` URL may carry an
//! empty or `localhost` authority and percent-escapes. The contents are
//! never inspected here.

use crate::error::{DeployError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Network timeout for remote fetches, covering the whole transfer.
const FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Opens a readable byte stream for a source locator.
///
/// Abstracted so tests can serve archives from memory.
#[cfg_attr(test, mockall::automock)]
pub trait SourceOpener {
    /// Open `locator` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Transfer`] if the source cannot be opened.
    fn open(&self, locator: &str) -> Result<Box<dyn Read>>;
}

/// How a locator string will be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind<'a> {
    /// Fetched over HTTP(S); holds the full URL.
    Remote(&'a str),
    /// A `file://` URL; holds the full URL.
    FileUrl(&'a str),
    /// A bare filesystem path.
    Local(&'a str),
}

impl<'a> LocatorKind<'a> {
    /// Classify a locator string.
    ///
    /// # Examples
    ///
    /// ```
    /// use stretcher::locator::LocatorKind;
    ///
    /// assert_eq!(
    ///     LocatorKind::of("https://example.com/app.tar"),
    ///     LocatorKind::Remote("https://example.com/app.tar"),
    /// );
    /// assert_eq!(LocatorKind::of("file:///tmp/a.tar"), LocatorKind::FileUrl("file:///tmp/a.tar"));
    /// assert_eq!(LocatorKind::of("builds/a.tar"), LocatorKind::Local("builds/a.tar"));
    /// ```
    #[must_use]
    pub fn of(locator: &'a str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Self::Remote(locator)
        } else if locator.starts_with("file://") {
            Self::FileUrl(locator)
        } else {
            Self::Local(locator)
        }
    }
}

/// Production opener backed by the local filesystem and `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSourceOpener;

impl SourceOpener for DefaultSourceOpener {
    fn open(&self, locator: &str) -> Result<Box<dyn Read>> {
        match LocatorKind::of(locator) {
            LocatorKind::Remote(url) => open_remote(url),
            LocatorKind::FileUrl(url) => open_local(locator, &file_url_path(url)?),
            LocatorKind::Local(path) => open_local(locator, Path::new(path)),
        }
    }
}

/// Convert a `file://` URL to a local path.
///
/// # Errors
///
/// Returns [`DeployError::Transfer`] if the URL is malformed or names a
/// remote host.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use stretcher::locator::file_url_path;
///
/// let path = file_url_path("file://localhost/srv/my%20app.tar")?;
/// assert_eq!(path, Path::new("/srv/my app.tar"));
/// # Ok::<(), stretcher::error::DeployError>(())
/// ```
pub fn file_url_path(locator: &str) -> Result<PathBuf> {
    let url = Url::parse(locator).map_err(|e| DeployError::transfer(locator, e))?;
    url.to_file_path()
        .map_err(|()| DeployError::transfer(locator, "not a local file URL"))
}

fn open_local(locator: &str, path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| DeployError::transfer(locator, e))?;
    Ok(Box::new(file))
}

fn open_remote(url: &str) -> Result<Box<dyn Read>> {
    let response = http_agent()
        .get(url)
        .call()
        .map_err(|e| map_ureq_error(url, &e))?;
    Ok(Box::new(response.into_body().into_reader()))
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> DeployError {
    match err {
        ureq::Error::StatusCode(404) => DeployError::transfer(url, "not found (HTTP 404)"),
        ureq::Error::StatusCode(code) => DeployError::transfer(url, format!("HTTP status {code}")),
        other => DeployError::transfer(url, other),
    }
}
