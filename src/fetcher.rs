//! Idempotent artifact retrieval.
//!
//! [`ArtifactFetcher::fetch`] walks `Idle -> Transferring -> {Succeeded, Failed}`:
//! the request is validated, the presence check may short-circuit, then the
//! transfer picked by [`scheme::detect`] is retried under a fixed policy.
//! Each attempt downloads into its own staging file which is renamed onto the
//! destination only after a complete transfer.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    request::{FetchOptions, FetchRequest},
    retry::{self, RetryPolicy},
    scheme::{self, SourceScheme},
    transfer::{Transfer, http::HttpTransfer, object_store::ObjectStoreTransfer},
    validate::{validate_not_dir, validate_parent_is_dir, validate_region},
};

/// Why a fetch did not succeed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error, never retried
    InvalidRequest,
    /// Every attempt failed
    TransferFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::TransferFailed => "transfer failed",
        };
        f.write_str(s)
    }
}

/// Outcome of one fetch call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResult {
    pub success: bool,
    /// `None` when nothing was transferred
    pub bytes_written: Option<u64>,
    pub error: Option<ErrorKind>,
    /// Transfer attempts made
    pub attempts: u32,
}

impl FetchResult {
    fn already_present() -> Self {
        Self {
            success: true,
            bytes_written: None,
            error: None,
            attempts: 0,
        }
    }

    fn transferred(bytes: u64, attempts: u32) -> Self {
        Self {
            success: true,
            bytes_written: Some(bytes),
            error: None,
            attempts,
        }
    }

    fn failed(error: ErrorKind, attempts: u32) -> Self {
        Self {
            success: false,
            bytes_written: None,
            error: Some(error),
            attempts,
        }
    }
}

/// Fetches artifacts through the object store or HTTP transfer
pub struct ArtifactFetcher {
    object_store: Box<dyn Transfer>,
    http: Box<dyn Transfer>,
    bar: ProgressBar,
}

impl Default for ArtifactFetcher {
    fn default() -> Self {
        Self::new(Box::new(ObjectStoreTransfer), Box::new(HttpTransfer))
    }
}

impl ArtifactFetcher {
    pub fn new(object_store: Box<dyn Transfer>, http: Box<dyn Transfer>) -> Self {
        Self {
            object_store,
            http,
            bar: ProgressBar::hidden(),
        }
    }

    /// Report transfer progress on `bar`
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    pub async fn fetch(&self, request: &FetchRequest, options: &FetchOptions) -> FetchResult {
        let locator = request.source_locator();
        let destination = request.destination_path();

        if let Err(err) = request.validate() {
            warn!(
                "Either source or destination is not defined: '{locator}' to {destination:?} ({err})"
            );
            return FetchResult::failed(ErrorKind::InvalidRequest, 0);
        }
        if let Err(err) = options.validate() {
            warn!("Invalid fetch options for '{locator}': {err}");
            return FetchResult::failed(ErrorKind::InvalidRequest, 0);
        }
        if let Err(err) =
            validate_not_dir(destination).and_then(|()| validate_parent_is_dir(destination))
        {
            warn!("Invalid destination for '{locator}': {err}");
            return FetchResult::failed(ErrorKind::InvalidRequest, 0);
        }

        let presence = options.presence();
        if presence.is_satisfied(destination) {
            info!("Skipping '{locator}': already present ({presence:?})");
            return FetchResult::already_present();
        }

        let scheme = scheme::detect(locator);
        if scheme == SourceScheme::ObjectStore
            && let Err(err) = validate_region(options.region.as_deref())
        {
            warn!("Cannot fetch '{locator}': {err}");
            return FetchResult::failed(ErrorKind::InvalidRequest, 0);
        }

        let transfer = match scheme {
            SourceScheme::ObjectStore => self.object_store.as_ref(),
            SourceScheme::Http => self.http.as_ref(),
        };
        if let Err(err) = transfer.preflight(options) {
            warn!("Cannot fetch '{locator}' using {scheme} protocol: {err:#}");
            return FetchResult::failed(ErrorKind::InvalidRequest, 0);
        }
        let policy = RetryPolicy::new(
            options.max_retries,
            Duration::from_secs(options.retry_delay_seconds),
        );
        debug!(
            "Retrieving '{locator}' to {destination:?} using {scheme} protocol ({policy}, anonymous: {})",
            options.anonymous_access
        );

        self.bar.set_message(format!("Fetching {locator}"));
        let outcome = retry::retry(policy, move |attempt| {
            self.attempt(transfer, locator, destination, options, attempt)
        })
        .await;

        match outcome {
            Ok((bytes, attempts)) => {
                self.bar.finish_with_message(format!("Saved to {}", destination.display()));
                info!("Fetched '{locator}' to {destination:?} ({bytes} bytes, {attempts} attempt(s))");
                FetchResult::transferred(bytes, attempts)
            }
            Err(err) => {
                self.bar.finish_and_clear();
                warn!("Failed to fetch '{locator}' to {destination:?}: {err}");
                FetchResult::failed(ErrorKind::TransferFailed, err.attempts)
            }
        }
    }

    /// One transfer into a fresh staging file, promoted to `destination` on success
    async fn attempt(
        &self,
        transfer: &dyn Transfer,
        locator: &str,
        destination: &Path,
        options: &FetchOptions,
        attempt: u32,
    ) -> anyhow::Result<u64> {
        create_parent_dirs(destination).await?;
        let staging = staging_path(destination);
        debug!("Attempt {attempt}: staging '{locator}' at {staging:?}");

        let result = async {
            let bytes = transfer
                .transfer(locator, &staging, options, &self.bar)
                .await?;
            if let Some(mode) = options.mode {
                set_mode(&staging, mode).await?;
            }
            tokio::fs::rename(&staging, destination)
                .await
                .with_context(|| format!("failed to move {staging:?} to {destination:?}"))?;
            Ok::<_, anyhow::Error>(bytes)
        }
        .await;

        if result.is_err() {
            remove_staging(&staging).await;
        }
        result
    }
}

/// Create parent directories for the given path
async fn create_parent_dirs(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create parent directories for '{path:?}'"))?;
    }
    Ok(())
}

/// Hidden sibling of `destination` unique to one attempt
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    destination.with_file_name(format!(".{name}.{}.part", Uuid::new_v4()))
}

async fn remove_staging(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => debug!("Removed partial download {staging:?}"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("Failed to remove partial download {staging:?}: {err}"),
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .with_context(|| format!("failed to set mode {mode:o} on {path:?}"))
}

#[cfg(not(unix))]
async fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    debug!("Ignoring mode {mode:o} for {path:?} on this platform");
    Ok(())
}
