use crate::constants::{
    DEFAULT_FILENAME_EXTENSION, DEFAULT_FILENAME_PREFIX, FILENAME_PARAM_PATTERN,
};
use crate::errors::{AppError, AppResult};
use crate::export::requester::TransportResponse;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Cached regex for the `filename` parameter of `Content-Disposition`.
/// Compiled once at initialization for performance.
static FILENAME_REGEX: OnceLock<Regex> = OnceLock::new();

/// Where a downloaded payload ends up.
///
/// Mirrors the browser flow: the payload is parked behind a temporary handle
/// (an object URL), a download is triggered from that handle under the chosen
/// filename, and the handle is released. [`materialize`] guarantees that every
/// created handle is revoked exactly once.
pub trait SaveTarget: Send + Sync {
    type Handle: Send;

    /// Parks the payload and returns a handle to it.
    fn create_object_url(&self, payload: &[u8]) -> AppResult<Self::Handle>;

    /// Saves the parked payload under `filename`, returning where it landed.
    fn trigger_download(&self, handle: &Self::Handle, filename: &str) -> AppResult<PathBuf>;

    /// Releases the handle. Must not fail; problems are logged.
    fn revoke_object_url(&self, handle: Self::Handle);
}

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedExport {
    pub path: PathBuf,
    pub filename: String,
    pub bytes: usize,
}

/// Saves the response body through `target`.
///
/// The whole body is read into memory first; the filename comes from
/// `Content-Disposition` or falls back to a timestamped default.
pub async fn materialize<S: SaveTarget + ?Sized>(
    response: TransportResponse,
    target: &S,
) -> AppResult<SavedExport> {
    let filename = response
        .header(CONTENT_DISPOSITION.as_str())
        .and_then(|value| filename_from_content_disposition(&value))
        .unwrap_or_else(|| default_filename(Utc::now()));

    let payload = response
        .collect_body()
        .await
        .map_err(|e| AppError::MaterializationFailure(e.to_string()))?;
    debug!(filename = %filename, bytes = payload.len(), "Export payload received");

    let object_url = ObjectUrl {
        target,
        handle: Some(target.create_object_url(&payload)?),
    };
    let path = object_url.trigger_download(&filename)?;
    drop(object_url);

    Ok(SavedExport {
        path,
        filename,
        bytes: payload.len(),
    })
}

/// A created object URL; revoked when dropped, including during a panic.
struct ObjectUrl<'a, S: SaveTarget + ?Sized> {
    target: &'a S,
    handle: Option<S::Handle>,
}

impl<S: SaveTarget + ?Sized> ObjectUrl<'_, S> {
    fn trigger_download(&self, filename: &str) -> AppResult<PathBuf> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            AppError::MaterializationFailure("Object URL already revoked".to_string())
        })?;
        self.target.trigger_download(handle, filename)
    }
}

impl<S: SaveTarget + ?Sized> Drop for ObjectUrl<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.target.revoke_object_url(handle);
        }
    }
}

/// Extracts the suggested filename from a `Content-Disposition` value.
///
/// Accepts `filename="a.csv"`, `filename='a.csv'` and `filename=a.csv`.
/// An RFC 5987 `filename*=UTF-8''a%20b.csv` parameter wins over the plain one.
/// Quote characters and any directory part are stripped; empty names give `None`.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let regex = FILENAME_REGEX.get_or_init(|| {
        Regex::new(FILENAME_PARAM_PATTERN)
            .expect("FILENAME_PARAM_PATTERN is a valid regex pattern")
    });

    let mut plain = None;
    let mut extended = None;

    for caps in regex.captures_iter(header) {
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        let is_extended = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

        if is_extended {
            if extended.is_none() {
                extended = decode_extended_value(raw).and_then(|name| sanitize_filename(&name));
            }
        } else if plain.is_none() {
            plain = sanitize_filename(raw);
        }
    }

    extended.or(plain)
}

/// Decodes `charset'language'percent-encoded` into text.
fn decode_extended_value(raw: &str) -> Option<String> {
    let encoded = raw.trim().splitn(3, '\'').last()?;
    urlencoding::decode(encoded)
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Strips quotes and directories so the name stays inside the output directory.
fn sanitize_filename(raw: &str) -> Option<String> {
    let unquoted = raw.replace(['"', '\''], "");
    let name = unquoted.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// `logs_<YYYYMMDDhhmmss>.csv` for the given UTC instant.
pub fn default_filename(now: DateTime<Utc>) -> String {
    format!(
        "{DEFAULT_FILENAME_PREFIX}{}.{DEFAULT_FILENAME_EXTENSION}",
        now.format("%Y%m%d%H%M%S")
    )
}

/// Saves exports into a local directory.
///
/// The object URL is a hidden temp file next to the destination; it is removed
/// when revoked, whether or not the download succeeded.
#[derive(Debug, Clone)]
pub struct DirectorySaveTarget {
    output_dir: PathBuf,
}

impl DirectorySaveTarget {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl SaveTarget for DirectorySaveTarget {
    type Handle = NamedTempFile;

    fn create_object_url(&self, payload: &[u8]) -> AppResult<Self::Handle> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            AppError::MaterializationFailure(format!(
                "Failed to create directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".export-")
            .suffix(".part")
            .tempfile_in(&self.output_dir)
            .map_err(|e| {
                AppError::MaterializationFailure(format!("Failed to create temp file: {e}"))
            })?;
        tmp.write_all(payload)
            .and_then(|_| tmp.flush())
            .map_err(|e| {
                AppError::MaterializationFailure(format!(
                    "Failed to write temp file {}: {}",
                    tmp.path().display(),
                    e
                ))
            })?;
        Ok(tmp)
    }

    fn trigger_download(&self, handle: &Self::Handle, filename: &str) -> AppResult<PathBuf> {
        let destination = unique_destination(&self.output_dir, filename);
        fs::copy(handle.path(), &destination).map_err(|e| {
            AppError::MaterializationFailure(format!(
                "Failed to write {}: {}",
                destination.display(),
                e
            ))
        })?;
        info!(path = %destination.display(), "Export saved");
        Ok(destination)
    }

    fn revoke_object_url(&self, handle: Self::Handle) {
        let tmp_path = handle.path().to_path_buf();
        if let Err(e) = handle.close() {
            warn!(
                file_path = %tmp_path.display(),
                error = %e,
                "Failed to remove temp export file"
            );
        }
    }
}

/// First free path for `filename` in `dir`: `name.csv`, then `name (1).csv`, `name (2).csv`...
fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let extension = path.extension().and_then(|s| s.to_str());

    (1..)
        .map(|n| match extension {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
