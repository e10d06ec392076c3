//! One-shot management commands: list, upload and delete.
//!
//! None of these retry. Per-file problems during upload and delete are
//! logged and skipped so one bad argument does not block the rest.

use std::collections::BTreeMap;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::gist::{GistClient, GistError};
use crate::local_fs::LocalFile;
use crate::remote::Collection;

/// Errors raised by the management commands.
#[derive(Debug, Error)]
pub enum ManageError {
    /// Raised when the gist API call fails.
    #[error(transparent)]
    Gist(#[from] GistError),
    /// Raised when none of the given files could be read.
    #[error("none of the {count} file(s) could be read; nothing uploaded")]
    NothingToUpload {
        /// Number of paths given.
        count: usize,
    },
    /// Raised when a local file cannot be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when writing the listing fails.
    #[error("failed to write listing: {0}")]
    Output(#[from] io::Error),
}

/// Result of [`delete`].
#[derive(Debug, Default, Eq, PartialEq)]
pub struct DeleteSummary {
    /// Names removed from the gist.
    pub deleted: Vec<String>,
    /// Names whose deletion failed, with the error text.
    pub failed: Vec<(String, String)>,
}

/// Fetches the gist and writes one line per file to `out`.
///
/// # Errors
///
/// Returns [`ManageError::Gist`] when the fetch fails and
/// [`ManageError::Output`] when `out` rejects the write.
pub async fn list<W: Write>(client: &GistClient, out: &mut W) -> Result<usize, ManageError> {
    let collection = client.download().await?;
    render_listing(&collection, out)?;
    Ok(collection.len())
}

/// Writes `- name (N bytes)` or `- name (deleted)` for every entry.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn render_listing<W: Write>(collection: &Collection, out: &mut W) -> io::Result<()> {
    for entry in collection.entries() {
        if entry.deleted {
            writeln!(out, "- {} (deleted)", entry.name)?;
        } else {
            writeln!(out, "- {} ({} bytes)", entry.name, entry.content.len())?;
        }
    }
    Ok(())
}

/// Reads every path and uploads the readable ones under their base names.
/// Returns the uploaded names.
///
/// # Errors
///
/// Returns [`ManageError::NothingToUpload`] when no file could be read and
/// [`ManageError::Gist`] when the upload fails.
pub async fn upload(
    client: &GistClient,
    paths: &[Utf8PathBuf],
) -> Result<Vec<String>, ManageError> {
    let mut files = BTreeMap::new();
    for path in paths {
        match read_local(path) {
            Ok((name, content)) => {
                files.insert(name, content);
            }
            Err(err) => error!(path = %path, error = %err, "skipping unreadable file"),
        }
    }
    if files.is_empty() {
        return Err(ManageError::NothingToUpload { count: paths.len() });
    }

    client.upload_files(&files).await?;
    let names: Vec<String> = files.into_keys().collect();
    info!(count = names.len(), "successfully uploaded files");
    Ok(names)
}

/// Deletes each argument's base name from the gist, continuing past
/// failures.
///
/// # Errors
///
/// Returns [`ManageError::Gist`] with [`GistError::Unauthenticated`] up front
/// when the client has no token; other failures are collected per file.
pub async fn delete(client: &GistClient, names: &[String]) -> Result<DeleteSummary, ManageError> {
    if !client.is_authenticated() {
        return Err(GistError::Unauthenticated.into());
    }
    let mut summary = DeleteSummary::default();
    for raw in names {
        let name = base_name(Utf8Path::new(raw)).to_owned();
        match client.delete_file(&name).await {
            Ok(()) => {
                info!(gist_file = %name, "deleted");
                summary.deleted.push(name);
            }
            Err(err) => {
                error!(gist_file = %name, error = %err, "failed to delete");
                summary.failed.push((name, err.to_string()));
            }
        }
    }
    Ok(summary)
}

fn base_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or_else(|| path.as_str())
}

fn read_local(path: &Utf8Path) -> Result<(String, Vec<u8>), ManageError> {
    let name = path.file_name().ok_or_else(|| ManageError::Read {
        path: path.to_path_buf(),
        message: String::from("path does not name a file"),
    })?;
    let content = LocalFile::resolve(path)
        .ok_or_else(|| ManageError::Read {
            path: path.to_path_buf(),
            message: String::from("path does not name a file"),
        })?
        .read()
        .map_err(|err| ManageError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    Ok((name.to_owned(), content))
}
