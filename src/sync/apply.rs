//! Change detection and filesystem application for a single mapping.

use std::fmt;

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::effect::{EffectExecutor, EffectOutcome};
use super::mapping::Mapping;
use crate::local_fs::LocalFile;
use crate::remote::Collection;

/// Step of an apply that failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApplyStage {
    /// Creating the parent directories of the local path.
    CreateDirectories,
    /// Writing the entry content.
    Write,
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDirectories => f.write_str("create directories"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Errors raised while materialising an entry on disk.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApplyError {
    /// Raised when the local path has no file name component.
    #[error("local path {path} does not name a file")]
    NotAFile {
        /// Offending path.
        path: String,
    },
    /// Raised when a filesystem call fails.
    #[error("failed to {stage} for {path}: {message}")]
    Io {
        /// Step that failed.
        stage: ApplyStage,
        /// Path being accessed.
        path: String,
        /// Human-readable error message.
        message: String,
    },
}

impl ApplyError {
    /// Step the error belongs to.
    #[must_use]
    pub const fn stage(&self) -> ApplyStage {
        match self {
            Self::NotAFile { .. } => ApplyStage::Write,
            Self::Io { stage, .. } => *stage,
        }
    }
}

/// Per-mapping result of one cycle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MappingOutcome {
    /// The entry is absent from the fetch result.
    NotFound,
    /// The remote marks the entry as deleted; nothing was written.
    Deleted,
    /// The entry is not newer than the last applied timestamp.
    Unchanged,
    /// The entry was written and the timestamp advanced.
    Applied {
        /// Outcome of the post-update command.
        effect: EffectOutcome,
    },
    /// The entry could not be written; it is retried next cycle.
    Failed {
        /// Step that failed.
        stage: ApplyStage,
        /// Failure detail.
        error: ApplyError,
    },
}

impl MappingOutcome {
    /// Returns `true` when the local file was written.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Runs change detection for `mapping` against `collection` and applies
/// the entry when it is newer.
pub(crate) fn process_mapping<E: EffectExecutor>(
    mapping: &mut Mapping,
    collection: &Collection,
    executor: &E,
) -> MappingOutcome {
    let Some(entry) = collection.get(mapping.remote_name()) else {
        debug!(gist_file = mapping.remote_name(), "file not found in gist");
        return MappingOutcome::NotFound;
    };

    if entry.deleted {
        warn!(
            gist_file = mapping.remote_name(),
            local_path = %mapping.local_path(),
            "file is deleted in gist; keeping local copy"
        );
        return MappingOutcome::Deleted;
    }

    if !mapping.is_stale(entry.collection_updated_at) {
        debug!(
            gist_file = mapping.remote_name(),
            updated_at = %entry.collection_updated_at,
            last_applied_at = %mapping.last_applied_at(),
            "no changes"
        );
        return MappingOutcome::Unchanged;
    }

    info!(gist_file = mapping.remote_name(), "file has been updated, writing");
    if let Err(err) = write_local(mapping.local_path(), &entry.content) {
        error!(
            gist_file = mapping.remote_name(),
            local_path = %mapping.local_path(),
            error = %err,
            "failed to apply update"
        );
        return MappingOutcome::Failed {
            stage: err.stage(),
            error: err,
        };
    }

    mapping.mark_applied(entry.collection_updated_at);
    info!(local_path = %mapping.local_path(), "successfully updated");

    let effect = mapping
        .exec_command()
        .map_or(EffectOutcome::Skipped, |command| {
            executor.execute(mapping, command)
        });
    MappingOutcome::Applied { effect }
}

/// Creates the parent directories of `path` and replaces its contents. An
/// existing symlink is followed and its target rewritten.
///
/// # Errors
///
/// Returns [`ApplyError`] tagged with the step that failed.
pub fn write_local(path: &Utf8Path, content: &[u8]) -> Result<(), ApplyError> {
    let target = LocalFile::resolve(path).ok_or_else(|| ApplyError::NotAFile {
        path: path.to_string(),
    })?;
    let parent_error = |err: std::io::Error| ApplyError::Io {
        stage: ApplyStage::CreateDirectories,
        path: target.parent().to_string(),
        message: err.to_string(),
    };

    target.create_parent().map_err(parent_error)?;
    let dir = target.open_parent().map_err(parent_error)?;

    dir.write(target.file_name(), content)
        .map_err(|err| ApplyError::Io {
            stage: ApplyStage::Write,
            path: path.to_string(),
            message: err.to_string(),
        })
}
