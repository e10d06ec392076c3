//! Ambient file access for mapped paths and operator-supplied files.
//!
//! Files are opened through a `cap-std` handle on their parent directory.
//! That handle refuses to follow a final symlink leading out of the
//! directory, so existing paths are canonicalised first and the handle is
//! opened on the directory that actually holds the file.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

/// A file path split into its containing directory and file name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LocalFile {
    parent: Utf8PathBuf,
    file_name: String,
}

impl LocalFile {
    /// Resolves `path`, following symlinks when it already exists. Paths
    /// that do not exist yet are used as given. Returns `None` when the
    /// path has no file name.
    pub(crate) fn resolve(path: &Utf8Path) -> Option<Self> {
        let resolved = path
            .canonicalize_utf8()
            .unwrap_or_else(|_| path.to_path_buf());
        let file_name = resolved.file_name()?.to_owned();
        let parent = match resolved.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        Some(Self { parent, file_name })
    }

    /// Directory holding the file.
    pub(crate) fn parent(&self) -> &Utf8Path {
        &self.parent
    }

    /// Final path component.
    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Creates the parent directory and any missing ancestors.
    pub(crate) fn create_parent(&self) -> io::Result<()> {
        Dir::create_ambient_dir_all(&self.parent, ambient_authority())
    }

    /// Opens the parent directory.
    pub(crate) fn open_parent(&self) -> io::Result<Dir> {
        Dir::open_ambient_dir(&self.parent, ambient_authority())
    }

    /// Reads the whole file.
    pub(crate) fn read(&self) -> io::Result<Vec<u8>> {
        self.open_parent()?.read(&self.file_name)
    }

    /// Reads the whole file as UTF-8 text.
    pub(crate) fn read_to_string(&self) -> io::Result<String> {
        self.open_parent()?.read_to_string(&self.file_name)
    }
}
