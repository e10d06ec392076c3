//! Mapping table tracked by the engine.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

/// Binding from one remote entry to one local file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mapping {
    remote_name: String,
    local_path: Utf8PathBuf,
    exec_command: Option<String>,
    last_applied_at: DateTime<Utc>,
}

impl Mapping {
    /// Creates a mapping that has never been applied. A blank command is
    /// treated as no command.
    #[must_use]
    pub fn new(
        remote_name: impl Into<String>,
        local_path: impl Into<Utf8PathBuf>,
        exec_command: Option<String>,
    ) -> Self {
        Self {
            remote_name: remote_name.into(),
            local_path: local_path.into(),
            exec_command: exec_command.filter(|command| !command.trim().is_empty()),
            last_applied_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Name of the remote entry this mapping mirrors.
    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Local destination.
    #[must_use]
    pub fn local_path(&self) -> &Utf8Path {
        &self.local_path
    }

    /// Command to run after a successful write, if any.
    #[must_use]
    pub fn exec_command(&self) -> Option<&str> {
        self.exec_command.as_deref()
    }

    /// Collection timestamp most recently written to disk.
    #[must_use]
    pub const fn last_applied_at(&self) -> DateTime<Utc> {
        self.last_applied_at
    }

    /// Returns `true` until the first successful write.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.last_applied_at == DateTime::<Utc>::MIN_UTC
    }

    /// Returns `true` when `updated_at` is strictly newer than the last
    /// applied timestamp.
    #[must_use]
    pub fn is_stale(&self, updated_at: DateTime<Utc>) -> bool {
        updated_at > self.last_applied_at
    }

    /// Records a successful write. Older timestamps are ignored so the value
    /// never moves backwards.
    pub(crate) fn mark_applied(&mut self, updated_at: DateTime<Utc>) {
        if updated_at > self.last_applied_at {
            self.last_applied_at = updated_at;
        }
    }
}

/// Ordered list of mappings in configuration order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MappingTable {
    mappings: Vec<Mapping>,
}

impl MappingTable {
    /// Builds a table preserving the given order.
    #[must_use]
    pub const fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    /// Iterates over mappings in configuration order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.mappings.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Mapping> {
        self.mappings.iter_mut()
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns `true` when no mappings are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl FromIterator<Mapping> for MappingTable {
    fn from_iter<T: IntoIterator<Item = Mapping>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
