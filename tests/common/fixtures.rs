//! Shared fixtures for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared helpers under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/fixtures.rs"]
//! mod fixtures;
//! ```

use camino::Utf8PathBuf;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

/// Temporary directory with a UTF-8 root path.
pub struct Utf8TempDir {
    _dir: TempDir,
    /// Root of the directory.
    pub root: Utf8PathBuf,
}

impl Utf8TempDir {
    /// Creates a fresh directory.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
        Self { _dir: dir, root }
    }

    /// Absolute path of `relative` inside the directory.
    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Reads `relative` as text.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|err| panic!("read {relative}: {err}"))
    }
}

/// Timestamp on a fixed day, `minute` minutes past noon UTC.
pub fn stamp(minute: u32) -> DateTime<Utc> {
    let Some(value) = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).single() else {
        panic!("valid timestamp for minute {minute}");
    };
    value
}
