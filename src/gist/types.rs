//! Wire types for the GitHub Gists REST API.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(super) struct GistPayload {
    pub(super) updated_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub(super) files: BTreeMap<String, Option<GistFilePayload>>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct GistFilePayload {
    #[serde(default)]
    pub(super) content: Option<String>,
    #[serde(default)]
    pub(super) truncated: bool,
    #[serde(default)]
    pub(super) raw_url: Option<String>,
}

/// Body of `PATCH /gists/{id}`. A `None` file serialises to `null`, which
/// GitHub interprets as "delete this file".
#[derive(Debug, Serialize)]
pub(super) struct GistPatch<'a> {
    pub(super) files: BTreeMap<&'a str, Option<FileContent<'a>>>,
}

#[derive(Debug, Serialize)]
pub(super) struct FileContent<'a> {
    pub(super) content: &'a str,
}
