//! GitHub Gist accessor for the sync engine and the management commands.
//!
//! Reads go through [`RemoteCollection`] so the engine never sees HTTP.
//! Writes (`upload_files`, `delete_file`) are plain inherent methods used
//! by the `upload` and `delete` subcommands and require a token.

mod error;
mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::remote::{
    Collection, MIN_INTERVAL_ANONYMOUS, MIN_INTERVAL_AUTHENTICATED, RemoteCollection,
    RemoteFuture,
};
use types::{FileContent, GistPatch, GistPayload};

pub use error::GistError;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("conf-sync/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Client for a single gist.
#[derive(Clone, Debug)]
pub struct GistClient {
    http: Client,
    base_url: Url,
    gist_id: String,
    token: Option<String>,
}

impl GistClient {
    /// Creates a client that sends `token` as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`GistError::Request`] when the HTTP client cannot be built.
    pub fn authenticated(
        token: impl Into<String>,
        gist_id: impl Into<String>,
    ) -> Result<Self, GistError> {
        Self::with_base_url(DEFAULT_API_URL, gist_id, Some(token.into()))
    }

    /// Creates a client without credentials. Anonymous clients can read
    /// public gists but are throttled to 60 requests per hour.
    ///
    /// # Errors
    ///
    /// Returns [`GistError::Request`] when the HTTP client cannot be built.
    pub fn anonymous(gist_id: impl Into<String>) -> Result<Self, GistError> {
        Self::with_base_url(DEFAULT_API_URL, gist_id, None)
    }

    /// Creates a client against an arbitrary API root, such as a GitHub
    /// Enterprise host or a local mock server. A blank token is treated as
    /// no token.
    ///
    /// # Errors
    ///
    /// Returns [`GistError::Url`] when `base_url` does not parse or cannot
    /// carry a path, and [`GistError::Request`] when the HTTP client cannot
    /// be built.
    pub fn with_base_url(
        base_url: &str,
        gist_id: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, GistError> {
        let parsed = Url::parse(base_url).map_err(|err| GistError::Url {
            url: base_url.to_owned(),
            message: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GistError::Url {
                url: base_url.to_owned(),
                message: String::from("URL cannot carry a path"),
            });
        }
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: parsed,
            gist_id: gist_id.into(),
            token: token.filter(|value| !value.trim().is_empty()),
        })
    }

    /// Returns `true` when requests carry a token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Identifier of the gist this client targets.
    #[must_use]
    pub fn gist_id(&self) -> &str {
        &self.gist_id
    }

    /// Fetches the gist and maps every file to a collection entry. Files
    /// with no content are reported as deleted; truncated files are fetched
    /// in full from their raw URL.
    ///
    /// # Errors
    ///
    /// Returns [`GistError::Api`] for non-success responses,
    /// [`GistError::Decode`] for malformed bodies and
    /// [`GistError::Request`] for transport failures.
    pub async fn download(&self) -> Result<Collection, GistError> {
        let url = self.gist_url()?;
        debug!(gist_id = %self.gist_id, "fetching gist");
        let response = self.authorize(self.http.get(url)).send().await?;
        let payload: GistPayload = Self::handle_response(response).await?;

        let mut collection = Collection::new(payload.updated_at.with_timezone(&Utc));
        for (name, file) in payload.files {
            let file_payload = file.unwrap_or_default();
            match file_payload.content {
                None => {
                    debug!(gist_file = %name, "file has no content; treating as deleted");
                    collection.push_deleted(name);
                }
                Some(_) if file_payload.truncated => {
                    let body = self
                        .fetch_raw(&name, file_payload.raw_url.as_deref())
                        .await?;
                    collection.push_file(name, body);
                }
                Some(content) => collection.push_file(name, content.into_bytes()),
            }
        }
        Ok(collection)
    }

    /// Creates or replaces the given files in the gist.
    ///
    /// # Errors
    ///
    /// Returns [`GistError::Unauthenticated`] without a token,
    /// [`GistError::NonUtf8`] for binary content and [`GistError::Api`] when
    /// GitHub rejects the update.
    pub async fn upload_files(&self, files: &BTreeMap<String, Vec<u8>>) -> Result<(), GistError> {
        self.require_token()?;
        let mut patch = BTreeMap::new();
        for (name, bytes) in files {
            let content = std::str::from_utf8(bytes)
                .map_err(|_| GistError::NonUtf8 { name: name.clone() })?;
            patch.insert(name.as_str(), Some(FileContent { content }));
        }
        debug!(gist_id = %self.gist_id, files = patch.len(), "uploading files");
        self.send_patch(&GistPatch { files: patch }).await
    }

    /// Removes `name` from the gist.
    ///
    /// # Errors
    ///
    /// Returns [`GistError::Unauthenticated`] without a token and
    /// [`GistError::Api`] when GitHub rejects the update.
    pub async fn delete_file(&self, name: &str) -> Result<(), GistError> {
        self.require_token()?;
        let mut files = BTreeMap::new();
        files.insert(name, None);
        debug!(gist_id = %self.gist_id, gist_file = name, "deleting file");
        self.send_patch(&GistPatch { files }).await
    }

    fn require_token(&self) -> Result<(), GistError> {
        if self.token.is_none() {
            return Err(GistError::Unauthenticated);
        }
        Ok(())
    }

    fn gist_url(&self) -> Result<Url, GistError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GistError::Url {
                url: self.base_url.to_string(),
                message: String::from("URL cannot carry a path"),
            })?
            .pop_if_empty()
            .push("gists")
            .push(&self.gist_id);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let with_accept = request.header(header::ACCEPT, GITHUB_MEDIA_TYPE);
        if let Some(token) = &self.token {
            return with_accept.bearer_auth(token);
        }
        with_accept
    }

    async fn send_patch(&self, body: &GistPatch<'_>) -> Result<(), GistError> {
        let url = self.gist_url()?;
        let response = self
            .authorize(self.http.patch(url))
            .json(body)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }

    async fn fetch_raw(&self, name: &str, raw_url: Option<&str>) -> Result<Vec<u8>, GistError> {
        let Some(raw) = raw_url else {
            return Err(GistError::Decode {
                message: format!("{name} is truncated but carries no raw_url"),
            });
        };
        let url = Url::parse(raw).map_err(|err| GistError::Url {
            url: raw.to_owned(),
            message: err.to_string(),
        })?;
        debug!(gist_file = name, "fetching truncated file from raw url");
        let response = self.authorize(self.http.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, GistError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| GistError::Decode {
            message: err.to_string(),
        })
    }

    async fn api_error(response: Response) -> GistError {
        let status = response.status();
        let exhausted = quota_exhausted(response.headers());
        let message = response.text().await.unwrap_or_default();
        let rate_limited = is_rate_limit_response(status, exhausted, &message);
        GistError::Api {
            status: status.as_u16(),
            message,
            rate_limited,
        }
    }
}

impl RemoteCollection for GistClient {
    type Error = GistError;

    fn fetch_all(&self) -> RemoteFuture<'_, Collection, Self::Error> {
        Box::pin(self.download())
    }

    fn is_rate_limited(&self, error: &Self::Error) -> bool {
        error.is_rate_limited()
    }

    fn minimum_interval(&self) -> Duration {
        if self.is_authenticated() {
            MIN_INTERVAL_AUTHENTICATED
        } else {
            MIN_INTERVAL_ANONYMOUS
        }
    }
}

fn quota_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0")
}

fn is_rate_limit_response(status: StatusCode, quota_exhausted: bool, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && quota_exhausted)
        || body.to_ascii_lowercase().contains("rate limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::too_many_requests(StatusCode::TOO_MANY_REQUESTS, false, "", true)]
    #[case::forbidden_with_empty_quota(StatusCode::FORBIDDEN, true, "", true)]
    #[case::forbidden_with_quota_left(StatusCode::FORBIDDEN, false, "Resource not accessible", false)]
    #[case::message_mentions_limit(StatusCode::FORBIDDEN, false, "API rate limit exceeded for 1.2.3.4", true)]
    #[case::not_found(StatusCode::NOT_FOUND, false, "Not Found", false)]
    fn classifies_rate_limit_responses(
        #[case] status: StatusCode,
        #[case] exhausted: bool,
        #[case] body: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_rate_limit_response(status, exhausted, body), expected);
    }

    #[test]
    fn gist_url_appends_to_base_path() {
        let client = GistClient::with_base_url("https://ghe.example.com/api/v3/", "abc123", None)
            .unwrap_or_else(|err| panic!("client should build: {err}"));
        let url = client
            .gist_url()
            .unwrap_or_else(|err| panic!("url should build: {err}"));
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/gists/abc123");
    }

    #[test]
    fn blank_token_means_anonymous() {
        let client =
            GistClient::with_base_url(DEFAULT_API_URL, "abc123", Some(String::from("  ")))
                .unwrap_or_else(|err| panic!("client should build: {err}"));
        assert!(!client.is_authenticated());
        assert_eq!(client.minimum_interval(), MIN_INTERVAL_ANONYMOUS);
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result = GistClient::with_base_url("not a url", "abc123", None);
        assert!(matches!(result, Err(GistError::Url { .. })));
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let client = GistClient::anonymous("abc123")
            .unwrap_or_else(|err| panic!("client should build: {err}"));
        let result = client.delete_file("a.conf").await;
        assert_eq!(result, Err(GistError::Unauthenticated));
    }
}
