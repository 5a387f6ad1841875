//! GitHub API access: the paginated fetcher and the source adapter
//!
//! Both sync operations (repository listing, open pull request search) are
//! built on one exhaustive page walker. Pages are requested 1-indexed with an
//! explicit page size; the walk stops once a page comes back shorter than the
//! requested size, which means the short (possibly empty) last page is always
//! fetched; there is no separate total-count read.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Identity;

/// Public GitHub API host, used when an identity has no host override
pub const DEFAULT_API_HOST: &str = "https://api.github.com";

/// Items requested per page on every paginated endpoint
pub const PAGE_SIZE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the fetcher and adapter layer
#[derive(Debug, Error)]
pub enum FetchError {
    /// Caller-fixable problem, detected before any network call
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Connection or DNS failure during a page fetch
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Per-request timeout elapsed; retryable, unlike other transport failures
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Response body does not match the expected page schema
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Non-2xx HTTP status, with the response body captured for diagnostics
    #[error("{url} returned HTTP {status}: {body}")]
    UpstreamRejected {
        url: String,
        status: StatusCode,
        body: String,
    },
}

impl FetchError {
    fn transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Repository owner or pull request author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// One repository as listed by the repos endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub owner: Owner,
    #[serde(default)]
    pub clone_url: String,
    #[serde(rename = "html_url")]
    pub web_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One open pull request as returned by the issue search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub user: Owner,
    #[serde(rename = "html_url")]
    pub web_url: String,
    #[serde(default)]
    pub draft: bool,
    pub repository_url: String,
}

impl PullRequest {
    /// Derive `owner/name` from the repository URL's last two path segments
    pub fn repository_name(&self) -> String {
        let trimmed = self.repository_url.trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');

        match (segments.next(), segments.next()) {
            (Some(name), Some(owner)) if !name.is_empty() && !owner.is_empty() => {
                format!("{}/{}", owner, name)
            }
            _ => self.repository_url.clone(),
        }
    }
}

/// Envelope returned by the issue search endpoint
#[derive(Debug, Deserialize)]
struct SearchResults {
    items: Vec<PullRequest>,
}

/// The seam between the sync orchestrator and the network
///
/// Implemented by [`GitHubClient`] for real fetches and by in-memory fakes in
/// the orchestrator's tests.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// List every repository under the identity's account
    async fn repositories(&self, identity: &Identity) -> std::result::Result<Vec<Repository>, FetchError>;

    /// Search open pull requests authored by the identity (users only)
    async fn open_pull_requests(
        &self,
        identity: &Identity,
    ) -> std::result::Result<Vec<PullRequest>, FetchError>;
}

/// GitHub REST client
pub struct GitHubClient {
    http: reqwest::Client,
}

impl GitHubClient {
    /// Create a client with the crate's user agent and per-request timeout
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("repodex/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http })
    }

    /// Walk every page of a listing endpoint into one ordered vector
    ///
    /// `url_for` produces the URL for a 1-indexed page; `decode` turns one
    /// page's status and body into items. Any error discards the pages
    /// accumulated so far for this call.
    async fn fetch_paginated<T, U, D>(
        &self,
        token: Option<&str>,
        url_for: U,
        decode: D,
    ) -> std::result::Result<Vec<T>, FetchError>
    where
        U: Fn(usize) -> String,
        D: Fn(&str, StatusCode, &[u8]) -> std::result::Result<Vec<T>, FetchError>,
    {
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let url = url_for(page);
            debug!("Fetching page {} from {}", page, url);

            let mut request = self.http.get(&url);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| FetchError::transport(&url, e))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::transport(&url, e))?;

            let items = decode(&url, status, &body)?;
            let count = items.len();
            all.extend(items);

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }
}

#[async_trait]
impl RemoteSource for GitHubClient {
    async fn repositories(
        &self,
        identity: &Identity,
    ) -> std::result::Result<Vec<Repository>, FetchError> {
        let name = identity.name.trim();
        if name.is_empty() {
            return Err(FetchError::InvalidInput(
                "identity name is required".to_string(),
            ));
        }

        let host = identity.api_host().to_string();
        let scope = if identity.is_org { "orgs" } else { "users" };
        let name = name.to_string();

        let repositories = self
            .fetch_paginated(
                identity.token.as_deref(),
                |page| {
                    format!(
                        "{}/{}/{}/repos?per_page={}&page={}",
                        host, scope, name, PAGE_SIZE, page
                    )
                },
                decode_repository_page,
            )
            .await?;

        info!("Fetched {} repositories for {}", repositories.len(), name);
        Ok(repositories)
    }

    async fn open_pull_requests(
        &self,
        identity: &Identity,
    ) -> std::result::Result<Vec<PullRequest>, FetchError> {
        let name = identity.name.trim();
        if name.is_empty() {
            return Err(FetchError::InvalidInput(
                "identity name is required".to_string(),
            ));
        }
        if identity.is_org {
            return Err(FetchError::InvalidInput(format!(
                "pull request search is not supported for organizations ({})",
                identity.name
            )));
        }

        let host = identity.api_host().to_string();
        let name = name.to_string();

        let pull_requests = self
            .fetch_paginated(
                identity.token.as_deref(),
                |page| {
                    format!(
                        "{}/search/issues?q=state:open+type:pr+author:{}&per_page={}&page={}",
                        host, name, PAGE_SIZE, page
                    )
                },
                decode_search_page,
            )
            .await?;

        info!(
            "Fetched {} open pull requests for {}",
            pull_requests.len(),
            name
        );
        Ok(pull_requests)
    }
}

fn reject_error_status(
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }

    Err(FetchError::UpstreamRejected {
        url: url.to_string(),
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

fn decode_repository_page(
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<Vec<Repository>, FetchError> {
    reject_error_status(url, status, body)?;

    serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        source: e,
    })
}

fn decode_search_page(
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<Vec<PullRequest>, FetchError> {
    reject_error_status(url, status, body)?;

    let results: SearchResults = serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        source: e,
    })?;

    Ok(results.items)
}
