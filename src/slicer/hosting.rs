//! Repository hosting API (GitHub REST v3)

use super::RepositoryReference;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("smellslice/", env!("CARGO_PKG_VERSION"));

/// Failures talking to the hosting API
#[derive(Debug, Error)]
pub enum HostingError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("repository metadata for {0} has no creation date")]
    MissingCreationDate(String),
}

/// Signature block of a commit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub committer: Option<Signature>,
    #[serde(default)]
    pub author: Option<Signature>,
}

/// One history event as listed by the commits endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CommitEvent {
    pub sha: String,
    #[serde(default)]
    pub commit: Option<CommitDetail>,
}

impl CommitEvent {
    /// Committer date, falling back to the author date
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let detail = self.commit.as_ref()?;
        detail
            .committer
            .as_ref()
            .and_then(|s| s.date)
            .or_else(|| detail.author.as_ref().and_then(|s| s.date))
    }

    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryMetadata {
    created_at: Option<DateTime<Utc>>,
}

/// Remote source of repository metadata and history
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// When the repository was created
    async fn created_at(&self, repo: &RepositoryReference) -> Result<DateTime<Utc>, HostingError>;

    /// Commits with timestamps in `[since, until)`, in the API's own order
    async fn commits_between(
        &self,
        repo: &RepositoryReference,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CommitEvent>, HostingError>;
}

/// GitHub REST client with an optional bearer token
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, HostingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(HostingError::Client)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn repo_url(&self, repo: &RepositoryReference) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.name)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, HostingError> {
        debug!("GET {} {:?}", url, query);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| HostingError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostingError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| HostingError::Decode { url, source })
    }
}

/// RFC 3339 form used for `since`/`until` parameters
pub fn api_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn created_at(&self, repo: &RepositoryReference) -> Result<DateTime<Utc>, HostingError> {
        let metadata: RepositoryMetadata = self.get_json(self.repo_url(repo), &[]).await?;
        metadata
            .created_at
            .ok_or_else(|| HostingError::MissingCreationDate(repo.to_string()))
    }

    async fn commits_between(
        &self,
        repo: &RepositoryReference,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CommitEvent>, HostingError> {
        let url = format!("{}/commits", self.repo_url(repo));
        let query = [("since", api_timestamp(since)), ("until", api_timestamp(until))];
        self.get_json(url, &query).await
    }
}
