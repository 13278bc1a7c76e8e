use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::event::RawEvent;

pub const GITHUB_API: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("ghgrip/", env!("CARGO_PKG_VERSION"));

/// Errors surfaced by GitHub API calls.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned HTTP {status}")]
    Status { status: u16 },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("GitHub token not configured; set it in the config file or GHGRIP_TOKEN")]
    MissingToken,

    #[error("GraphQL error: {message}")]
    GraphQl { message: String },
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    #[serde(default)]
    commits: Vec<CompareCommit>,
}

#[derive(Debug, Deserialize)]
struct CompareCommit {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

/// Thin wrapper over the GitHub REST and GraphQL APIs. The bearer token is
/// optional for the REST endpoints (public data, lower rate ceiling) and
/// required for GraphQL.
#[derive(Debug, Clone)]
pub struct GithubClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(GITHUB_API, token)
    }

    /// Points the client at a different host. Used by tests to talk to a
    /// mock server.
    pub fn with_base_url(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Fetches one page of a user's public event feed.
    pub async fn user_public_events(
        &self,
        username: &str,
        per_page: u32,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let path = format!("/users/{}/events/public?per_page={}", username, per_page);
        debug!(username, per_page, "fetching public events");

        let response = self.get(&path).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Resolves the commit messages between two refs via the compare API.
    /// Used to enrich push events whose payload omitted the commit list.
    pub async fn compare_commits(
        &self,
        repo: &str,
        before: &str,
        head: &str,
    ) -> Result<Vec<String>, FetchError> {
        let path = format!("/repos/{}/compare/{}...{}", repo, before, head);
        debug!(repo, before, head, "comparing commits");

        let response = self.get(&path).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let body: CompareResponse = serde_json::from_slice(&bytes)?;
        Ok(body.commits.into_iter().map(|c| c.commit.message).collect())
    }

    /// Runs a GraphQL query. Requires a token; the first GraphQL-level
    /// error aborts with its message.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, FetchError> {
        let token = self.token.as_ref().ok_or(FetchError::MissingToken)?;
        let url = format!("{}/graphql", self.base_url);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .bearer_auth(token)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let body: GraphqlResponse<T> = serde_json::from_slice(&bytes)?;
        if let Some(errors) = body.errors {
            if let Some(first) = errors.into_iter().next() {
                return Err(FetchError::GraphQl {
                    message: first.message,
                });
            }
        }

        body.data.ok_or(FetchError::GraphQl {
            message: "empty response".to_string(),
        })
    }
}
