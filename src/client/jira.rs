//! Jira client module
//!
//! Provides `JiraClient` for paging through the REST v2 search API.

use super::RetryPolicy;
use crate::error::FetchError;
use crate::etl::{Page, PageExtractor};
use eyre::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio_retry::RetryIf;
use url::Url;

/// Jira client for making search requests.
///
/// Every search is wrapped in the retry policy: timeouts, connection errors
/// and the statuses in [`crate::error::RETRYABLE_STATUSES`] are retried with
/// exponential backoff. Other statuses come back immediately as
/// [`FetchError::Rejected`].
///
/// # Example
/// ```no_run
/// use jira_harvest::client::{JiraClient, RetryPolicy};
/// use std::time::Duration;
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("https://issues.apache.org/jira/rest/api/2")?;
/// let client = JiraClient::try_new(url, Duration::from_secs(30), RetryPolicy::default())?;
///
/// let page = client.search(&JiraClient::project_jql("KAFKA"), 0, 50).await?;
/// println!("{} of {} issues", page.len(), page.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct JiraClient {
    client: Client,
    url: Url,
    retry: RetryPolicy,
}

impl JiraClient {
    /// Create a new JiraClient for the REST API rooted at `url`.
    ///
    /// # Arguments
    /// * `url` - REST API base, e.g. `https://host/jira/rest/api/2`
    /// * `timeout` - Per-request timeout
    /// * `retry` - Policy for transient failures
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or the URL cannot
    /// be a base
    pub fn try_new(mut url: Url, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        if url.cannot_be_a_base() {
            eyre::bail!("Jira URL cannot be used as a base: {}", url);
        }
        // Url::join replaces the last segment unless the path ends in a slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, "application/json".parse()?);
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url, retry })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// JQL selecting one project's issues, oldest first
    pub fn project_jql(project: &str) -> String {
        format!("project = {} ORDER BY created ASC", project)
    }

    /// Search issues, retrying transient failures per the retry policy.
    ///
    /// # Arguments
    /// * `jql` - Query
    /// * `start_at` - Offset of the first issue
    /// * `max_results` - Page size
    pub async fn search(
        &self,
        jql: &str,
        start_at: u64,
        max_results: u64,
    ) -> Result<Page, FetchError> {
        RetryIf::start(
            self.retry.delays(),
            || self.search_once(jql, start_at, max_results),
            |err: &FetchError| {
                let retry = err.is_retryable();
                if retry {
                    log::warn!("Search at startAt={} failed: {}", start_at, err);
                }
                retry
            },
        )
        .await
    }

    /// Send a single search request without retrying.
    async fn search_once(
        &self,
        jql: &str,
        start_at: u64,
        max_results: u64,
    ) -> Result<Page, FetchError> {
        let url = self
            .url
            .join("search")
            .map_err(|e| FetchError::Unexpected(format!("Invalid search URL: {}", e)))?;

        log::debug!(
            "GET {} jql='{}' startAt={} maxResults={}",
            url,
            jql,
            start_at,
            max_results
        );

        let query = [
            ("jql", jql.to_string()),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
            ("fields", "*all".to_string()),
        ];
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status, body));
        }

        response.json::<Page>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Transient(e.to_string())
            } else {
                FetchError::Unexpected(format!("Failed to parse search response: {}", e))
            }
        })
    }
}

impl PageExtractor for JiraClient {
    async fn extract_page(
        &self,
        collection: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Page, FetchError> {
        self.search(&Self::project_jql(collection), offset, limit)
            .await
    }
}

impl std::fmt::Display for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
