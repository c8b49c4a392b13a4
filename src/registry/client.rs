//! HTTP client for the Modrinth v2 API

use super::types::{
    HashLookup, ProjectFileSet, ProjectFiles, SearchHit, SearchResponse, VersionRecord,
};
use super::{Registry, USER_AGENT};
use crate::config::RegistryConfig;
use crate::sync::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Build the shared HTTP client. `timeout` bounds the whole request,
/// including the body, so it is left unset for file transfers.
pub fn build_http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}

/// Modrinth registry client
#[derive(Clone)]
pub struct RegistryClient {
    client: Arc<reqwest::Client>,
    base: Url,
}

impl RegistryClient {
    /// Create a new client from registry settings
    pub fn new(config: &RegistryConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let base = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid registry URL '{}'", config.base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Registry URL '{}' cannot be used as a base", config.base_url);
        }

        let client =
            build_http_client(Some(config.timeout())).context("Failed to create HTTP client")?;

        Ok(Self {
            client: Arc::new(client),
            base,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> SyncResult<T> {
        let unavailable = |reason: String| SyncError::RegistryUnavailable {
            endpoint: endpoint.to_string(),
            reason,
        };

        let response = request.send().await.map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}: {}", status, body.trim())));
        }

        tracing::trace!("{} -> {} bytes", endpoint, body.len());

        serde_json::from_str(&body).map_err(|source| SyncError::RegistryFormat {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn lookup(
        &self,
        segments: &[&str],
        lookup: &HashLookup,
    ) -> SyncResult<Vec<ProjectFiles>> {
        let url = self.endpoint(segments);
        let endpoint = segments.join("/");

        tracing::debug!(
            "POST {} with {} {} hash(es)",
            endpoint,
            lookup.hashes.len(),
            lookup.algorithm
        );

        // Keyed by the hash that was sent
        let by_hash: HashMap<String, ProjectFiles> = self
            .fetch(self.client.post(url).json(lookup), &endpoint)
            .await?;

        Ok(by_hash.into_values().collect())
    }
}

#[async_trait]
impl Registry for RegistryClient {
    async fn project_versions(&self, project: &str) -> SyncResult<Vec<VersionRecord>> {
        let url = self.endpoint(&["project", project, "version"]);
        tracing::debug!("GET {}", url);
        self.fetch(self.client.get(url), "project/version").await
    }

    async fn search(&self, query: &str, limit: u32) -> SyncResult<Vec<SearchHit>> {
        let mut url = self.endpoint(&["search"]);
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string());
        tracing::debug!("GET {}", url);

        let response: SearchResponse = self.fetch(self.client.get(url), "search").await?;
        Ok(response.hits)
    }

    async fn version_files(&self, lookup: &HashLookup) -> SyncResult<ProjectFileSet> {
        let records = self.lookup(&["version_files"], lookup).await?;
        Ok(ProjectFileSet::installed(records))
    }

    async fn version_files_update(&self, lookup: &HashLookup) -> SyncResult<ProjectFileSet> {
        let records = self.lookup(&["version_files", "update"], lookup).await?;
        Ok(ProjectFileSet::latest(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RegistryClient {
        RegistryClient::new(&RegistryConfig {
            base_url: base.to_string(),
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_join_onto_base_path() {
        let c = client("https://api.modrinth.com/v2/");
        assert_eq!(
            c.endpoint(&["project", "sodium", "version"]).as_str(),
            "https://api.modrinth.com/v2/project/sodium/version"
        );
        assert_eq!(
            c.endpoint(&["version_files", "update"]).as_str(),
            "https://api.modrinth.com/v2/version_files/update"
        );
    }

    #[test]
    fn base_without_trailing_slash_is_accepted() {
        let c = client("https://example.org/api");
        assert_eq!(
            c.endpoint(&["search"]).as_str(),
            "https://example.org/api/search"
        );
    }

    #[test]
    fn project_ids_are_percent_encoded() {
        let c = client("https://api.modrinth.com/v2/");
        assert_eq!(
            c.endpoint(&["project", "a/b", "version"]).as_str(),
            "https://api.modrinth.com/v2/project/a%2Fb/version"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = RegistryClient::new(&RegistryConfig {
            base_url: "not a url".to_string(),
            ..RegistryConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("gorium/"));
    }
}
