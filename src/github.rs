use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::process::Command;
use tracing::{debug, info};

use crate::apply::ContentFetcher;
use crate::changes::RawFileChange;
use crate::config::Config;

const USER_AGENT: &str = concat!("mirrorsync/", env!("CARGO_PKG_VERSION"));

/// Thin GitHub REST client: retrieves the compare metadata between two
/// revisions and the raw bytes behind content locators. Stateless besides
/// the connection pool; recovery from interrupted runs is re-running the
/// whole sync, not client-side retries.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

/// Compare API response, reduced to the part we consume.
#[derive(Debug, Deserialize)]
struct CompareResponse {
    files: Option<Vec<RawFileChange>>,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let token = detect_token();
        match &token {
            Some(_) => info!("Using authenticated GitHub requests"),
            None => debug!("No GitHub token found, using unauthenticated requests"),
        }

        Ok(Self {
            client,
            api_base: config.upstream.api_base.trim_end_matches('/').to_string(),
            owner: config.upstream.owner.clone(),
            repo: config.upstream.repo.clone(),
            token,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Fetch the per-file change records between two revisions.
    ///
    /// Failure here is fatal to a sync run: without the change-set there is
    /// nothing to apply.
    pub async fn compare(&self, from: &str, to: &str) -> Result<Vec<RawFileChange>> {
        let url = format!(
            "{}/repos/{}/{}/compare/{}...{}",
            self.api_base, self.owner, self.repo, from, to
        );
        info!("Fetching compare data from {}", url);

        let response = self
            .get(&url)
            .send()
            .await
            .context("Failed to reach the compare API")?;

        if !response.status().is_success() {
            bail!("Compare request failed with HTTP {}", response.status());
        }

        let compare: CompareResponse = response
            .json()
            .await
            .context("Failed to decode compare response")?;

        compare
            .files
            .ok_or_else(|| anyhow!("Unexpected compare response (missing 'files')"))
    }
}

#[async_trait]
impl ContentFetcher for GitHubClient {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}", locator);

        let response = self
            .get(locator)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", locator))?;

        if !response.status().is_success() {
            bail!(
                "Content fetch failed with HTTP {} for {}",
                response.status(),
                locator
            );
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {}", locator))?;

        Ok(bytes.to_vec())
    }
}

/// Token resolution mirrors the usual local setups: the GIT_TOKEN /
/// GITHUB_TOKEN environment variables first, then the GitHub CLI. A token
/// is optional; public repositories work unauthenticated at a lower rate
/// limit.
fn detect_token() -> Option<String> {
    for var in ["GIT_TOKEN", "GITHUB_TOKEN"] {
        if let Ok(token) = env::var(var) {
            if !token.is_empty() {
                debug!("Using token from {} environment variable", var);
                return Some(token);
            }
        }
    }
    gh_cli_token()
}

fn gh_cli_token() -> Option<String> {
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8(output.stdout).ok()?.trim().to_string();
    if token.is_empty() {
        None
    } else {
        debug!("Using token from GitHub CLI");
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GitHubClient {
        let mut config = Config::default();
        config.upstream.api_base = server.uri();
        GitHubClient::new(&config).expect("client should build")
    }

    #[tokio::test]
    async fn test_compare_parses_file_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/filebrowser/filebrowser/compare/v2.32.0...master"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ahead",
                "files": [
                    {"status": "added", "filename": "new.go", "raw_url": "https://raw.example/new.go"},
                    {"status": "renamed", "filename": "b.go", "previous_filename": "a.go",
                     "raw_url": "https://raw.example/b.go"},
                    {"status": "copied", "filename": "c.go", "raw_url": "https://raw.example/c.go"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let records = client.compare("v2.32.0", "master").await.unwrap();

        // The client returns raw records verbatim, including statuses the
        // classifier will later drop.
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, "added");
        assert_eq!(records[1].previous_filename.as_deref(), Some("a.go"));
        assert_eq!(records[2].status, "copied");
    }

    #[tokio::test]
    async fn test_compare_without_files_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.compare("v1", "v2").await;

        assert!(result.unwrap_err().to_string().contains("files"));
    }

    #[tokio::test]
    async fn test_compare_http_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.compare("v1", "v2").await;

        assert!(result.unwrap_err().to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw/main.go"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"package main\n".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let bytes = client
            .fetch(&format!("{}/raw/main.go", server.uri()))
            .await
            .unwrap();

        assert_eq!(bytes, b"package main\n");
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client
            .fetch(&format!("{}/raw/broken.go", server.uri()))
            .await;

        assert!(result.unwrap_err().to_string().contains("500"));
    }
}
