use crate::config::ServerConfig;
use crate::errors::{Result, AlphaMatrixError};
use crate::util;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::{Duration, SystemTime};

const GITHUB_API: &str = "https://api.github.com";

/// A file read back from the store
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub body: String,
    pub last_modified: Option<SystemTime>,
}

/// GitHub repository used as the shared file store for the data pack.
///
/// Reads go through the raw-content host (with mirrors tried in order);
/// writes go through the contents API and need a token.
pub struct GithubStore {
    client: Client,
    raw_base_urls: Vec<String>,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
}

impl GithubStore {
    pub fn new(raw_base_urls: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("alpha_matrix/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AlphaMatrixError::RequestError)?;

        Ok(Self {
            client,
            raw_base_urls,
            api_base: GITHUB_API.to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Ok(Self::new(config.raw_base_urls())?
            .with_repository(&config.github_user, &config.repo_name, &config.branch)
            .with_token(config.github_token.clone()))
    }

    pub fn with_repository(mut self, owner: &str, repo: &str, branch: &str) -> Self {
        self.owner = owner.to_string();
        self.repo = repo.to_string();
        self.branch = branch.to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn can_write(&self) -> bool {
        self.token.is_some() && !self.owner.is_empty() && !self.repo.is_empty()
    }

    /// Downloads a file, trying each raw base URL until one answers 200.
    pub async fn fetch_text(&self, file: &str) -> Result<RemoteFile> {
        let mut last_error = None;

        for base in &self.raw_base_urls {
            let url = format!("{}/{}", base, file);
            debug!("Fetching {}", url);

            let resp = match self.client.get(&url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Fetching {} failed: {}", url, e);
                    last_error = Some(AlphaMatrixError::RequestError(e));
                    continue;
                }
            };

            if !resp.status().is_success() {
                last_error = Some(AlphaMatrixError::StoreError(format!(
                    "{}: HTTP status {}", url, resp.status()
                )));
                continue;
            }

            let last_modified = resp.headers()
                .get(reqwest::header::LAST_MODIFIED)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| httpdate::parse_http_date(v).ok());

            let body = resp.text().await?;
            return Ok(RemoteFile {
                body: util::strip_bom(&body).to_string(),
                last_modified,
            });
        }

        Err(last_error.unwrap_or_else(|| AlphaMatrixError::StoreError(format!("No store URL for {}", file))))
    }

    /// CSV file as JSON records; any failure yields an empty list.
    pub async fn fetch_csv_records(&self, file: &str) -> Vec<Map<String, Value>> {
        match self.fetch_text(file).await {
            Ok(remote) => util::csv_to_records(&remote.body).unwrap_or_else(|e| {
                warn!("{} is not valid CSV: {}", file, e);
                Vec::new()
            }),
            Err(e) => {
                warn!("Could not load {}: {}", file, e);
                Vec::new()
            }
        }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let remote = self.fetch_text(file).await?;
        Ok(serde_json::from_str(&remote.body)?)
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/contents/{}", self.api_base, self.owner, self.repo, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn existing_sha(&self, path: &str) -> Result<Option<String>> {
        let resp = self.authorized(self.client.get(self.contents_url(path)))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AlphaMatrixError::StoreError(format!(
                "Looking up {} failed: HTTP status {}", path, resp.status()
            )));
        }

        let json: Value = resp.json().await?;
        Ok(json.get("sha").and_then(|s| s.as_str()).map(|s| s.to_string()))
    }

    /// Creates or replaces `path` on the store branch with a single commit.
    pub async fn put_file(&self, path: &str, content: &[u8], message: &str) -> Result<()> {
        if !self.can_write() {
            return Err(AlphaMatrixError::StoreError("GitHub token and repository are required for uploads".to_string()));
        }

        let sha = self.existing_sha(path).await?;

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha);
        }

        let resp = self.authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(AlphaMatrixError::StoreError(format!(
                "Uploading {} failed: HTTP status {} {}", path, status, detail
            )));
        }

        info!("Uploaded {} ({} bytes) to {}/{}", path, content.len(), self.owner, self.repo);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn falls_back_to_mirror() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/primary/CSV_E.csv").with_status(404).create_async().await;
        server.mock("GET", "/mirror/CSV_E.csv")
            .with_header("last-modified", "Tue, 02 Jan 2024 09:00:00 GMT")
            .with_body("\u{feff}metric,2024-01-02\nMarket_ADR,85.5\n")
            .create_async()
            .await;

        let store = GithubStore::new(vec![
            format!("{}/primary", server.url()),
            format!("{}/mirror", server.url()),
        ])
        .unwrap();

        let remote = store.fetch_text("CSV_E.csv").await.unwrap();
        assert!(remote.body.starts_with("metric"));
        assert!(remote.last_modified.is_some());

        let records = store.fetch_csv_records("CSV_E.csv").await;
        assert_eq!(records[0]["metric"], Value::from("Market_ADR"));
    }

    #[tokio::test]
    async fn missing_csv_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/CSV_C.csv").with_status(404).create_async().await;

        let store = GithubStore::new(vec![server.url()]).unwrap();
        assert!(store.fetch_csv_records("CSV_C.csv").await.is_empty());
        assert!(store.fetch_text("CSV_C.csv").await.is_err());
    }

    #[tokio::test]
    async fn put_file_sends_sha_of_existing_file() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/repos/octo/etf/contents/portfolio.json")
            .match_query(Matcher::UrlEncoded("ref".to_string(), "main".to_string()))
            .with_body(r#"{"sha":"abc123"}"#)
            .create_async()
            .await;
        let put = server.mock("PUT", "/repos/octo/etf/contents/portfolio.json")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "sha": "abc123",
                "content": STANDARD.encode(b"{}"),
                "branch": "main"
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = GithubStore::new(vec![server.url()])
            .unwrap()
            .with_repository("octo", "etf", "main")
            .with_api_base(&server.url())
            .with_token(Some("secret".to_string()));

        store.put_file("portfolio.json", b"{}", "Update portfolio").await.unwrap();
        put.assert_async().await;
    }

    #[tokio::test]
    async fn put_file_without_token_is_refused() {
        let store = GithubStore::new(vec![]).unwrap().with_repository("octo", "etf", "main");
        assert!(!store.can_write());
        assert!(store.put_file("a.csv", b"x", "msg").await.is_err());
    }
}
