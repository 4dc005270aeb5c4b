use async_trait::async_trait;
use cardscan_store::{BlobStore, Revision, StoreError, StoredBlob};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::GitHubConfig;

const API_VERSION: &str = "2022-11-28";

/// GitHub repository contents API client.
///
/// Files are read with `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`
/// and written with `PUT` on the same path. The file's blob SHA serves as the
/// revision.
pub struct GitHubContentsClient {
    http_client: HttpClient,
    config: GitHubConfig,
}

/// Body of a contents GET for a single file.
#[derive(Deserialize)]
struct FileContent {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutFileRequest<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutFileResponse {
    content: PutFileContent,
}

#[derive(Deserialize)]
struct PutFileContent {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubErrorBody {
    message: String,
}

impl GitHubContentsClient {
    /// Create a new contents client.
    pub fn new(config: GitHubConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http_client = HttpClient::builder()
            .user_agent(concat!("cardscan/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// URL of a file in the contents API. Each path segment is encoded on its
    /// own so the separators survive.
    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encoded_path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET a file's metadata and inline content. A missing file, or a client
    /// without a repository, yields `None`.
    async fn get_file(&self, path: &str) -> Result<Option<FileContent>, StoreError> {
        let Some((owner, repo)) = self.config.repository() else {
            debug!("Repository not configured, treating {} as absent", path);
            return Ok(None);
        };

        let url = format!(
            "{}?ref={}",
            self.contents_url(owner, repo, path),
            urlencoding::encode(&self.config.branch)
        );

        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("GitHub GET request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GitHub file not found: {}", path);
            return Ok(None);
        }

        if !status.is_success() {
            let err = Self::remote_error(response).await;
            warn!("Error fetching {}: {}", path, err);
            return Err(err);
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| StoreError::Transport(format!("Failed to parse GitHub response: {}", e)))
    }

    /// Turn a non-success response into `StoreError::Remote`, preferring the
    /// API's own `message` field.
    async fn remote_error(response: Response) -> StoreError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GitHubErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        StoreError::Remote {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl BlobStore for GitHubContentsClient {
    fn backend_name(&self) -> &'static str {
        "github"
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if !self.config.has_token() {
            return Err(StoreError::Configuration("GitHub token not configured".to_string()));
        }
        if self.config.repository().is_none() {
            return Err(StoreError::Configuration("GitHub repository not configured".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>, StoreError> {
        let Some(file) = self.get_file(path).await? else {
            return Ok(None);
        };

        let content = match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) => content,
            (encoding, _) => {
                return Err(StoreError::Codec(format!(
                    "{} has unsupported content encoding '{}'",
                    path,
                    encoding.unwrap_or("none")
                )));
            }
        };

        debug!("GitHub GET {} ({} bytes) at {}", path, content.len(), file.sha);
        Ok(Some(StoredBlob {
            content: content.into_bytes(),
            revision: Revision::new(file.sha),
        }))
    }

    /// Reads only the blob SHA, so files served without inline content
    /// (over 1 MB) can still be overwritten.
    #[instrument(skip(self), level = "debug")]
    async fn revision(&self, path: &str) -> Result<Option<Revision>, StoreError> {
        let file = self.get_file(path).await?;
        Ok(file.map(|file| Revision::new(file.sha)))
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        revision: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        self.ensure_writable()?;
        let (owner, repo) = self.config.repository().ok_or_else(|| {
            StoreError::Configuration("GitHub repository not configured".to_string())
        })?;

        let content = std::str::from_utf8(content)
            .map_err(|e| StoreError::Codec(format!("Encoded content is not UTF-8: {}", e)))?;

        let body = PutFileRequest {
            message,
            content,
            branch: &self.config.branch,
            sha: revision.map(Revision::as_str),
        };

        let response = self
            .authorize(self.http_client.put(self.contents_url(owner, repo, path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("GitHub PUT request failed: {}", e)))?;

        if !response.status().is_success() {
            let err = Self::remote_error(response).await;
            warn!("Error saving {}: {}", path, err);
            return Err(err);
        }

        let saved: PutFileResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to parse GitHub response: {}", e)))?;

        debug!("GitHub PUT {} -> {}", path, saved.content.sha);
        Ok(Revision::new(saved.content.sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use cardscan_store::{DocumentStore, RecordStore, ScanRecord};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FILE_PATH: &str = "/repos/acme/cards/contents/data/scans.json";

    fn config_for(server: &MockServer, token: Option<&str>) -> GitHubConfig {
        GitHubConfig {
            owner: Some("acme".to_string()),
            repo: Some("cards".to_string()),
            branch: "data".to_string(),
            token: token.map(str::to_string),
            api_url: server.uri(),
            ..Default::default()
        }
    }

    fn client(server: &MockServer, token: Option<&str>) -> GitHubContentsClient {
        GitHubContentsClient::new(config_for(server, token)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_content_and_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .and(query_param("ref", "data"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "encoding": "base64",
                "sha": "sha123",
                "content": "W3siY2FyZElk\nIjoiQTEifV0=\n",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let blob = client(&server, Some("ghp_test"))
            .fetch("data/scans.json")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(blob.revision, Revision::from("sha123"));
        let decoded: serde_json::Value = cardscan_store::codec::decode(&blob.content).unwrap();
        assert_eq!(decoded, json!([{"cardId": "A1"}]));
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
            )
            .mount(&server)
            .await;

        let result = client(&server, Some("ghp_test"))
            .fetch("data/scans.json")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, Some("ghp_bad"))
            .fetch("data/scans.json")
            .await
            .unwrap_err();

        match err {
            StoreError::Remote { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_large_file_is_codec_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "encoding": "none",
                "sha": "big",
                "content": "",
            })))
            .mount(&server)
            .await;

        let err = client(&server, Some("ghp_test"))
            .fetch("data/scans.json")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[tokio::test]
    async fn test_fetch_without_repository_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = GitHubConfig {
            api_url: server.uri(),
            ..Default::default()
        };
        let client = GitHubContentsClient::new(config).unwrap();
        assert!(client.fetch("data/scans.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_sends_sha_and_branch() {
        let server = MockServer::start().await;
        let encoded = BASE64.encode("[]");
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .and(header("authorization", "Bearer ghp_test"))
            .and(body_partial_json(json!({
                "message": "Update scans - 2026-10-15T08:30:00.000Z",
                "content": encoded,
                "branch": "data",
                "sha": "sha123",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": {"sha": "sha456", "path": "data/scans.json"},
                "commit": {"sha": "c0ffee"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let revision = client(&server, Some("ghp_test"))
            .write(
                "data/scans.json",
                encoded.as_bytes(),
                "Update scans - 2026-10-15T08:30:00.000Z",
                Some(&Revision::from("sha123")),
            )
            .await
            .unwrap();
        assert_eq!(revision, Revision::from("sha456"));
    }

    #[tokio::test]
    async fn test_create_omits_sha() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": {"sha": "fresh"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let revision = client(&server, Some("ghp_test"))
            .write("data/scans.json", b"W10=", "Add scan: A1", None)
            .await
            .unwrap();
        assert_eq!(revision, Revision::from("fresh"));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("sha").is_none());
    }

    #[tokio::test]
    async fn test_write_conflict_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "data/scans.json does not match sha123",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Some("ghp_test"))
            .write("data/scans.json", b"W10=", "Add scan: A1", Some(&Revision::from("sha123")))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("does not match"));
    }

    #[tokio::test]
    async fn test_write_without_token_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server, None);
        assert!(client.ensure_writable().is_err());

        let err = client
            .write("data/scans.json", b"W10=", "Add scan: A1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    fn record_store(server: &MockServer) -> RecordStore {
        RecordStore::new(DocumentStore::new(Arc::new(client(server, Some("ghp_test")))))
    }

    #[tokio::test]
    async fn test_revision_ignores_large_file_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "encoding": "none",
                "sha": "bigsha",
                "content": "",
            })))
            .mount(&server)
            .await;

        let revision = client(&server, Some("ghp_test"))
            .revision("data/scans.json")
            .await
            .unwrap();
        assert_eq!(revision, Some(Revision::from("bigsha")));
    }

    #[tokio::test]
    async fn test_replace_overwrites_file_too_large_to_inline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "encoding": "none",
                "sha": "bigsha",
                "content": "",
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .and(body_partial_json(json!({"sha": "bigsha", "branch": "data"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": {"sha": "smallsha"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        record_store(&server)
            .replace_scans(vec![ScanRecord(json!({"cardId": "A1"}))])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_scan_aborts_on_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"message": "Server Error"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = record_store(&server)
            .add_scan(ScanRecord(json!({"cardId": "A1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Remote { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_add_scan_keeps_large_file_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "encoding": "none",
                "sha": "bigsha",
                "content": "",
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = record_store(&server)
            .add_scan(ScanRecord(json!({"cardId": "A1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let config = GitHubConfig {
            api_url: "https://api.github.com/".to_string(),
            ..Default::default()
        };
        let client = GitHubContentsClient::new(config).unwrap();
        assert_eq!(
            client.contents_url("acme", "cards", "data/my scans.json"),
            "https://api.github.com/repos/acme/cards/contents/data/my%20scans.json"
        );
    }
}
