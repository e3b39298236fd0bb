// src/github/client.rs
// =============================================================================
// The remote access client. It makes exactly two kinds of request:
//
// - Tree listing:  GET {api_base}/repos/{repository}/git/trees/{branch}?recursive=1
// - Raw content:   GET {raw_base}/{repository}/refs/heads/{branch}/{path}
//
// Both carry `Authorization: token <PAT>` when a token is configured, and both
// go through one reqwest::Client whose certificate verification follows the
// configured TLS policy.
//
// The pipeline talks to the client through the RemoteSource trait so it can
// be driven by an in-memory source in tests.
// =============================================================================

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("error building HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),

    #[error("error fetching {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("error reading body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error decoding tree listing from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What a tree entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file
    Blob,
    /// A directory
    Tree,
    /// Anything else GitHub reports (e.g. "commit" for submodules)
    Other(String),
}

impl From<&str> for EntryKind {
    fn from(kind: &str) -> Self {
        match kind {
            "blob" => EntryKind::Blob,
            "tree" => EntryKind::Tree,
            other => EntryKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

// Shape of the Git Trees API body. Entries stay untyped so that one malformed
// entry is dropped instead of failing the whole listing.
#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<serde_json::Value>,
    #[serde(default)]
    truncated: bool,
}

fn entry_from_value(value: &serde_json::Value) -> Option<TreeEntry> {
    let path = value.get("path")?.as_str()?;
    let kind = value.get("type")?.as_str()?;
    Some(TreeEntry::new(path, EntryKind::from(kind)))
}

/// Everything the pipeline needs from the remote side.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn list_tree(&self, repository: &str, branch: &str)
        -> Result<Vec<TreeEntry>, RemoteError>;

    async fn get_file_content(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> Result<Vec<u8>, RemoteError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `false` turns certificate verification off (insecure, opt-in)
    pub verify_tls: bool,
    /// GitHub personal access token
    pub token: Option<String>,
    pub api_base: String,
    pub raw_base: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    config: ClientConfig,
}

impl GithubClient {
    pub fn new(config: ClientConfig) -> Result<Self, RemoteError> {
        // Insecure mode is opt-in and must never be silent
        if !config.verify_tls {
            warn!("TLS certificate verification is DISABLED; connections are not authenticated");
        }

        // One client for every request, so connections are pooled.
        // GitHub's API refuses requests without a User-Agent.
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(RemoteError::Client)?;

        Ok(Self { http, config })
    }

    // Branches like "release/1.0" are split on '/' here and in raw_url, so
    // both endpoints see the same path segments
    pub(crate) fn tree_url(&self, repository: &str, branch: &str) -> Result<Url, RemoteError> {
        let mut url = parse_base(&self.config.api_base)?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidEndpoint(self.config.api_base.clone()))?
            .pop_if_empty()
            .push("repos")
            .extend(repository.split('/'))
            .extend(["git", "trees"])
            .extend(branch.split('/'));
        // recursive=1 flattens the whole repository into one listing
        url.set_query(Some("recursive=1"));
        Ok(url)
    }

    pub(crate) fn raw_url(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> Result<Url, RemoteError> {
        let mut url = parse_base(&self.config.raw_base)?;
        // Each segment is percent-encoded on its own ("a b#1.md" -> "a%20b%231.md")
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidEndpoint(self.config.raw_base.clone()))?
            .pop_if_empty()
            .extend(repository.split('/'))
            .extend(["refs", "heads"])
            .extend(branch.split('/'))
            .extend(path.split('/'));
        Ok(url)
    }

    // Attaches the token header when one is configured
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }

    async fn send(
        &self,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, RemoteError> {
        // Transport failures (DNS, refused connection, bad certificate) end up here
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|source| RemoteError::Request {
                url: url.to_string(),
                source,
            })?;

        // Anything outside 2xx is an error for this one request only
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

fn parse_base(base: &str) -> Result<Url, RemoteError> {
    Url::parse(base).map_err(|_| RemoteError::InvalidEndpoint(base.to_string()))
}

#[async_trait]
impl RemoteSource for GithubClient {
    async fn list_tree(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, RemoteError> {
        let url = self.tree_url(repository, branch)?;
        // Ask for the v3 JSON media type explicitly
        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let body = self
            .send(&url, request)
            .await?
            .bytes()
            .await
            .map_err(|source| RemoteError::Body {
                url: url.to_string(),
                source,
            })?;

        // A body without a "tree" array is a hard error for the listing
        let listing: TreeResponse =
            serde_json::from_slice(&body).map_err(|source| RemoteError::Decode {
                url: url.to_string(),
                source,
            })?;

        if listing.truncated {
            warn!(url = %url, "tree listing is truncated by GitHub; some files will be missing");
        }

        // Malformed entries are dropped one by one
        let entries: Vec<TreeEntry> = listing.tree.iter().filter_map(entry_from_value).collect();
        let skipped = listing.tree.len() - entries.len();
        if skipped > 0 {
            debug!(skipped, "ignored tree entries without a usable path or type");
        }

        Ok(entries)
    }

    async fn get_file_content(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> Result<Vec<u8>, RemoteError> {
        let url = self.raw_url(repository, branch, path)?;
        let request = self.http.get(url.clone());

        // Raw content is the file itself: no JSON envelope, possibly binary
        let body = self
            .send(&url, request)
            .await?
            .bytes()
            .await
            .map_err(|source| RemoteError::Body {
                url: url.to_string(),
                source,
            })?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{generate_simple_self_signed, CertifiedKey};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_rustls::rustls::crypto::ring;
    use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use tokio_rustls::rustls::ServerConfig;
    use tokio_rustls::TlsAcceptor;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> GithubClient {
        GithubClient::new(ClientConfig {
            token: token.map(str::to_string),
            api_base: server.uri(),
            raw_base: server.uri(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_endpoints() {
        let client = GithubClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.tree_url("user/repo", "main").unwrap().as_str(),
            "https://api.github.com/repos/user/repo/git/trees/main?recursive=1"
        );
        assert_eq!(
            client.raw_url("user/repo", "main", "docs/guide.md").unwrap().as_str(),
            "https://raw.githubusercontent.com/user/repo/refs/heads/main/docs/guide.md"
        );
    }

    #[test]
    fn test_raw_url_escapes_file_names() {
        let client = GithubClient::new(ClientConfig::default()).unwrap();
        let url = client.raw_url("user/repo", "main", "docs/a b#1?.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/user/repo/refs/heads/main/docs/a%20b%231%3F.md"
        );
    }

    #[test]
    fn test_branch_with_slash_split_the_same_way() {
        let client = GithubClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.tree_url("user/repo", "release/1.0").unwrap().as_str(),
            "https://api.github.com/repos/user/repo/git/trees/release/1.0?recursive=1"
        );
        assert_eq!(
            client.raw_url("user/repo", "release/1.0", "a.txt").unwrap().as_str(),
            "https://raw.githubusercontent.com/user/repo/refs/heads/release/1.0/a.txt"
        );
    }

    // Serves every request with `body` over TLS, using a freshly generated
    // self-signed certificate no trust store knows about
    async fn spawn_self_signed_server(body: &'static str) -> String {
        let CertifiedKey { cert, key_pair } =
            generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .unwrap();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

        let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert.der().clone()], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // A client that rejects the certificate ends the handshake here
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };

                    // Read up to the end of the request headers
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match tls.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = tls.write_all(response.as_bytes()).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        format!("https://{}", addr)
    }

    fn tls_client(base: &str, verify_tls: bool) -> GithubClient {
        GithubClient::new(ClientConfig {
            verify_tls,
            token: None,
            api_base: base.to_string(),
            raw_base: base.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insecure_mode_accepts_self_signed_certificate() {
        let base = spawn_self_signed_server("served over tls").await;

        let content = tls_client(&base, false)
            .get_file_content("user/repo", "main", "a.txt")
            .await
            .unwrap();
        assert_eq!(content, b"served over tls");
    }

    #[tokio::test]
    async fn test_default_mode_rejects_self_signed_certificate() {
        let base = spawn_self_signed_server("never read").await;

        let result = tls_client(&base, true)
            .get_file_content("user/repo", "main", "a.txt")
            .await;
        assert!(
            matches!(result, Err(RemoteError::Request { .. })),
            "expected a transport error, got {:?}",
            result
        );
    }

    #[test]
    fn test_entry_kind_from_str() {
        assert_eq!(EntryKind::from("blob"), EntryKind::Blob);
        assert_eq!(EntryKind::from("tree"), EntryKind::Tree);
        assert_eq!(EntryKind::from("commit"), EntryKind::Other("commit".to_string()));
    }

    #[tokio::test]
    async fn test_list_tree_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/user/repo/git/trees/main"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": "abc",
                "tree": [
                    {"path": "a/x.go", "type": "blob", "mode": "100644"},
                    {"path": "a", "type": "tree"},
                    {"path": "vendor/lib", "type": "commit"},
                    {"type": "blob"},
                    {"path": 42, "type": "blob"}
                ],
                "truncated": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client_for(&server, None)
            .list_tree("user/repo", "main")
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![
                TreeEntry::new("a/x.go", EntryKind::Blob),
                TreeEntry::new("a", EntryKind::Tree),
                TreeEntry::new("vendor/lib", EntryKind::Other("commit".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_tree_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server, None).list_tree("user/repo", "nope").await;
        match result {
            Err(RemoteError::Status { status, url }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert!(url.contains("/git/trees/nope"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_tree_wrong_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"message\": \"hi\"}"))
            .mount(&server)
            .await;

        let result = client_for(&server, None).list_tree("user/repo", "main").await;
        assert!(matches!(result, Err(RemoteError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_token_header_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repo/refs/heads/main/README.md"))
            .and(header("authorization", "token secret123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"# hello".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let content = client_for(&server, Some("secret123"))
            .get_file_content("user/repo", "main", "README.md")
            .await
            .unwrap();
        assert_eq!(content, b"# hello");
    }

    #[tokio::test]
    async fn test_no_token_no_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 159, 146, 150]))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let content = client
            .get_file_content("user/repo", "main", "bin/data")
            .await
            .unwrap();
        assert_eq!(content, vec![0u8, 159, 146, 150]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_file_content_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server, None)
            .get_file_content("user/repo", "main", "a.txt")
            .await;
        assert!(matches!(result, Err(RemoteError::Status { .. })));
    }
}
