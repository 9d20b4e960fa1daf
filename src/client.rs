//! HTTP access to the Redmine REST API.
//!
//! The walker and boundary search only see the [`Probe`] and [`RedmineApi`]
//! traits, so tests can substitute an in-memory server.

use crate::error::SyncError;
use crate::metadata::{
    classify_issue_status, classify_probe_status, decode_issue, issue_url, IssueStatus,
};
use crate::types::{AttachmentRef, IssueFetch, ProbeOutcome, SyncConfig};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-Redmine-API-Key";

/// Existence test for a single issue id.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, issue_id: u64) -> Result<ProbeOutcome, SyncError>;
}

/// The requests a sync run makes.
#[async_trait]
pub trait RedmineApi: Probe {
    /// Fetches the attachment list of an issue.
    ///
    /// 403 and 404 come back as [`IssueFetch::Gap`]. Every other non-2xx
    /// status is an error.
    async fn issue_attachments(&self, issue_id: u64) -> Result<IssueFetch, SyncError>;

    /// Streams an attachment body into `dest` and returns the bytes written.
    ///
    /// Only HTTP 200 is accepted. `dest` is created or truncated.
    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
        dest: &Path,
    ) -> Result<u64, SyncError>;
}

/// [`RedmineApi`] over reqwest.
#[derive(Clone)]
pub struct RedmineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RedmineClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("redminesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SyncError::Transport {
                url: config.base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SyncError> {
        self.http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Probe for RedmineClient {
    async fn probe(&self, issue_id: u64) -> Result<ProbeOutcome, SyncError> {
        let url = issue_url(&self.base_url, issue_id, false);
        let response = self.get(&url).await?;
        let outcome = classify_probe_status(response.status().as_u16(), &url)?;
        debug!("probe {} -> {:?}", issue_id, outcome);
        Ok(outcome)
    }
}

#[async_trait]
impl RedmineApi for RedmineClient {
    async fn issue_attachments(&self, issue_id: u64) -> Result<IssueFetch, SyncError> {
        let url = issue_url(&self.base_url, issue_id, true);
        let response = self.get(&url).await?;
        let status = response.status().as_u16();

        match classify_issue_status(status) {
            IssueStatus::Gap => return Ok(IssueFetch::Gap { status }),
            IssueStatus::Fatal => return Err(SyncError::HttpStatus { status, url }),
            IssueStatus::Readable => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.clone(),
                source,
            })?;
        Ok(IssueFetch::Attachments(decode_issue(&url, issue_id, &body)?))
    }

    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
        dest: &Path,
    ) -> Result<u64, SyncError> {
        let url = attachment.content_url.as_str();
        let response = self.get(url).await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(SyncError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(SyncError::fs(dest))?;
        let mut file = BufWriter::new(file);

        let mut bytes_written = 0u64;
        let mut byte_stream = response.bytes_stream();
        while let Some(piece) = byte_stream.next().await {
            let chunk = piece.map_err(|source| SyncError::Transport {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(SyncError::fs(dest))?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.map_err(SyncError::fs(dest))?;

        Ok(bytes_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{fetch_and_store, StoreOutcome};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_client_keeps_normalised_base_url() {
        let config = SyncConfig::new("https://r.example/", "k", "/tmp/x");
        let client = RedmineClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://r.example");
        assert_eq!(client.api_key, "k");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let config = SyncConfig::new("http://127.0.0.1:1", "k", "/tmp/x");
        let client = RedmineClient::new(&config).unwrap();
        let err = client.probe(1).await.unwrap_err();
        match err {
            SyncError::Transport { url, .. } => {
                assert_eq!(url, "http://127.0.0.1:1/issues/1.json")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Answers one connection per canned response and hands back the raw
    /// request heads in order.
    async fn serve(responses: Vec<String>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }
                requests.push(String::from_utf8_lossy(&head).into_owned());
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });
        (base, handle)
    }

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn has_api_key(request: &str) -> bool {
        request
            .to_ascii_lowercase()
            .contains("\r\nx-redmine-api-key: secret\r\n")
    }

    #[tokio::test]
    async fn test_issue_request_sends_key_and_include_directive() {
        let body = r#"{"issue":{"id":7,"attachments":[{"id":3,"filename":"a.pdf","filesize":3,"content_url":"http://h/attachments/download/3/a.pdf"}]}}"#;
        let (base, server) = serve(vec![response("200 OK", body)]).await;
        let config = SyncConfig::new(base.as_str(), "SECRET", "/tmp/x");
        let client = RedmineClient::new(&config).unwrap();

        let fetch = client.issue_attachments(7).await.unwrap();

        match fetch {
            IssueFetch::Attachments(attachments) => {
                assert_eq!(attachments.len(), 1);
                assert_eq!(attachments[0].issue_id, 7);
                assert_eq!(attachments[0].id, 3);
            }
            other => panic!("unexpected fetch: {other:?}"),
        }
        let requests = server.await.unwrap();
        assert!(requests[0]
            .starts_with("GET /issues/7.json?include=attachments HTTP/1.1\r\n"));
        assert!(has_api_key(&requests[0]));
    }

    #[tokio::test]
    async fn test_issue_and_existence_status_mapping() {
        let (base, server) = serve(vec![
            response("403 Forbidden", ""),
            response("403 Forbidden", ""),
            response("404 Not Found", ""),
            response("500 Internal Server Error", ""),
        ])
        .await;
        let config = SyncConfig::new(base.as_str(), "SECRET", "/tmp/x");
        let client = RedmineClient::new(&config).unwrap();

        assert_eq!(
            client.issue_attachments(7).await.unwrap(),
            IssueFetch::Gap { status: 403 }
        );
        assert_eq!(client.probe(7).await.unwrap(), ProbeOutcome::Exists);
        assert_eq!(client.probe(8).await.unwrap(), ProbeOutcome::NotFound);
        let err = client.issue_attachments(9).await.unwrap_err();
        assert!(matches!(err, SyncError::HttpStatus { status: 500, .. }));

        let requests = server.await.unwrap();
        assert!(requests[1].starts_with("GET /issues/7.json HTTP/1.1\r\n"));
        assert!(requests.iter().all(|r| has_api_key(r)));
    }

    #[tokio::test]
    async fn test_attachment_body_requires_200() {
        let (base, server) = serve(vec![
            response("200 OK", "abc"),
            response("206 Partial Content", "abc"),
        ])
        .await;
        let config = SyncConfig::new(base.as_str(), "SECRET", "/tmp/x");
        let client = RedmineClient::new(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let attachment = |name: &str| AttachmentRef {
            issue_id: 7,
            id: 3,
            content_url: format!("{}/attachments/download/3/{}", base, name),
            filesize: 3,
            filename: name.to_string(),
        };

        let full = dir.path().join("7/attachments/download/3/a.pdf");
        let outcome = fetch_and_store(&client, &attachment("a.pdf"), &full)
            .await
            .unwrap();
        assert_eq!(outcome, StoreOutcome::Downloaded(3));
        assert_eq!(std::fs::read(&full).unwrap(), b"abc");

        let partial = dir.path().join("7/attachments/download/3/b.pdf");
        let err = fetch_and_store(&client, &attachment("b.pdf"), &partial)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::HttpStatus { status: 206, .. }));
        assert!(!partial.exists());

        let leftovers: Vec<_> = std::fs::read_dir(full.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("a.pdf")]);

        let requests = server.await.unwrap();
        assert!(requests[0]
            .starts_with("GET /attachments/download/3/a.pdf HTTP/1.1\r\n"));
        assert!(requests.iter().all(|r| has_api_key(r)));
    }
}
