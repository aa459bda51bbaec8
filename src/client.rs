//! 上传客户端：编码文件并一次性 POST 到中继服务。
//!
//! Success means the response body is byte-for-byte the server's OK status
//! payload. Anything else, including other well-formed status bodies, is an
//! error carrying the raw body.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_PUSH_TIMEOUT_SECS;
use crate::upload::{JSON_CONTENT_TYPE, UploadRecord};

pub const SUCCESS_BODY: &str = r#"{"code":200,"description":"OK"}"#;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 待上传的内存文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not create http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("could not marshal files: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not complete request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("could not read response: {0}")]
    ReadBody(#[source] reqwest::Error),
    #[error("unexpected response ({status}): {body}")]
    UnexpectedResponse { status: StatusCode, body: String },
}

/// 按输入顺序编码为 JSON 数组。
pub fn encode_batch(files: &[UploadFile]) -> Result<Vec<u8>, serde_json::Error> {
    let records: Vec<UploadRecord> = files
        .iter()
        .map(|file| UploadRecord::encode(file.name.as_str(), &file.data))
        .collect();
    serde_json::to_vec(&records)
}

/// Reusable uploader bound to one endpoint and token.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
    endpoint: String,
    token: String,
}

impl Uploader {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(
            endpoint,
            token,
            Duration::from_secs(DEFAULT_PUSH_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .user_agent(concat!("axo-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 发送一批文件。没有重试，也没有部分成功。
    pub async fn post(&self, files: &[UploadFile]) -> Result<(), ClientError> {
        let body = encode_batch(files)?;
        debug!(
            endpoint = %self.endpoint,
            files = files.len(),
            bytes = body.len(),
            "posting upload batch"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        let buf = response.bytes().await.map_err(ClientError::ReadBody)?;
        if buf.as_ref() != SUCCESS_BODY.as_bytes() {
            return Err(ClientError::UnexpectedResponse {
                status,
                body: String::from_utf8_lossy(&buf).into_owned(),
            });
        }
        Ok(())
    }
}

/// 一次性上传：构建默认客户端并发送。
pub async fn post(endpoint: &str, token: &str, files: &[UploadFile]) -> Result<(), ClientError> {
    Uploader::new(endpoint, token)?.post(files).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::post as post_route;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::net::TcpListener;

    use crate::app::build_router;
    use crate::auth::AuthConfig;
    use crate::config::UPLOAD_ROUTE;
    use crate::error::StatusBody;
    use crate::storage::Storage;
    use crate::upload::UploadConfig;

    const TOKEN: &str = "client-token";

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        addr
    }

    async fn spawn_relay() -> (tempfile::TempDir, Arc<Storage>, String) {
        let temp = tempdir().expect("tempdir");
        let storage = Arc::new(
            Storage::open(temp.path().join("root"))
                .await
                .expect("open storage"),
        );
        let router = build_router(
            storage.clone(),
            Arc::new(AuthConfig::new(TOKEN)),
            Arc::new(UploadConfig {
                max_body_size: 1024 * 1024,
            }),
        );
        let addr = serve(router).await;
        (temp, storage, format!("http://{addr}{UPLOAD_ROUTE}"))
    }

    #[test]
    fn success_body_matches_server_status_body() {
        let rendered =
            serde_json::to_string(&StatusBody::new(axum::http::StatusCode::OK)).expect("json");
        assert_eq!(rendered, SUCCESS_BODY);
    }

    #[test]
    fn encode_batch_preserves_order_and_uses_url_safe_base64() {
        let files = vec![
            UploadFile::new("z.bin", vec![0xfb, 0xff]),
            UploadFile::new("a.txt", "hi"),
        ];
        let encoded = encode_batch(&files).expect("encode");
        let records: Vec<UploadRecord> = serde_json::from_slice(&encoded).expect("decode");
        assert_eq!(records[0].name, "z.bin");
        assert_eq!(records[0].data, "-_8=");
        assert_eq!(records[1].name, "a.txt");
        assert_eq!(records[1].decode().expect("base64"), b"hi");
    }

    #[tokio::test]
    async fn post_uploads_files_to_relay() {
        let (_temp, storage, endpoint) = spawn_relay().await;
        let files = vec![
            UploadFile::new("one.txt", "first"),
            UploadFile::new("two.bin", vec![0u8, 1, 2, 254, 255]),
            UploadFile::new("empty", Vec::new()),
        ];

        post(&endpoint, TOKEN, &files).await.expect("post");

        let root = storage.root_path();
        assert_eq!(std::fs::read(root.join("one.txt")).unwrap(), b"first");
        assert_eq!(
            std::fs::read(root.join("two.bin")).unwrap(),
            vec![0u8, 1, 2, 254, 255]
        );
        assert_eq!(std::fs::read(root.join("empty")).unwrap(), b"");
    }

    #[tokio::test]
    async fn wrong_token_surfaces_raw_body() {
        let (_temp, storage, endpoint) = spawn_relay().await;

        let err = post(&endpoint, "nope", &[UploadFile::new("x.txt", "x")])
            .await
            .expect_err("should fail");

        match err {
            ClientError::UnexpectedResponse { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, r#"{"code":401,"description":"Unauthorized"}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!storage.root_path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn failed_batch_is_an_error_for_the_caller() {
        let (_temp, storage, endpoint) = spawn_relay().await;
        std::fs::create_dir(storage.root_path().join("dir")).unwrap();
        let uploader = Uploader::new(endpoint, TOKEN).expect("uploader");

        let err = uploader
            .post(&[UploadFile::new("ok.txt", "ok"), UploadFile::new("dir", "x")])
            .await
            .expect_err("should fail");

        assert!(matches!(
            err,
            ClientError::UnexpectedResponse { status, .. } if status == StatusCode::BAD_REQUEST
        ));
        // earlier record is not rolled back
        assert!(storage.root_path().join("ok.txt").exists());
    }

    #[tokio::test]
    async fn near_miss_success_body_is_rejected() {
        let router = Router::new().route(
            UPLOAD_ROUTE,
            post_route(|| async { r#"{"code": 200, "description": "OK"}"# }),
        );
        let addr = serve(router).await;

        let err = post(
            &format!("http://{addr}{UPLOAD_ROUTE}"),
            TOKEN,
            &[UploadFile::new("x", "x")],
        )
        .await
        .expect_err("should fail");

        assert!(matches!(
            err,
            ClientError::UnexpectedResponse { status, .. } if status == StatusCode::OK
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let err = post(
            &format!("http://{addr}{UPLOAD_ROUTE}"),
            TOKEN,
            &[UploadFile::new("x", "x")],
        )
        .await
        .expect_err("should fail");

        assert!(matches!(err, ClientError::Transport(_)));
    }
}
