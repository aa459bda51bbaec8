//! 批量上传处理器：校验请求、逐条解析路径并写入文件。
//!
//! Records are processed strictly in order. The first failing record aborts
//! the batch; files written by earlier records stay on disk.

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::auth::AuthConfig;
use crate::error::{ApiError, status_response};
use crate::storage::Storage;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug)]
pub struct UploadConfig {
    pub max_body_size: usize,
}

/// 线上记录：`data` 为 URL 安全字母表、带填充的 base64。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadRecord {
    pub name: String,
    pub data: String,
}

impl UploadRecord {
    pub fn encode(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            data: URL_SAFE.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE.decode(&self.data)
    }
}

/// 上传入口。任何结果都以固定结构的状态 JSON 响应。
pub async fn upload_files(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(auth): Extension<Arc<AuthConfig>>,
    Extension(upload): Extension<Arc<UploadConfig>>,
    req: Request<AxumBody>,
) -> Response {
    match process_upload(&storage, &auth, &upload, req).await {
        Ok(count) => {
            info!(files = count, "upload batch complete");
            status_response(StatusCode::OK)
        }
        Err(err) => {
            if err.status().is_server_error() {
                error!(status = err.status().as_u16(), "{}", err.message());
            } else {
                warn!(status = err.status().as_u16(), "{}", err.message());
            }
            err.into_response()
        }
    }
}

async fn process_upload(
    storage: &Storage,
    auth: &AuthConfig,
    upload: &UploadConfig,
    req: Request<AxumBody>,
) -> Result<usize, ApiError> {
    if req.method() != Method::POST {
        return Err(ApiError::BadRequest(format!(
            "bad request: bad method {}",
            req.method()
        )));
    }
    if !auth.is_authorized(req.headers()) {
        return Err(ApiError::Unauthorized("bad authorization".into()));
    }
    if !is_json_request(req.headers()) {
        return Err(ApiError::BadRequest("bad request: bad content-type".into()));
    }

    let body = axum::body::to_bytes(req.into_body(), upload.max_body_size)
        .await
        .map_err(|err| ApiError::BadRequest(format!("could not read body: {err}")))?;
    let records: Vec<UploadRecord> = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("could not decode json: {err}")))?;

    for record in &records {
        write_record(storage, record)
            .await
            .map_err(|err| err.context(&record.name))?;
    }
    Ok(records.len())
}

fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes() == JSON_CONTENT_TYPE.as_bytes())
}

/// 写入单条记录，返回写入字节数。
///
/// 打开文件失败归为客户端错误；解码与写入失败发生在目标文件已被截断之后，
/// 归为服务端错误。
async fn write_record(storage: &Storage, record: &UploadRecord) -> Result<usize, ApiError> {
    let target = storage.resolve(&record.name).await?;

    if let Ok(metadata) = fs::metadata(&target).await
        && metadata.is_dir()
    {
        return Err(ApiError::BadRequest(
            "directory exists with same name".into(),
        ));
    }

    let mut file = File::create(&target).await.map_err(|err| {
        ApiError::BadRequest(format!("could not open file {}: {err}", target.display()))
    })?;

    let bytes = record.decode().map_err(|err| {
        ApiError::Internal(format!(
            "could not write file {}: could not decode as base64: {err}",
            target.display()
        ))
    })?;
    file.write_all(&bytes).await.map_err(|err| {
        ApiError::Internal(format!("could not write file {}: {err}", target.display()))
    })?;
    file.flush().await.map_err(|err| {
        ApiError::Internal(format!("could not write file {}: {err}", target.display()))
    })?;

    info!(path = %target.display(), bytes = bytes.len(), "transfer complete");
    Ok(bytes.len())
}
