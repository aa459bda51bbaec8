//! 统一的 API 错误类型与状态响应体。
//!
//! 每个响应（成功或失败）都是 `{"code":<int>,"description":<text>}`，
//! 错误细节只进入日志，不会写入响应体。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::storage::ResolveError;

/// Fixed-shape status body. Field order is part of the wire contract.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusBody {
    pub code: u16,
    pub description: &'static str,
}

impl StatusBody {
    pub fn new(status: StatusCode) -> Self {
        Self {
            code: status.as_u16(),
            description: status.canonical_reason().unwrap_or(""),
        }
    }
}

/// 以固定 JSON 结构响应给定状态码。
pub fn status_response(status: StatusCode) -> Response {
    (status, Json(StatusBody::new(status))).into_response()
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 为日志消息加上前缀（如记录名），状态码不变。
    pub fn context(self, prefix: &str) -> Self {
        match self {
            ApiError::BadRequest(msg) => ApiError::BadRequest(format!("{prefix}: {msg}")),
            ApiError::Unauthorized(msg) => ApiError::Unauthorized(format!("{prefix}: {msg}")),
            ApiError::NotFound(msg) => ApiError::NotFound(format!("{prefix}: {msg}")),
            ApiError::Internal(msg) => ApiError::Internal(format!("{prefix}: {msg}")),
        }
    }

    /// 仅用于日志的错误描述。
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        status_response(self.status())
    }
}

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        ApiError::BadRequest(format!("could not find file path: {error}"))
    }
}
