//! Bearer 令牌认证。

use axum::http::{HeaderMap, header};

#[derive(Debug)]
pub struct AuthConfig {
    expected_header: String,
}

impl AuthConfig {
    pub fn new(token: &str) -> Self {
        Self {
            expected_header: format!("Bearer {token}"),
        }
    }

    /// 校验 `Authorization` 头：与 `Bearer <token>` 逐字节相等，不做大小写或空白处理。
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .is_some_and(|value| value.as_bytes() == self.expected_header.as_bytes())
    }
}
