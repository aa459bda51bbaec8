//! CLI arguments and environment configuration for the relay and the push client.

use clap::Parser;
use shadow_rs::formatcp;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::lookup_host;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const UPLOAD_ROUTE: &str = "/api/1.0/upload";
pub const DEFAULT_ROOT: &str = ".";
pub const DEFAULT_LISTEN_ADDR: &str = ":80";
pub const DEFAULT_MAX_BODY_SIZE: usize = 256 * 1024 * 1024;
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 300;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// 服务端参数：令牌、根目录与监听地址，均可由环境变量提供。
#[derive(Parser, Debug)]
#[command(name = "axo-relay", version = VERSION_INFO, about = "AxoRelay upload server")]
pub struct Args {
    #[arg(long, env = "TOKEN", hide_env_values = true, help = "Bearer token clients must present")]
    pub token: String,
    #[arg(
        short = 'r',
        long,
        env = "ROOT",
        default_value = DEFAULT_ROOT,
        help = "Root directory that all uploads are confined to"
    )]
    pub root: String,
    #[arg(
        short = 'l',
        long,
        env = "LISTENADDR",
        default_value = DEFAULT_LISTEN_ADDR,
        help = "Listen address, `host:port` or `:port`"
    )]
    pub listen: String,
    #[arg(
        long,
        env = "RELAY_MAX_BODY_SIZE",
        default_value_t = DEFAULT_MAX_BODY_SIZE,
        help = "Max request body size in bytes"
    )]
    pub max_body_size: usize,
}

impl Args {
    /// 校验启动参数；空令牌视为未配置。
    pub fn validate(&self) -> Result<(), String> {
        if self.token.is_empty() {
            return Err("TOKEN must be set".into());
        }
        if self.max_body_size == 0 {
            return Err("max body size must be greater than zero".into());
        }
        Ok(())
    }
}

/// 客户端参数：把本地文件推送到中继服务。
#[derive(Parser, Debug)]
#[command(name = "relay-push", version = VERSION_INFO, about = "Push files to an AxoRelay server")]
pub struct PushArgs {
    #[arg(
        short = 'e',
        long,
        env = "RELAY_ENDPOINT",
        help = "Upload endpoint, e.g. http://host/api/1.0/upload"
    )]
    pub endpoint: String,
    #[arg(long, env = "TOKEN", hide_env_values = true, help = "Bearer token")]
    pub token: String,
    #[arg(
        long,
        default_value_t = DEFAULT_PUSH_TIMEOUT_SECS,
        help = "Whole-request timeout in seconds"
    )]
    pub timeout_secs: u64,
    #[arg(required = true, help = "Files to upload; each is sent under its file name")]
    pub files: Vec<String>,
}

/// 解析监听地址：`:port` 绑定所有 IPv4 接口，`host:port` 中的主机名经 DNS 解析，取第一个地址。
pub async fn resolve_listen_addr(value: &str) -> Result<SocketAddr, String> {
    let value = value.trim();
    if let Some(port) = value.strip_prefix(':') {
        let port = port
            .parse::<u16>()
            .map_err(|err| format!("invalid port {port:?}: {err}"))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    lookup_host(value)
        .await
        .map_err(|err| format!("invalid listen address {value:?}: {err}"))?
        .next()
        .ok_or_else(|| format!("listen address {value:?} did not resolve"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listen_addr_accepts_bare_port() {
        let addr = resolve_listen_addr(":8080").await.expect("parse");
        assert_eq!(addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn listen_addr_accepts_ip_and_port() {
        let addr = resolve_listen_addr("127.0.0.1:9000").await.expect("parse");
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn listen_addr_resolves_hostname() {
        let addr = resolve_listen_addr("localhost:8080").await.expect("resolve");
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn listen_addr_rejects_garbage() {
        assert!(resolve_listen_addr(":http").await.is_err());
        assert!(resolve_listen_addr("localhost").await.is_err());
        assert!(resolve_listen_addr("").await.is_err());
    }

    #[test]
    fn empty_token_fails_validation() {
        let args = Args::parse_from(["axo-relay", "--token", ""]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["axo-relay", "--token", "secret"]);
        assert!(args.validate().is_ok());
    }
}
