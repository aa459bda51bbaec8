//! 日志初始化：RUST_LOG 优先，否则使用调用方给出的默认级别。

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Server default: per-request spans and transfer lines are visible.
pub const SERVER_DEFAULT_FILTER: &str = "info,tower_http=debug";
/// Client default: only failures are printed.
pub const CLIENT_DEFAULT_FILTER: &str = "warn";

/// 初始化 tracing 订阅。`default_filter` 仅在 RUST_LOG 缺失或无效时生效。
pub fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
