//! 路由构建：上传接口、兜底 404、安全头与请求追踪。

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::Request;
use axum::routing::any;
use axum::{Router, middleware};
use axum_server::Handle;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span};

use crate::auth::AuthConfig;
use crate::config::UPLOAD_ROUTE;
use crate::error::ApiError;
use crate::http::{add_security_headers, request_client_ip};
use crate::storage::Storage;
use crate::upload::{UploadConfig, upload_files};

/// Builds the relay router. Every method is routed to the upload handler so
/// that it, not the router, decides the status for a wrong method.
pub fn build_router(
    storage: Arc<Storage>,
    auth: Arc<AuthConfig>,
    upload: Arc<UploadConfig>,
) -> Router {
    Router::new()
        .route(UPLOAD_ROUTE, any(upload_files))
        .fallback(not_found)
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = request_client_ip(request)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(storage))
        .layer(Extension(auth))
        .layer(Extension(upload))
}

/// 在 `addr` 上提供服务，直到 `shutdown` 完成后优雅退出。
///
/// Returns only after in-flight requests have drained or `grace` has elapsed.
pub async fn serve(
    addr: SocketAddr,
    app: Router,
    handle: Handle,
    grace: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    let watcher = handle.clone();
    tokio::spawn(async move {
        shutdown.await;
        info!("received termination signal, draining connections");
        watcher.graceful_shutdown(Some(grace));
    });

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

async fn not_found(req: Request<AxumBody>) -> ApiError {
    ApiError::NotFound(format!("no route for {}", req.uri().path()))
}
