//! AxoRelay server binary.
//!
//! Reads the token, root directory and listen address once at startup,
//! builds the upload router and serves it until Ctrl+C or SIGTERM.

use axum_server::Handle;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use axo_relay::app::{build_router, serve};
use axo_relay::auth::AuthConfig;
use axo_relay::config::{Args, SHUTDOWN_GRACE_SECS, UPLOAD_ROUTE, resolve_listen_addr};
use axo_relay::logging::{self, SERVER_DEFAULT_FILTER};
use axo_relay::storage::Storage;
use axo_relay::upload::UploadConfig;

/// Starts the relay server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging(SERVER_DEFAULT_FILTER);

    let args = Args::parse();
    if let Err(msg) = args.validate() {
        error!("init: {msg}");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg));
    }
    let listen_addr = resolve_listen_addr(&args.listen)
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

    let storage = Arc::new(Storage::open(&args.root).await.inspect_err(|err| {
        error!(root = %args.root, error = %err, "init: could not open root directory");
    })?);
    let auth = Arc::new(AuthConfig::new(&args.token));
    let upload = Arc::new(UploadConfig {
        max_body_size: args.max_body_size,
    });
    let root_display = storage.root_path().display().to_string();
    let app = build_router(storage, auth, upload);

    info!(
        "listening on {} in {} (route {})",
        listen_addr, root_display, UPLOAD_ROUTE
    );
    serve(
        listen_addr,
        app,
        Handle::new(),
        Duration::from_secs(SHUTDOWN_GRACE_SECS),
        shutdown_signal(),
    )
    .await
    .inspect_err(|err| error!(error = %err, "unexpected shutdown"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
