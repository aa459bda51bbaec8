//! relay-push: reads local files and uploads them to an AxoRelay server in
//! one batch. Each file is sent under its own file name.

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

use axo_relay::client::{UploadFile, Uploader};
use axo_relay::config::PushArgs;
use axo_relay::logging::{self, CLIENT_DEFAULT_FILTER};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging(CLIENT_DEFAULT_FILTER);
    let args = PushArgs::parse();

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let Some(name) = Path::new(path).file_name() else {
            error!(path, "not a file path");
            return ExitCode::FAILURE;
        };
        match tokio::fs::read(path).await {
            Ok(data) => files.push(UploadFile::new(name.to_string_lossy(), data)),
            Err(err) => {
                error!(path, error = %err, "could not read file");
                return ExitCode::FAILURE;
            }
        }
    }

    let uploader = match Uploader::with_timeout(
        &args.endpoint,
        &args.token,
        Duration::from_secs(args.timeout_secs),
    ) {
        Ok(uploader) => uploader,
        Err(err) => {
            error!(error = %err, "init failed");
            return ExitCode::FAILURE;
        }
    };

    match uploader.post(&files).await {
        Ok(()) => {
            println!("uploaded {} file(s) to {}", files.len(), uploader.endpoint());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "upload failed");
            ExitCode::FAILURE
        }
    }
}
