//! AxoRelay: authenticated JSON file-upload relay.
//!
//! The server side accepts a batch of base64-encoded files over HTTP,
//! confines every target name to a root directory and writes the bytes to
//! disk. The client side packages in-memory buffers into that wire format
//! and validates the server's status reply.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod storage;
pub mod upload;

use shadow_rs::shadow;

shadow!(build);
