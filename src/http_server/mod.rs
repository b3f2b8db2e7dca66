//! # HTTP Server Module
//!
//! Axum server exposing bulk access as streamed zip downloads.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/pages?pageIDs=...&concat=...` - Pages of volumes
//! - `/volumes?volumeIDs=...&concat=...` - Whole volumes

pub mod access_routes;
pub mod config;
pub mod server;
mod sink;

pub use access_routes::{AccessSettings, AccessState, AdmissionMode, ArchiveRequest};
pub use config::HttpServerConfig;
pub use server::HttpServer;
pub use sink::ChannelWriter;
