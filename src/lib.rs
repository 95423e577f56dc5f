//! Asset Uploadr Library
//!
//! Chunked file upload client for remote media asset services.
//!
//! # Features
//!
//! - **Chunked Transfer**: Files are sent in fixed 5 MiB chunks, strictly in order
//! - **Integrity Checks**: SHA-256 per chunk and for the whole file
//! - **New Assets & Versions**: Commit as a new asset or a new version of an existing one
//! - **Structured Results**: Failures come back as a result payload, never a panic
//! - **Pluggable Transport**: Requests go through the `RequestSender` trait
//!
//! # Example
//!
//! ```no_run
//! use asset_uploadr::{client::HttpRequestSender, config::Config, upload::{AssetMetadata, Uploader}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let uploader = Uploader::new(HttpRequestSender::from_config(&config.api)?);
//!     let result = uploader
//!         .upload("photo.jpg", AssetMetadata::for_new_asset("brand-1"))
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod upload;

// Re-export commonly used types
pub use client::{HttpRequestSender, RequestSender};
pub use config::Config;
pub use upload::{AssetMetadata, UploadResult, Uploader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
