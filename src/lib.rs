//! # rup - Rust Video Uploader
//!
//! Uploads local video files to a video hosting service.
//!
//! ## Features
//!
//! - One-operation-at-a-time upload session with observable state
//! - Sign-in with optional credential persistence
//! - Monotonic upload progress reporting
//! - Cancellation of sign-in and uploads in flight
//!
//! ## Example
//!
//! ```rust,no_run
//! use rup::{Endpoints, FileCredentialStore, HttpClientConfig, SessionConfig, UploadSession, VideoMetadata};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = UploadSession::with_http_transport(
//!         SessionConfig::new("DEVELOPER_KEY"),
//!         HttpClientConfig::default(),
//!         Endpoints::default(),
//!         Arc::new(FileCredentialStore::new("credentials.json")),
//!     )?;
//!
//!     session.login("me@example.com", "password").await?;
//!     let video = session
//!         .upload("holiday.mp4", VideoMetadata::new().with_title("Holiday"))
//!         .await?;
//!     println!("Uploaded: {}", video.url);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use core::{
    Completion, CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore,
    MetadataKey, SessionConfig, UploadSession, UploadedVideo, UploaderState, VideoMetadata,
};
pub use error::{ErrorKind, RupError};
pub use platform::{Endpoints, HttpClientConfig, HttpTransport, Transport};

/// Result type alias for rup operations
pub type Result<T> = std::result::Result<T, RupError>;
