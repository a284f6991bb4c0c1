//! Remote service seam used by upload sessions

use crate::core::credentials::Credentials;
use crate::core::video_info::{UploadedVideo, VideoMetadata};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Progress sink handed to [`Transport::upload`], called with the fraction sent
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Short-lived authorization obtained by signing in
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Where and with what token the video bytes must be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub url: Url,
    pub token: String,
}

/// Errors raised by a transport, finer grained than session error kinds
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Bad credentials: {0}")]
    BadCredentials(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Check if the request never got a usable answer from the service
    pub fn is_connection(&self) -> bool {
        match self {
            TransportError::Http(e) => !e.is_status() && !e.is_decode(),
            TransportError::Io(_) => true,
            _ => false,
        }
    }

    /// Status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Remote video service.
///
/// Every call is a single attempt; sessions never retry. Dropping a returned
/// future must abort the underlying request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sign in and obtain an authorization token
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, TransportError>;

    /// Ask where a new video may be sent
    async fn request_upload_authorization(
        &self,
        token: &AuthToken,
    ) -> Result<UploadTarget, TransportError>;

    /// Send the file at `path` with `metadata`, reporting the fraction sent
    async fn upload(
        &self,
        target: &UploadTarget,
        path: &Path,
        metadata: &VideoMetadata,
        on_progress: ProgressFn,
    ) -> Result<UploadedVideo, TransportError>;

    /// Release anything held for the in-flight request.
    ///
    /// Called by a session on cancel, right before it drops the request future.
    fn abort(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_debug_is_redacted() {
        let token = AuthToken::new("secret-token");
        assert_eq!(token.as_str(), "secret-token");
        assert!(!format!("{:?}", token).contains("secret-token"));
    }

    #[test]
    fn test_transport_error_classification() {
        let refused = TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(refused.is_connection());
        assert_eq!(refused.status(), None);

        let status = TransportError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!status.is_connection());
        assert_eq!(status.status(), Some(500));

        assert!(!TransportError::BadCredentials("BadAuthentication".to_string()).is_connection());
    }
}
