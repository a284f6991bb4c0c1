//! HTTP transport for the video platform: sign-in, upload token, browser-style upload

use crate::core::credentials::Credentials;
use crate::core::progress::Progress;
use crate::core::video_info::{MetadataKey, UploadedVideo, VideoMetadata};
use crate::platform::client::{ApiClient, HttpClientConfig};
use crate::platform::transport::{
    AuthToken, ProgressFn, Transport, TransportError, UploadTarget,
};
use crate::utils::{mime_from_path, parse_upload_redirect, title_from_path, truncate_title, watch_url};
use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;

/// Category used when the caller does not pick one
pub const DEFAULT_CATEGORY: &str = "People";

/// Sign-in error codes that mean the account itself was refused
const CREDENTIAL_ERRORS: &[&str] = &[
    "BadAuthentication",
    "NotVerified",
    "TermsNotAgreed",
    "AccountDeleted",
    "AccountDisabled",
];

/// Service endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Account sign-in form
    pub login_url: String,
    /// Upload token request
    pub upload_token_url: String,
    /// Where the service redirects after an upload
    pub next_url: String,
    /// Base of public watch links
    pub watch_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: "https://www.google.com/accounts/ClientLogin".to_string(),
            upload_token_url: "https://gdata.youtube.com/action/GetUploadToken".to_string(),
            next_url: "https://www.youtube.com/upload_done".to_string(),
            watch_url: "https://www.youtube.com/watch".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service endpoint at `base`, keeping the public watch links
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            login_url: format!("{}/accounts/ClientLogin", base),
            upload_token_url: format!("{}/action/GetUploadToken", base),
            next_url: format!("{}/upload_done", base),
            ..Self::default()
        }
    }
}

/// [`Transport`] over the platform's HTTP API
pub struct HttpTransport {
    api: ApiClient,
    endpoints: Endpoints,
    url_regex: Regex,
    token_regex: Regex,
}

impl HttpTransport {
    /// Create a transport with default configuration and endpoints
    pub fn new(developer_key: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_config(developer_key, HttpClientConfig::default(), Endpoints::default())
    }

    pub fn with_config(
        developer_key: impl Into<String>,
        config: HttpClientConfig,
        endpoints: Endpoints,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            api: ApiClient::with_config(developer_key, config)?,
            endpoints,
            url_regex: Regex::new(r"<url>\s*([^<]+?)\s*</url>").expect("static regex"),
            token_regex: Regex::new(r"<token>\s*([^<]+?)\s*</token>").expect("static regex"),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Parse the `key=value` lines of a sign-in answer
    fn parse_login_body(body: &str, key: &str) -> Option<String> {
        body.lines().find_map(|line| {
            let (k, v) = line.trim().split_once('=')?;
            (k == key && !v.is_empty()).then(|| v.to_string())
        })
    }

    /// Parse `<response><url>..</url><token>..</token></response>`
    fn parse_upload_target(&self, body: &str) -> Result<UploadTarget, TransportError> {
        let url = self
            .url_regex
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str()))
            .ok_or_else(|| TransportError::MalformedResponse("missing upload url".to_string()))?;
        let token = self
            .token_regex
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str()))
            .ok_or_else(|| TransportError::MalformedResponse("missing upload token".to_string()))?;

        let url = Url::parse(&url)
            .map_err(|e| TransportError::MalformedResponse(format!("bad upload url: {}", e)))?;
        Ok(UploadTarget { url, token })
    }

    fn build_form(
        &self,
        target: &UploadTarget,
        path: &Path,
        metadata: &VideoMetadata,
        part: Part,
    ) -> Form {
        let title = metadata
            .title()
            .map(truncate_title)
            .unwrap_or_else(|| title_from_path(path));
        let category = metadata.category().unwrap_or(DEFAULT_CATEGORY).to_string();

        let mut form = Form::new()
            .text("token", target.token.clone())
            .text(MetadataKey::Title.as_str(), title)
            .text(MetadataKey::Category.as_str(), category);

        if let Some(description) = metadata.description() {
            form = form.text(MetadataKey::Description.as_str(), description.to_string());
        }
        let keywords = metadata.keywords();
        if !keywords.is_empty() {
            form = form.text(MetadataKey::Keywords.as_str(), keywords.join(","));
        }

        form.part("file", part)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, TransportError> {
        info!("Signing in as {}", credentials.identity);

        let source = self.api.config().source.clone();
        let params = [
            ("Email", credentials.identity.as_str()),
            ("Passwd", credentials.secret.as_str()),
            ("service", "youtube"),
            ("source", source.as_str()),
            ("accountType", "HOSTED_OR_GOOGLE"),
        ];

        let response = self
            .api
            .create_request(reqwest::Method::POST, &self.endpoints.login_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Self::parse_login_body(&body, "Auth")
                .map(AuthToken::new)
                .ok_or_else(|| TransportError::MalformedResponse("missing Auth token".to_string()));
        }

        match Self::parse_login_body(&body, "Error") {
            Some(code) if CREDENTIAL_ERRORS.contains(&code.as_str()) => {
                warn!("Sign-in refused: {}", code);
                Err(TransportError::BadCredentials(code))
            }
            Some(code) => Err(TransportError::Status {
                status: status.as_u16(),
                message: code,
            }),
            None => Err(TransportError::Status {
                status: status.as_u16(),
                message: "sign-in failed".to_string(),
            }),
        }
    }

    async fn request_upload_authorization(
        &self,
        token: &AuthToken,
    ) -> Result<UploadTarget, TransportError> {
        debug!("Requesting upload token from {}", self.endpoints.upload_token_url);

        let response = self
            .api
            .create_authorized_request(
                reqwest::Method::POST,
                &self.endpoints.upload_token_url,
                token,
            )
            .header("Content-Type", "application/atom+xml; charset=UTF-8")
            .body(r#"<?xml version="1.0"?><entry xmlns="http://www.w3.org/2005/Atom"/>"#)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            warn!("Upload token refused ({})", status);
            return Err(TransportError::BadCredentials(format!(
                "upload token refused with status {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let target = self.parse_upload_target(&body)?;
        debug!("Upload target: {}", target.url);
        Ok(target)
    }

    async fn upload(
        &self,
        target: &UploadTarget,
        path: &Path,
        metadata: &VideoMetadata,
        on_progress: ProgressFn,
    ) -> Result<UploadedVideo, TransportError> {
        let file = File::open(path).await?;
        let total_size = file.metadata().await?.len();
        info!("Uploading {} ({} bytes)", path.display(), total_size);

        let mut progress = Progress::new(total_size);
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                progress.advance(bytes.len() as u64);
                on_progress(progress.fraction);
            }
            chunk
        });

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total_size)
            .file_name(file_name)
            .mime_str(mime_from_path(path))?;
        let form = self.build_form(target, path, metadata, part);

        let mut upload_url = target.url.clone();
        upload_url
            .query_pairs_mut()
            .append_pair("nexturl", &self.endpoints.next_url);

        let response = self
            .api
            .create_upload_request(upload_url.as_str())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().clone();
        debug!("Upload finished at {} with status {}", final_url, status);

        let outcome = match parse_upload_redirect(&final_url) {
            Some(outcome) => outcome,
            None if !status.is_success() => {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    message: "upload failed".to_string(),
                })
            }
            None => {
                return Err(TransportError::MalformedResponse(
                    "upload answer carried no status".to_string(),
                ))
            }
        };

        match (outcome.status, outcome.video_id) {
            (200, Some(video_id)) => {
                let url = watch_url(&self.endpoints.watch_url, &video_id)
                    .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
                info!("Video accepted: {}", url);
                Ok(UploadedVideo::new(video_id, url))
            }
            (status, _) => {
                let reason = outcome
                    .code
                    .unwrap_or_else(|| format!("status {}", status));
                warn!("Upload rejected: {}", reason);
                Err(TransportError::Rejected(reason))
            }
        }
    }
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
