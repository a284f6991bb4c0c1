//! URL utilities for upload redirects and public video links

use crate::error::RupError;
use url::Url;

/// Outcome encoded in the query string of the post-upload redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOutcome {
    /// HTTP-like status reported by the service (200 on success)
    pub status: u16,
    /// ID of the new video, present on success
    pub video_id: Option<String>,
    /// Machine readable rejection reason, present on failure
    pub code: Option<String>,
}

impl RedirectOutcome {
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.video_id.is_some()
    }
}

/// Read `status`, `id` and `code` from the redirect target of a browser-style upload.
///
/// Returns `None` when the URL carries no numeric `status` parameter.
pub fn parse_upload_redirect(url: &Url) -> Option<RedirectOutcome> {
    let mut status = None;
    let mut video_id = None;
    let mut code = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "status" => status = value.parse::<u16>().ok(),
            "id" if !value.is_empty() => video_id = Some(value.to_string()),
            "code" if !value.is_empty() => code = Some(value.to_string()),
            _ => {}
        }
    }

    status.map(|status| RedirectOutcome {
        status,
        video_id,
        code,
    })
}

/// Build the public watch URL for a video ID
pub fn watch_url(base: &str, video_id: &str) -> Result<Url, RupError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().clear().append_pair("v", video_id);
    Ok(url)
}
