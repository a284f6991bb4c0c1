//! MIME type utilities for video uploads

use std::path::Path;

/// Fallback content type for unknown files
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Get MIME type from file extension
pub fn mime_from_ext(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "3gp" => "video/3gpp",
        "flv" => "video/x-flv",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "ts" => "video/mp2t",
        "mpeg" | "mpg" => "video/mpeg",
        "ogv" => "video/ogg",
        "mkv" => "video/x-matroska",
        _ => OCTET_STREAM,
    }
}

/// Get MIME type for the file at `path`, judged by its extension
pub fn mime_from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(mime_from_ext)
        .unwrap_or(OCTET_STREAM)
}

/// Check if MIME type is a video format
pub fn is_video_mime(mime_type: &str) -> bool {
    mime_type.starts_with("video/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_ext() {
        assert_eq!(mime_from_ext("mp4"), "video/mp4");
        assert_eq!(mime_from_ext(".MOV"), "video/quicktime");
        assert_eq!(mime_from_ext("mpg"), "video/mpeg");
        assert_eq!(mime_from_ext("txt"), OCTET_STREAM);
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path(Path::new("/tmp/v.mp4")), "video/mp4");
        assert_eq!(mime_from_path(Path::new("/tmp/clip.webm")), "video/webm");
        assert_eq!(mime_from_path(Path::new("/tmp/noext")), OCTET_STREAM);
    }

    #[test]
    fn test_is_video_mime() {
        assert!(is_video_mime("video/mp4"));
        assert!(!is_video_mime(OCTET_STREAM));
    }
}
