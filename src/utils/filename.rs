//! Title helpers derived from local file names

use regex::Regex;
use std::path::Path;

/// Longest title the service accepts, in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Derive a human readable video title from a file path.
///
/// `my_holiday-video.mp4` becomes `my holiday video`.
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let separators = Regex::new(r"[_\-\s.]+").expect("static regex");
    let title = separators.replace_all(&stem, " ").trim().to_string();

    if title.is_empty() {
        return "video".to_string();
    }
    truncate_title(&title)
}

/// Trim a title to the accepted length without splitting characters
pub fn truncate_title(title: &str) -> String {
    let title = title.trim();
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    title
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_path() {
        assert_eq!(
            title_from_path(Path::new("/tmp/my_holiday-video.mp4")),
            "my holiday video"
        );
        assert_eq!(title_from_path(Path::new("clip.final.mov")), "clip final");
        assert_eq!(title_from_path(Path::new("/tmp/___.mp4")), "video");
    }

    #[test]
    fn test_truncate_title() {
        let long = "a".repeat(150);
        assert_eq!(truncate_title(&long).chars().count(), MAX_TITLE_CHARS);
        assert_eq!(truncate_title("  short "), "short");

        let unicode = "é".repeat(120);
        assert_eq!(truncate_title(&unicode).chars().count(), MAX_TITLE_CHARS);
    }
}
