//! Video metadata and upload result structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Recognized video metadata keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKey {
    Title,
    Description,
    Keywords,
    Category,
}

impl MetadataKey {
    /// Get all recognized keys
    pub fn all() -> [MetadataKey; 4] {
        [
            MetadataKey::Title,
            MetadataKey::Description,
            MetadataKey::Keywords,
            MetadataKey::Category,
        ]
    }

    /// Key name as sent to the service
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Title => "title",
            MetadataKey::Description => "description",
            MetadataKey::Keywords => "keywords",
            MetadataKey::Category => "category",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key name outside the recognized set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown metadata key: {0}")]
pub struct UnknownMetadataKey(pub String);

impl FromStr for MetadataKey {
    type Err = UnknownMetadataKey;

    /// Parse a key name, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(MetadataKey::Title),
            "description" => Ok(MetadataKey::Description),
            "keywords" => Ok(MetadataKey::Keywords),
            "category" => Ok(MetadataKey::Category),
            _ => Err(UnknownMetadataKey(s.to_string())),
        }
    }
}

/// Metadata attached to an uploaded video.
///
/// Only the keys in [`MetadataKey`] are kept; anything else handed to
/// [`VideoMetadata::from_pairs`] is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    values: BTreeMap<MetadataKey, String>,
}

impl VideoMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from string pairs, ignoring unrecognized keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut metadata = Self::new();
        for (key, value) in pairs {
            if let Ok(key) = key.as_ref().parse::<MetadataKey>() {
                metadata.values.insert(key, value.into());
            }
        }
        metadata
    }

    /// Set a value
    pub fn with(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    /// Set title
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.with(MetadataKey::Title, title)
    }

    /// Set description
    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.with(MetadataKey::Description, description)
    }

    /// Set keywords (comma separated)
    pub fn with_keywords(self, keywords: impl Into<String>) -> Self {
        self.with(MetadataKey::Keywords, keywords)
    }

    /// Set category
    pub fn with_category(self, category: impl Into<String>) -> Self {
        self.with(MetadataKey::Category, category)
    }

    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(MetadataKey::Title)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(MetadataKey::Description)
    }

    pub fn category(&self) -> Option<&str> {
        self.get(MetadataKey::Category)
    }

    /// Keywords split on commas, trimmed, empty entries removed
    pub fn keywords(&self) -> Vec<&str> {
        self.get(MetadataKey::Keywords)
            .map(|keywords| {
                keywords
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterate over the present keys in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (MetadataKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// A video accepted by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedVideo {
    /// Platform video ID
    pub video_id: String,
    /// Public location of the video
    pub url: Url,
}

impl UploadedVideo {
    /// Create a new UploadedVideo
    pub fn new(video_id: impl Into<String>, url: Url) -> Self {
        Self {
            video_id: video_id.into(),
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_pairs_ignores_unknown_keys() {
        let metadata = VideoMetadata::from_pairs([
            ("title", "Holiday"),
            ("Description", "Beach day"),
            ("rating", "5"),
            ("privacy", "public"),
        ]);

        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.title(), Some("Holiday"));
        assert_eq!(metadata.description(), Some("Beach day"));
        assert_eq!(metadata.category(), None);
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = VideoMetadata::new()
            .with_title("T")
            .with_category("Travel")
            .with_keywords("sea, sun,, sand ");

        assert_eq!(metadata.title(), Some("T"));
        assert_eq!(metadata.category(), Some("Travel"));
        assert_eq!(metadata.keywords(), vec!["sea", "sun", "sand"]);
    }

    #[test]
    fn test_metadata_iter_order() {
        let metadata = VideoMetadata::new()
            .with_category("Music")
            .with_title("Song");
        let keys: Vec<MetadataKey> = metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![MetadataKey::Title, MetadataKey::Category]);
    }

    #[test]
    fn test_metadata_key_parse() {
        assert_eq!("KEYWORDS".parse::<MetadataKey>(), Ok(MetadataKey::Keywords));
        assert_eq!(" category ".parse::<MetadataKey>(), Ok(MetadataKey::Category));
        assert_eq!(
            "tags".parse::<MetadataKey>(),
            Err(UnknownMetadataKey("tags".to_string()))
        );
        for key in MetadataKey::all() {
            assert_eq!(key.as_str().parse::<MetadataKey>(), Ok(key));
        }
    }

    #[test]
    fn test_uploaded_video_creation() {
        let url = Url::parse("https://www.youtube.com/watch?v=abc123").unwrap();
        let video = UploadedVideo::new("abc123", url.clone());
        assert_eq!(video.video_id, "abc123");
        assert_eq!(video.url, url);
    }

    #[test]
    fn test_uploaded_video_json() {
        let video = UploadedVideo::new(
            "abc123",
            Url::parse("https://www.youtube.com/watch?v=abc123").unwrap(),
        );

        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["video_id"], "abc123");
        assert_eq!(json["url"], "https://www.youtube.com/watch?v=abc123");

        let parsed: UploadedVideo = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, video);
    }
}
