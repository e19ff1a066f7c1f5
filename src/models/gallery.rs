//! Gallery model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MediaItem;

/// An ordered, titled collection of media items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GallerySet {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub classification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gallery with its item count, for listings
#[derive(Debug, Clone, Serialize)]
pub struct GalleryWithCount {
    #[serde(flatten)]
    pub gallery: GallerySet,
    pub item_count: i64,
}

/// Gallery with its items in display order
#[derive(Debug, Clone, Serialize)]
pub struct GalleryWithItems {
    #[serde(flatten)]
    pub gallery: GallerySet,
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGalleryInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub classification: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGalleryInput {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the classification
    #[serde(default, with = "double_option")]
    pub classification: Option<Option<String>>,
}

/// Distinguishes an absent field from an explicit `null`
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Deserialize::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_distinguishes_null() {
        let absent: UpdateGalleryInput = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.classification, None);

        let cleared: UpdateGalleryInput = serde_json::from_str(r#"{"classification":null}"#).unwrap();
        assert_eq!(cleared.classification, Some(None));

        let set: UpdateGalleryInput = serde_json::from_str(r#"{"classification":"travel"}"#).unwrap();
        assert_eq!(set.classification, Some(Some("travel".to_string())));
    }
}
