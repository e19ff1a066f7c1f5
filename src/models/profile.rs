//! Member profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of numbered media slots on a profile
pub const MEDIA_SLOT_COUNT: usize = 6;

/// Public profile of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    /// Always `MEDIA_SLOT_COUNT` entries
    pub media_slots: Vec<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Profile of a user that has never saved one
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            display_name: None,
            bio: None,
            location: None,
            website: None,
            avatar_url: None,
            banner_url: None,
            media_slots: vec![None; MEDIA_SLOT_COUNT],
            updated_at: Utc::now(),
        }
    }

    pub fn slot(&self, slot: ProfileSlot) -> Option<&str> {
        match slot {
            ProfileSlot::Avatar => self.avatar_url.as_deref(),
            ProfileSlot::Banner => self.banner_url.as_deref(),
            ProfileSlot::Media(n) => self.media_slots.get(n).and_then(|s| s.as_deref()),
        }
    }

    pub fn set_slot(&mut self, slot: ProfileSlot, url: Option<String>) {
        match slot {
            ProfileSlot::Avatar => self.avatar_url = url,
            ProfileSlot::Banner => self.banner_url = url,
            ProfileSlot::Media(n) => {
                self.media_slots.resize(MEDIA_SLOT_COUNT, None);
                if let Some(entry) = self.media_slots.get_mut(n) {
                    *entry = url;
                }
            }
        }
    }
}

/// An image position on a profile: `avatar`, `banner` or `media_0`..`media_5`.
/// `media-n` is accepted as well when parsing, for use in URL paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSlot {
    Avatar,
    Banner,
    Media(usize),
}

impl fmt::Display for ProfileSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileSlot::Avatar => write!(f, "avatar"),
            ProfileSlot::Banner => write!(f, "banner"),
            ProfileSlot::Media(n) => write!(f, "media_{}", n),
        }
    }
}

impl FromStr for ProfileSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "avatar" => Ok(ProfileSlot::Avatar),
            "banner" => Ok(ProfileSlot::Banner),
            other => other
                .strip_prefix("media_")
                .or_else(|| other.strip_prefix("media-"))
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n < MEDIA_SLOT_COUNT)
                .map(ProfileSlot::Media)
                .ok_or_else(|| anyhow::anyhow!("Invalid profile slot: {}", s)),
        }
    }
}

impl Serialize for ProfileSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProfileSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Editable profile fields; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_parsing() {
        assert_eq!("avatar".parse::<ProfileSlot>().unwrap(), ProfileSlot::Avatar);
        assert_eq!("media_5".parse::<ProfileSlot>().unwrap(), ProfileSlot::Media(5));
        assert!("media_6".parse::<ProfileSlot>().is_err());
        assert!("media_x".parse::<ProfileSlot>().is_err());
        assert_eq!("media-2".parse::<ProfileSlot>().unwrap(), ProfileSlot::Media(2));
        assert!("media-6".parse::<ProfileSlot>().is_err());
        assert!("media2".parse::<ProfileSlot>().is_err());
        assert_eq!(ProfileSlot::Media(2).to_string(), "media_2");
    }

    #[test]
    fn test_slot_serde() {
        let slot: ProfileSlot = serde_json::from_str(r#""banner""#).unwrap();
        assert_eq!(slot, ProfileSlot::Banner);
        assert_eq!(serde_json::to_string(&ProfileSlot::Media(1)).unwrap(), r#""media_1""#);
    }

    #[test]
    fn test_set_slot() {
        let mut profile = Profile::empty(1);
        profile.set_slot(ProfileSlot::Media(3), Some("https://x.test/a.jpg".to_string()));
        profile.set_slot(ProfileSlot::Avatar, Some("https://x.test/b.jpg".to_string()));

        assert_eq!(profile.slot(ProfileSlot::Media(3)), Some("https://x.test/a.jpg"));
        assert_eq!(profile.slot(ProfileSlot::Avatar), Some("https://x.test/b.jpg"));
        assert_eq!(profile.slot(ProfileSlot::Media(0)), None);
        assert_eq!(profile.media_slots.len(), MEDIA_SLOT_COUNT);
    }
}
