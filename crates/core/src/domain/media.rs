use serde::{Deserialize, Serialize};

/// AniList media identifier.
pub type MediaId = i64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaTitle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romaji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_preferred: Option<String>,
}

impl MediaTitle {
    pub fn preferred(&self) -> Option<&str> {
        self.user_preferred
            .as_deref()
            .or(self.english.as_deref())
            .or(self.romaji.as_deref())
            .or(self.native.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaCover {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_large: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Snapshot of a catalog entry embedded in watchlist and history items, so
/// those lists render without a catalog round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: MediaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_mal: Option<i64>,
    #[serde(default)]
    pub title: MediaTitle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<MediaCover>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl MediaRef {
    /// Smallest available cover art, for list snapshots.
    pub fn cover_snapshot(&self) -> Option<&str> {
        let cover = self.cover_image.as_ref()?;
        cover.medium.as_deref().or(cover.large.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::MediaTitle;

    #[test]
    fn preferred_title_falls_back_in_order() {
        let mut title = MediaTitle::default();
        assert!(title.preferred().is_none());
        title.native = Some("ナルト".to_string());
        assert_eq!(title.preferred(), Some("ナルト"));
        title.romaji = Some("Naruto".to_string());
        assert_eq!(title.preferred(), Some("Naruto"));
        title.user_preferred = Some("NARUTO".to_string());
        assert_eq!(title.preferred(), Some("NARUTO"));
    }
}
