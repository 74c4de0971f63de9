use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::media::{MediaId, MediaRef};
use crate::error::StoreError;
use crate::store::persist::{PersistError, StateStore};

/// Fixed key the whole profile state is persisted under.
pub const STORAGE_KEY: &str = "user-profile-storage";

/// Watch history keeps this many most-recent entries.
const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub media: MediaRef,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeProgress {
    pub progress_seconds: u32,
    pub duration_seconds: u32,
    pub watched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub media: MediaRef,
    pub episode_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    pub progress: EpisodeProgress,
    pub last_watched: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteThread {
    pub thread_id: Uuid,
    pub title: String,
    pub added_at: DateTime<Utc>,
}

/// Outcome of a toggle-style mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Added,
    Removed,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default)]
    watchlist: Vec<WatchlistEntry>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    #[serde(default)]
    favorite_threads: Vec<FavoriteThread>,
}

/// Single-user profile: the global display-name identity every store reads
/// for authorization, plus watchlist, watch history and favorite threads.
pub struct ProfileStore {
    state: ProfileState,
    store: Arc<dyn StateStore>,
}

impl ProfileStore {
    pub fn load(store: Arc<dyn StateStore>) -> Result<Self, StoreError> {
        let state = match store.load(STORAGE_KEY)? {
            Some(blob) => serde_json::from_str(&blob).map_err(PersistError::from)?,
            None => ProfileState::default(),
        };
        Ok(Self { state, store })
    }

    pub fn username(&self) -> Option<&str> {
        self.state.username.as_deref()
    }

    /// Sets or clears the display name. There are no credentials; this is
    /// the entire login flow.
    pub fn set_username(&mut self, username: Option<&str>) -> Result<(), StoreError> {
        self.state.username = username
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self.persist()
    }

    pub fn watchlist(&self) -> &[WatchlistEntry] {
        &self.state.watchlist
    }

    pub fn is_in_watchlist(&self, media_id: MediaId) -> bool {
        self.state.watchlist.iter().any(|e| e.media.id == media_id)
    }

    /// Adds the media, or removes it when already listed.
    pub fn toggle_watchlist(&mut self, media: MediaRef) -> Result<Toggle, StoreError> {
        self.require_login()?;
        let outcome = match self
            .state
            .watchlist
            .iter()
            .position(|e| e.media.id == media.id)
        {
            Some(pos) => {
                self.state.watchlist.remove(pos);
                Toggle::Removed
            }
            None => {
                self.state.watchlist.insert(
                    0,
                    WatchlistEntry {
                        media,
                        added_at: Utc::now(),
                    },
                );
                Toggle::Added
            }
        };
        self.persist()?;
        Ok(outcome)
    }

    /// Returns whether an entry was actually removed.
    pub fn remove_from_watchlist(&mut self, media_id: MediaId) -> Result<bool, StoreError> {
        let before = self.state.watchlist.len();
        self.state.watchlist.retain(|e| e.media.id != media_id);
        let removed = self.state.watchlist.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Upserts a history entry keyed on (media, episode) and keeps the list
    /// newest-first, capped at the history limit.
    pub fn record_episode(
        &mut self,
        media: MediaRef,
        episode_number: u32,
        episode_title: Option<String>,
        progress_seconds: u32,
        duration_seconds: u32,
    ) -> Result<(), StoreError> {
        self.require_login()?;
        let now = Utc::now();
        let progress = EpisodeProgress {
            progress_seconds,
            duration_seconds,
            watched_at: now,
            title_snapshot: episode_title
                .clone()
                .or_else(|| Some(format!("Episode {episode_number}"))),
            cover_snapshot: media.cover_snapshot().map(str::to_string),
        };
        let entry = HistoryEntry {
            media,
            episode_number,
            episode_title,
            progress,
            last_watched: now,
        };
        match self
            .state
            .history
            .iter_mut()
            .find(|e| e.media.id == entry.media.id && e.episode_number == episode_number)
        {
            Some(existing) => *existing = entry,
            None => self.state.history.push(entry),
        }
        self.state
            .history
            .sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        self.state.history.truncate(HISTORY_LIMIT);
        self.persist()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn history_entry(&self, media_id: MediaId, episode_number: u32) -> Option<&HistoryEntry> {
        self.state
            .history
            .iter()
            .find(|e| e.media.id == media_id && e.episode_number == episode_number)
    }

    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.require_login()?;
        self.state.history.clear();
        self.persist()
    }

    pub fn is_favorite_thread(&self, thread_id: Uuid) -> bool {
        self.state
            .favorite_threads
            .iter()
            .any(|f| f.thread_id == thread_id)
    }

    /// Adds the thread to favorites, or removes it when already present.
    pub fn toggle_favorite_thread(
        &mut self,
        thread_id: Uuid,
        title: &str,
    ) -> Result<Toggle, StoreError> {
        self.require_login()?;
        let outcome = match self
            .state
            .favorite_threads
            .iter()
            .position(|f| f.thread_id == thread_id)
        {
            Some(pos) => {
                self.state.favorite_threads.remove(pos);
                Toggle::Removed
            }
            None => {
                self.state.favorite_threads.insert(
                    0,
                    FavoriteThread {
                        thread_id,
                        title: title.to_string(),
                        added_at: Utc::now(),
                    },
                );
                Toggle::Added
            }
        };
        self.persist()?;
        Ok(outcome)
    }

    /// Favorite threads, newest first.
    pub fn favorite_threads(&self) -> Vec<FavoriteThread> {
        let mut favorites = self.state.favorite_threads.clone();
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        favorites
    }

    fn require_login(&self) -> Result<&str, StoreError> {
        self.state
            .username
            .as_deref()
            .ok_or(StoreError::Unauthenticated)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.state).map_err(PersistError::from)?;
        self.store.save(STORAGE_KEY, &blob)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ProfileStore, Toggle};
    use crate::domain::media::MediaRef;
    use crate::error::StoreError;
    use crate::store::persist::MemoryStateStore;

    fn media(id: i64) -> MediaRef {
        MediaRef {
            id,
            ..MediaRef::default()
        }
    }

    fn logged_in() -> (ProfileStore, Arc<MemoryStateStore>) {
        let persist = Arc::new(MemoryStateStore::new());
        let mut profile = ProfileStore::load(persist.clone()).unwrap();
        profile.set_username(Some("alice")).unwrap();
        (profile, persist)
    }

    #[test]
    fn watchlist_requires_login() {
        let persist = Arc::new(MemoryStateStore::new());
        let mut profile = ProfileStore::load(persist).unwrap();
        assert!(matches!(
            profile.toggle_watchlist(media(1)).unwrap_err(),
            StoreError::Unauthenticated
        ));
        assert!(matches!(
            profile.record_episode(media(1), 1, None, 0, 0).unwrap_err(),
            StoreError::Unauthenticated
        ));
        assert!(matches!(
            profile.clear_history().unwrap_err(),
            StoreError::Unauthenticated
        ));
    }

    #[test]
    fn blank_username_logs_out() {
        let (mut profile, _persist) = logged_in();
        profile.set_username(Some("   ")).unwrap();
        assert!(profile.username().is_none());
    }

    #[test]
    fn toggling_twice_adds_then_removes() {
        let (mut profile, _persist) = logged_in();
        assert_eq!(profile.toggle_watchlist(media(5)).unwrap(), Toggle::Added);
        assert!(profile.is_in_watchlist(5));
        assert_eq!(profile.toggle_watchlist(media(5)).unwrap(), Toggle::Removed);
        assert!(!profile.is_in_watchlist(5));
    }

    #[test]
    fn history_upserts_by_media_and_episode() {
        let (mut profile, _persist) = logged_in();
        profile.record_episode(media(5), 1, None, 120, 1440).unwrap();
        profile.record_episode(media(5), 1, None, 600, 1440).unwrap();
        profile.record_episode(media(5), 2, None, 30, 1440).unwrap();
        assert_eq!(profile.history().len(), 2);
        let entry = profile.history_entry(5, 1).unwrap();
        assert_eq!(entry.progress.progress_seconds, 600);
        assert_eq!(entry.progress.title_snapshot.as_deref(), Some("Episode 1"));
    }

    #[test]
    fn history_is_capped_at_the_limit() {
        let (mut profile, _persist) = logged_in();
        for episode in 0..110 {
            profile.record_episode(media(5), episode, None, 1, 2).unwrap();
        }
        assert_eq!(profile.history().len(), 100);
        // the newest entries survive the cap
        assert!(profile.history_entry(5, 109).is_some());
        assert!(profile.history_entry(5, 0).is_none());
    }

    #[test]
    fn clear_history_empties_the_list() {
        let (mut profile, _persist) = logged_in();
        profile.record_episode(media(5), 1, None, 1, 2).unwrap();
        profile.clear_history().unwrap();
        assert!(profile.history().is_empty());
    }

    #[test]
    fn favorites_toggle_and_list_newest_first() {
        let (mut profile, _persist) = logged_in();
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        profile.toggle_favorite_thread(a, "first").unwrap();
        profile.toggle_favorite_thread(b, "second").unwrap();
        let favorites = profile.favorite_threads();
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0].thread_id, b);
        assert_eq!(profile.toggle_favorite_thread(a, "first").unwrap(), Toggle::Removed);
        assert!(!profile.is_favorite_thread(a));
    }

    #[test]
    fn profile_round_trips_through_the_port() {
        let (mut profile, persist) = logged_in();
        profile.toggle_watchlist(media(9)).unwrap();
        let reloaded = ProfileStore::load(persist).unwrap();
        assert_eq!(reloaded.username(), Some("alice"));
        assert!(reloaded.is_in_watchlist(9));
    }
}
