use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::media::MediaId;
use crate::domain::records::{Record, RecordNode, TopLevelOrder};
use crate::error::StoreError;
use crate::store::persist::{PersistError, StateStore};
use crate::store::records::RecordSet;

/// Fixed key the whole comment state is persisted under.
pub const STORAGE_KEY: &str = "anime-comments-storage";

const NOUN: &str = "comment";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CommentState {
    comments_by_media: RecordSet<MediaId>,
}

/// Comments-per-media store. Holds the flat record lists in memory and
/// writes the whole state back through the injected port on every mutation.
pub struct CommentStore {
    state: CommentState,
    store: Arc<dyn StateStore>,
}

impl CommentStore {
    pub fn load(store: Arc<dyn StateStore>) -> Result<Self, StoreError> {
        let state = match store.load(STORAGE_KEY)? {
            Some(blob) => serde_json::from_str(&blob).map_err(PersistError::from)?,
            None => CommentState::default(),
        };
        Ok(Self { state, store })
    }

    pub fn add(
        &mut self,
        media_id: MediaId,
        text: &str,
        author: &str,
        reply_to: Option<Uuid>,
    ) -> Result<Record<MediaId>, StoreError> {
        let record = self
            .state
            .comments_by_media
            .add(media_id, text, author, reply_to, NOUN, Utc::now())?;
        self.persist()?;
        Ok(record)
    }

    pub fn edit(
        &mut self,
        media_id: MediaId,
        comment_id: Uuid,
        new_text: &str,
        author: &str,
    ) -> Result<(), StoreError> {
        self.state
            .comments_by_media
            .edit(&media_id, comment_id, new_text, author, NOUN, Utc::now())?;
        self.persist()
    }

    /// Soft-deletes the comment and its reply subtree; returns the number of
    /// records transitioned.
    pub fn delete(
        &mut self,
        media_id: MediaId,
        comment_id: Uuid,
        author: &str,
    ) -> Result<usize, StoreError> {
        let transitioned =
            self.state
                .comments_by_media
                .delete(&media_id, comment_id, author, NOUN, Utc::now())?;
        self.persist()?;
        Ok(transitioned)
    }

    /// Reply tree for one media entry, newest top-level comment first.
    pub fn tree(&self, media_id: MediaId) -> Vec<RecordNode<MediaId>> {
        self.state
            .comments_by_media
            .tree(&media_id, TopLevelOrder::NewestFirst)
    }

    /// All comments across all media, deleted ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Record<MediaId>> {
        self.state.comments_by_media.iter()
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

    use super::CommentStore;
    use crate::error::StoreError;
    use crate::store::persist::MemoryStateStore;

    fn store() -> (CommentStore, Arc<MemoryStateStore>) {
        let persist = Arc::new(MemoryStateStore::new());
        let store = CommentStore::load(persist.clone()).unwrap();
        (store, persist)
    }

    #[test]
    fn edit_by_another_user_leaves_comment_unchanged() {
        let (mut comments, _persist) = store();
        let comment = comments.add(42, "nice opening", "alice", None).unwrap();
        let err = comments
            .edit(42, comment.id, "ruined", "bob")
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
        let tree = comments.tree(42);
        assert_eq!(tree[0].record.text, "nice opening");
    }

    #[test]
    fn whitespace_comment_creates_no_record() {
        let (mut comments, _persist) = store();
        let err = comments.add(42, "   ", "alice", None).unwrap_err();
        assert!(matches!(err, StoreError::EmptyContent(_)));
        assert!(comments.tree(42).is_empty());
    }

    #[test]
    fn state_survives_reload_through_the_port() {
        let (mut comments, persist) = store();
        let root = comments.add(42, "first", "alice", None).unwrap();
        comments.add(42, "reply", "bob", Some(root.id)).unwrap();

        let reloaded = CommentStore::load(persist).unwrap();
        let tree = reloaded.tree(42);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].record.author, "bob");
    }

    #[test]
    fn delete_returns_subtree_size_and_persists() {
        let (mut comments, persist) = store();
        let root = comments.add(42, "root", "alice", None).unwrap();
        comments.add(42, "reply", "bob", Some(root.id)).unwrap();
        let transitioned = comments.delete(42, root.id, "alice").unwrap();
        assert_eq!(transitioned, 2);

        let reloaded = CommentStore::load(persist).unwrap();
        assert!(reloaded.tree(42).is_empty());
        assert_eq!(reloaded.iter().count(), 2);
    }
}
