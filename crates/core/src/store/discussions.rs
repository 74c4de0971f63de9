use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::records::{Record, RecordNode, TopLevelOrder};
use crate::domain::threads::{Thread, ThreadSort};
use crate::error::StoreError;
use crate::store::persist::{PersistError, StateStore};
use crate::store::records::RecordSet;

/// Fixed key the whole discussion state is persisted under.
pub const STORAGE_KEY: &str = "discussions-storage";

const THREAD_NOUN: &str = "thread";
const POST_NOUN: &str = "post";

#[derive(Debug, Default, Serialize, Deserialize)]
struct DiscussionState {
    threads: Vec<Thread>,
    posts_by_thread: RecordSet<Uuid>,
}

/// Discussion forum store: the thread collection plus the posts-per-thread
/// record lists, with `post_count` / `last_activity_at` bookkeeping.
pub struct DiscussionStore {
    state: DiscussionState,
    store: Arc<dyn StateStore>,
}

impl DiscussionStore {
    /// Loads persisted state. Live threads get their cached `post_count`
    /// recounted against the flat post list, so drift in an old blob cannot
    /// outlive a restart.
    pub fn load(store: Arc<dyn StateStore>) -> Result<Self, StoreError> {
        let mut state: DiscussionState = match store.load(STORAGE_KEY)? {
            Some(blob) => serde_json::from_str(&blob).map_err(PersistError::from)?,
            None => DiscussionState::default(),
        };
        let DiscussionState {
            threads,
            posts_by_thread,
        } = &mut state;
        for thread in threads.iter_mut().filter(|t| !t.is_deleted) {
            thread.post_count = posts_by_thread.live_count(&thread.id);
        }
        Ok(Self { state, store })
    }

    pub fn create_thread(
        &mut self,
        title: &str,
        content: Option<&str>,
        author: &str,
    ) -> Result<Thread, StoreError> {
        if author.trim().is_empty() {
            return Err(StoreError::Unauthenticated);
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyContent("thread title"));
        }
        let now = Utc::now();
        let thread = Thread {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: normalize_content(content),
            author: author.to_string(),
            created_at: now,
            updated_at: None,
            last_activity_at: now,
            post_count: 0,
            is_deleted: false,
        };
        self.state.threads.push(thread.clone());
        self.persist()?;
        Ok(thread)
    }

    pub fn update_thread(
        &mut self,
        thread_id: Uuid,
        new_title: &str,
        new_content: Option<&str>,
        author: &str,
    ) -> Result<(), StoreError> {
        let Some(thread) = self
            .state
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id && !t.is_deleted)
        else {
            return Err(StoreError::NotFound(THREAD_NOUN));
        };
        if thread.author != author {
            return Err(StoreError::Forbidden(THREAD_NOUN));
        }
        let title = new_title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyContent("thread title"));
        }
        thread.title = title.to_string();
        thread.content = normalize_content(new_content);
        thread.updated_at = Some(Utc::now());
        self.persist()
    }

    /// Marks the thread deleted and force-cascades every post under it,
    /// post authorship notwithstanding. Returns the number of posts that
    /// transitioned.
    pub fn delete_thread(&mut self, thread_id: Uuid, author: &str) -> Result<usize, StoreError> {
        let now = Utc::now();
        {
            let Some(thread) = self
                .state
                .threads
                .iter_mut()
                .find(|t| t.id == thread_id && !t.is_deleted)
            else {
                return Err(StoreError::NotFound(THREAD_NOUN));
            };
            if thread.author != author {
                return Err(StoreError::Forbidden(THREAD_NOUN));
            }
            thread.is_deleted = true;
            thread.title.clear();
            thread.content = None;
            thread.updated_at = Some(now);
        }
        let transitioned = self.state.posts_by_thread.remove_all(&thread_id, now);
        self.persist()?;
        Ok(transitioned)
    }

    /// Live threads in the requested order.
    pub fn list(&self, sort: ThreadSort) -> Vec<Thread> {
        let mut threads: Vec<Thread> = self
            .state
            .threads
            .iter()
            .filter(|t| !t.is_deleted)
            .cloned()
            .collect();
        match sort {
            ThreadSort::Activity => {
                threads.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
            }
            ThreadSort::Newest => threads.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        threads
    }

    pub fn thread(&self, thread_id: Uuid) -> Option<&Thread> {
        self.state
            .threads
            .iter()
            .find(|t| t.id == thread_id && !t.is_deleted)
    }

    pub fn add_post(
        &mut self,
        thread_id: Uuid,
        text: &str,
        author: &str,
        reply_to: Option<Uuid>,
    ) -> Result<Record<Uuid>, StoreError> {
        if author.trim().is_empty() {
            return Err(StoreError::Unauthenticated);
        }
        if self.thread(thread_id).is_none() {
            return Err(StoreError::NotFound(THREAD_NOUN));
        }
        let now = Utc::now();
        let post = self
            .state
            .posts_by_thread
            .add(thread_id, text, author, reply_to, POST_NOUN, now)?;
        self.touch_thread(thread_id, now, 1, 0);
        self.persist()?;
        Ok(post)
    }

    pub fn edit_post(
        &mut self,
        thread_id: Uuid,
        post_id: Uuid,
        new_text: &str,
        author: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        self.state
            .posts_by_thread
            .edit(&thread_id, post_id, new_text, author, POST_NOUN, now)?;
        self.touch_thread(thread_id, now, 0, 0);
        self.persist()
    }

    /// Soft-deletes the post and its reply subtree; `post_count` drops by
    /// the subtree size. Returns the number of posts transitioned.
    pub fn delete_post(
        &mut self,
        thread_id: Uuid,
        post_id: Uuid,
        author: &str,
    ) -> Result<usize, StoreError> {
        let now = Utc::now();
        let transitioned =
            self.state
                .posts_by_thread
                .delete(&thread_id, post_id, author, POST_NOUN, now)?;
        self.touch_thread(thread_id, now, 0, transitioned);
        self.persist()?;
        Ok(transitioned)
    }

    /// Reply tree for one thread, oldest top-level post first.
    pub fn posts_tree(&self, thread_id: Uuid) -> Vec<RecordNode<Uuid>> {
        self.state
            .posts_by_thread
            .tree(&thread_id, TopLevelOrder::OldestFirst)
    }

    /// All posts across all threads, deleted ones included.
    pub fn iter_posts(&self) -> impl Iterator<Item = &Record<Uuid>> {
        self.state.posts_by_thread.iter()
    }

    fn touch_thread(&mut self, thread_id: Uuid, now: DateTime<Utc>, added: usize, removed: usize) {
        if let Some(thread) = self.state.threads.iter_mut().find(|t| t.id == thread_id) {
            thread.post_count = (thread.post_count + added).saturating_sub(removed);
            thread.last_activity_at = now;
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.state).map_err(PersistError::from)?;
        self.store.save(STORAGE_KEY, &blob)?;
        Ok(())
    }
}

fn normalize_content(content: Option<&str>) -> Option<String> {
    content
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
