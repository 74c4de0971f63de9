use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A top-level discussion topic owning zero or more posts. Threads do not
/// nest; posts under them do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Bumped on thread creation and on any post add/edit/delete.
    pub last_activity_at: DateTime<Utc>,
    /// Cached count of live posts under the thread. Repaired against the
    /// flat post list when a persisted blob is loaded.
    pub post_count: usize,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Thread {
    pub const DELETED_TITLE: &'static str = "[thread deleted by author]";

    /// Title as shown to readers; the stored title is cleared on delete.
    pub fn display_title(&self) -> &str {
        if self.is_deleted {
            Self::DELETED_TITLE
        } else {
            &self.title
        }
    }
}

/// Sort order for thread listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadSort {
    /// Descending by `last_activity_at`.
    #[default]
    Activity,
    /// Descending by `created_at`.
    Newest,
}
