use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a record is called in user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Comment,
    Post,
}

impl RecordKind {
    pub fn noun(self) -> &'static str {
        match self {
            RecordKind::Comment => "comment",
            RecordKind::Post => "post",
        }
    }
}

/// Why a record is deleted. The category is stored instead of a sentinel
/// body string so rendering stays a presentation concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedKind {
    /// The author removed the record itself.
    ByAuthor,
    /// Swept up by the cascading delete of an ancestor.
    CascadedReply,
    /// The owning thread was removed.
    ThreadRemoved,
}

impl DeletedKind {
    pub fn placeholder(self, kind: RecordKind) -> &'static str {
        match (self, kind) {
            (DeletedKind::ByAuthor, RecordKind::Comment) => "[comment deleted by author]",
            (DeletedKind::ByAuthor, RecordKind::Post) => "[post deleted by author]",
            (DeletedKind::CascadedReply, _) => "[reply deleted]",
            (DeletedKind::ThreadRemoved, _) => "[post in a deleted thread]",
        }
    }
}

/// A single comment or discussion post. `parent_key` identifies the owning
/// collection (a media id for comments, a thread id for posts); `reply_to`
/// points at another record under the same parent and forms the reply tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<K> {
    pub id: Uuid,
    pub parent_key: K,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DeletedKind>,
}

impl<K> Record<K> {
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    /// Body as shown to readers. Deleted records render their category
    /// placeholder; the stored text is cleared on delete.
    pub fn display_text(&self, kind: RecordKind) -> &str {
        match self.deleted {
            Some(reason) => reason.placeholder(kind),
            None => &self.text,
        }
    }
}

/// A record with its replies attached, materialized at query time. The tree
/// shape is never persisted; the flat list stays the source of truth.
#[derive(Debug, Clone, Serialize)]
pub struct RecordNode<K> {
    #[serde(flatten)]
    pub record: Record<K>,
    pub replies: Vec<RecordNode<K>>,
}

impl<K> RecordNode<K> {
    /// Number of records in this subtree, the node itself included.
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(RecordNode::size).sum::<usize>()
    }
}

/// Ordering of top-level records in a reconstructed tree. Comments read
/// newest-first, thread posts oldest-first; both consumers keep the order
/// they shipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelOrder {
    NewestFirst,
    OldestFirst,
}
