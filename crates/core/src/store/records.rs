use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::records::{DeletedKind, Record, RecordNode, TopLevelOrder};
use crate::error::StoreError;

/// Flat, append-ordered record lists keyed by owning collection. This is the
/// source of truth for both comment and post stores; reply trees are
/// materialized on read and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet<K: Ord> {
    by_parent: BTreeMap<K, Vec<Record<K>>>,
}

impl<K: Ord> Default for RecordSet<K> {
    fn default() -> Self {
        Self {
            by_parent: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> RecordSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self, parent: &K) -> &[Record<K>] {
        self.by_parent.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Live records under one parent.
    pub fn live_count(&self, parent: &K) -> usize {
        self.records(parent).iter().filter(|r| !r.is_deleted()).count()
    }

    /// Every record across all parents, deleted ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Record<K>> {
        self.by_parent.values().flatten()
    }

    /// Appends a new live record. `reply_to` is stored as given; a dangling
    /// reference surfaces as a top-level record at read time rather than an
    /// error here.
    pub fn add(
        &mut self,
        parent: K,
        text: &str,
        author: &str,
        reply_to: Option<Uuid>,
        noun: &'static str,
        now: DateTime<Utc>,
    ) -> Result<Record<K>, StoreError> {
        if author.trim().is_empty() {
            return Err(StoreError::Unauthenticated);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyContent(noun));
        }
        let record = Record {
            id: Uuid::new_v4(),
            parent_key: parent.clone(),
            author: author.to_string(),
            text: text.to_string(),
            created_at: now,
            updated_at: None,
            reply_to,
            deleted: None,
        };
        self.by_parent.entry(parent).or_default().push(record.clone());
        Ok(record)
    }

    /// Replaces the body of a live record owned by `author`.
    pub fn edit(
        &mut self,
        parent: &K,
        id: Uuid,
        new_text: &str,
        author: &str,
        noun: &'static str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let Some(record) = self
            .by_parent
            .get_mut(parent)
            .and_then(|list| list.iter_mut().find(|r| r.id == id && !r.is_deleted()))
        else {
            return Err(StoreError::NotFound(noun));
        };
        if record.author != author {
            return Err(StoreError::Forbidden(noun));
        }
        let trimmed = new_text.trim();
        if trimmed.is_empty() {
            return Err(StoreError::EmptyContent(noun));
        }
        record.text = trimmed.to_string();
        record.updated_at = Some(now);
        Ok(())
    }

    /// Cascading soft-delete rooted at `id`: the record and every live
    /// transitive reply are marked deleted in one state update. Returns the
    /// number of records that transitioned. A missing or already-deleted
    /// root is `NotFound`, not a silent success.
    pub fn delete(
        &mut self,
        parent: &K,
        id: Uuid,
        author: &str,
        noun: &'static str,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let Some(list) = self.by_parent.get_mut(parent) else {
            return Err(StoreError::NotFound(noun));
        };
        let Some(root) = list.iter().find(|r| r.id == id && !r.is_deleted()) else {
            return Err(StoreError::NotFound(noun));
        };
        if root.author != author {
            return Err(StoreError::Forbidden(noun));
        }

        // Breadth-first sweep over the live reply_to edges.
        let mut to_delete = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for record in list.iter() {
                if record.reply_to == Some(current)
                    && !record.is_deleted()
                    && !to_delete.contains(&record.id)
                {
                    to_delete.insert(record.id);
                    queue.push_back(record.id);
                }
            }
        }

        let mut transitioned = 0;
        for record in list.iter_mut() {
            if to_delete.contains(&record.id) && !record.is_deleted() {
                record.deleted = Some(if record.id == id {
                    DeletedKind::ByAuthor
                } else {
                    DeletedKind::CascadedReply
                });
                record.text.clear();
                record.updated_at = Some(now);
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    /// Marks every record under `parent` as removed with the thread, author
    /// and prior state notwithstanding. Records that were already deleted
    /// are re-labelled but not counted again; returns the number of records
    /// that newly transitioned.
    pub fn remove_all(&mut self, parent: &K, now: DateTime<Utc>) -> usize {
        let Some(list) = self.by_parent.get_mut(parent) else {
            return 0;
        };
        let mut transitioned = 0;
        for record in list.iter_mut() {
            if !record.is_deleted() {
                transitioned += 1;
            }
            record.deleted = Some(DeletedKind::ThreadRemoved);
            record.text.clear();
            record.updated_at = Some(now);
        }
        transitioned
    }

    /// Reconstructs the reply tree for one parent from the live records.
    /// Replies sort ascending by creation time; a record whose `reply_to`
    /// does not resolve to a live record is demoted to top-level, not
    /// dropped.
    pub fn tree(&self, parent: &K, order: TopLevelOrder) -> Vec<RecordNode<K>> {
        let live: Vec<&Record<K>> = self
            .records(parent)
            .iter()
            .filter(|r| !r.is_deleted())
            .collect();
        let mut index = HashMap::with_capacity(live.len());
        for (idx, record) in live.iter().enumerate() {
            index.insert(record.id, idx);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); live.len()];
        let mut roots = Vec::new();
        for (idx, record) in live.iter().enumerate() {
            match record.reply_to.and_then(|parent_id| index.get(&parent_id)) {
                Some(&parent_idx) if parent_idx != idx => children[parent_idx].push(idx),
                _ => roots.push(idx),
            }
        }

        for list in &mut children {
            list.sort_by_key(|&idx| live[idx].created_at);
        }
        match order {
            TopLevelOrder::NewestFirst => {
                roots.sort_by(|&a, &b| live[b].created_at.cmp(&live[a].created_at));
            }
            TopLevelOrder::OldestFirst => roots.sort_by_key(|&idx| live[idx].created_at),
        }

        roots
            .into_iter()
            .map(|idx| build_node(idx, &live, &children))
            .collect()
    }
}

fn build_node<K: Clone>(idx: usize, live: &[&Record<K>], children: &[Vec<usize>]) -> RecordNode<K> {
    RecordNode {
        record: live[idx].clone(),
        replies: children[idx]
            .iter()
            .map(|&child| build_node(child, live, children))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    use super::RecordSet;
    use crate::domain::records::{DeletedKind, Record, RecordKind, RecordNode, TopLevelOrder};
    use crate::error::StoreError;

    const NOUN: &str = "comment";

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap()
    }

    fn add(set: &mut RecordSet<i64>, reply_to: Option<Uuid>, minute: u32) -> Record<i64> {
        set.add(7, "hello", "alice", reply_to, NOUN, at(minute)).unwrap()
    }

    fn flatten(nodes: &[RecordNode<i64>], out: &mut Vec<Uuid>) {
        for node in nodes {
            out.push(node.record.id);
            flatten(&node.replies, out);
        }
    }

    #[test]
    fn add_rejects_missing_author() {
        let mut set = RecordSet::new();
        let err = set.add(7, "hi", "", None, NOUN, at(0)).unwrap_err();
        assert!(matches!(err, StoreError::Unauthenticated));
        assert_eq!(set.live_count(&7), 0);
    }

    #[test]
    fn add_rejects_whitespace_only_text() {
        let mut set = RecordSet::new();
        let err = set.add(7, "   ", "alice", None, NOUN, at(0)).unwrap_err();
        assert!(matches!(err, StoreError::EmptyContent("comment")));
        assert_eq!(set.live_count(&7), 0);
    }

    #[test]
    fn add_trims_text() {
        let mut set = RecordSet::new();
        let record = set.add(7, "  hi there  ", "alice", None, NOUN, at(0)).unwrap();
        assert_eq!(record.text, "hi there");
    }

    #[test]
    fn edit_by_other_author_is_forbidden_and_leaves_text() {
        let mut set = RecordSet::new();
        let record = add(&mut set, None, 0);
        let err = set
            .edit(&7, record.id, "hacked", "bob", NOUN, at(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
        let stored = set.iter().find(|r| r.id == record.id).unwrap();
        assert_eq!(stored.text, "hello");
        assert!(stored.updated_at.is_none());
    }

    #[test]
    fn edit_missing_record_is_not_found() {
        let mut set: RecordSet<i64> = RecordSet::new();
        let err = set
            .edit(&7, Uuid::new_v4(), "text", "alice", NOUN, at(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_cascades_over_all_descendants() {
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        let child_a = add(&mut set, Some(root.id), 1);
        let child_b = add(&mut set, Some(root.id), 2);
        let grandchild = add(&mut set, Some(child_a.id), 3);
        let unrelated = add(&mut set, None, 4);

        let transitioned = set.delete(&7, root.id, "alice", NOUN, at(5)).unwrap();
        assert_eq!(transitioned, 4);
        assert_eq!(set.live_count(&7), 1);

        let by_id = |id: Uuid| set.iter().find(|r| r.id == id).unwrap();
        assert_eq!(by_id(root.id).deleted, Some(DeletedKind::ByAuthor));
        assert_eq!(by_id(child_a.id).deleted, Some(DeletedKind::CascadedReply));
        assert_eq!(by_id(child_b.id).deleted, Some(DeletedKind::CascadedReply));
        assert_eq!(by_id(grandchild.id).deleted, Some(DeletedKind::CascadedReply));
        assert!(by_id(unrelated.id).deleted.is_none());
        // no live record's reply chain may lead back to the deleted root
        assert!(!set.iter().any(|r| !r.is_deleted() && r.reply_to == Some(root.id)));
    }

    #[test]
    fn deleted_records_render_placeholders() {
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        let reply = add(&mut set, Some(root.id), 1);
        set.delete(&7, root.id, "alice", NOUN, at(2)).unwrap();

        let by_id = |id: Uuid| set.iter().find(|r| r.id == id).unwrap().clone();
        assert_eq!(
            by_id(root.id).display_text(RecordKind::Comment),
            "[comment deleted by author]"
        );
        assert_eq!(by_id(reply.id).display_text(RecordKind::Comment), "[reply deleted]");
        assert_eq!(by_id(root.id).text, "");
    }

    #[test]
    fn second_delete_reports_not_found() {
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        set.delete(&7, root.id, "alice", NOUN, at(1)).unwrap();
        let err = set.delete(&7, root.id, "alice", NOUN, at(2)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_by_other_author_is_forbidden() {
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        let err = set.delete(&7, root.id, "bob", NOUN, at(1)).unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
        assert_eq!(set.live_count(&7), 1);
    }

    #[test]
    fn remove_all_relabels_already_deleted_without_recounting() {
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        let reply = add(&mut set, Some(root.id), 1);
        let other = add(&mut set, None, 2);
        set.delete(&7, root.id, "alice", NOUN, at(3)).unwrap();

        let transitioned = set.remove_all(&7, at(4));
        assert_eq!(transitioned, 1); // only `other` was still live
        for id in [root.id, reply.id, other.id] {
            let record = set.iter().find(|r| r.id == id).unwrap();
            assert_eq!(record.deleted, Some(DeletedKind::ThreadRemoved));
            assert_eq!(
                record.display_text(RecordKind::Post),
                "[post in a deleted thread]"
            );
        }
    }

    #[test]
    fn tree_contains_every_live_record_exactly_once() {
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        let child = add(&mut set, Some(root.id), 1);
        let nested = add(&mut set, Some(child.id), 2);
        let solo = add(&mut set, None, 3);
        let victim = add(&mut set, None, 4);
        set.delete(&7, victim.id, "alice", NOUN, at(5)).unwrap();

        let tree = set.tree(&7, TopLevelOrder::OldestFirst);
        let mut seen = Vec::new();
        flatten(&tree, &mut seen);
        seen.sort();
        let mut expected = vec![root.id, child.id, nested.id, solo.id];
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn tree_orders_replies_ascending_and_roots_by_requested_order() {
        let mut set = RecordSet::new();
        let first = add(&mut set, None, 0);
        let second = add(&mut set, None, 5);
        let late_reply = add(&mut set, Some(first.id), 9);
        let early_reply = add(&mut set, Some(first.id), 7);

        let newest = set.tree(&7, TopLevelOrder::NewestFirst);
        assert_eq!(newest[0].record.id, second.id);
        assert_eq!(newest[1].record.id, first.id);
        let replies: Vec<Uuid> = newest[1].replies.iter().map(|n| n.record.id).collect();
        assert_eq!(replies, vec![early_reply.id, late_reply.id]);

        let oldest = set.tree(&7, TopLevelOrder::OldestFirst);
        assert_eq!(oldest[0].record.id, first.id);
        assert_eq!(oldest[1].record.id, second.id);
    }

    #[test]
    fn reply_to_unknown_parent_is_demoted_to_top_level() {
        let mut set = RecordSet::new();
        let orphan = set
            .add(7, "lost", "alice", Some(Uuid::new_v4()), NOUN, at(0))
            .unwrap();
        let tree = set.tree(&7, TopLevelOrder::OldestFirst);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].record.id, orphan.id);
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn reply_under_deleted_parent_does_not_survive_cascade() {
        // cascade completeness from the other direction: after deleting a
        // parent, no later read can resurrect its replies
        let mut set = RecordSet::new();
        let root = add(&mut set, None, 0);
        add(&mut set, Some(root.id), 1);
        set.delete(&7, root.id, "alice", NOUN, at(2)).unwrap();
        assert!(set.tree(&7, TopLevelOrder::NewestFirst).is_empty());
    }

    #[test]
    fn parents_are_isolated_from_each_other() {
        let mut set = RecordSet::new();
        set.add(7, "seven", "alice", None, NOUN, at(0)).unwrap();
        set.add(8, "eight", "alice", None, NOUN, at(1)).unwrap();
        assert_eq!(set.live_count(&7), 1);
        assert_eq!(set.live_count(&8), 1);
        assert_eq!(set.tree(&7, TopLevelOrder::NewestFirst).len(), 1);
    }
}
