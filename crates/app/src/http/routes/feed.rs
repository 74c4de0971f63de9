use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;
use animehub_core::domain::media::MediaId;
use animehub_core::domain::threads::ThreadSort;

const MAX_ACTIVITY_ITEMS: usize = 50;
const PREVIEW_LEN: usize = 100;

/// One entry in the community activity feed.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityItem {
    NewComment {
        timestamp: DateTime<Utc>,
        username: String,
        media_id: MediaId,
        media_title: String,
        comment_id: Uuid,
        preview: String,
    },
    AddedToWatchlist {
        timestamp: DateTime<Utc>,
        username: String,
        media_id: MediaId,
        media_title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cover_image: Option<String>,
    },
    NewDiscussionThread {
        timestamp: DateTime<Utc>,
        username: String,
        thread_id: Uuid,
        thread_title: String,
    },
    NewDiscussionPost {
        timestamp: DateTime<Utc>,
        username: String,
        thread_id: Uuid,
        thread_title: String,
        post_id: Uuid,
        preview: String,
    },
}

impl ActivityItem {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ActivityItem::NewComment { timestamp, .. }
            | ActivityItem::AddedToWatchlist { timestamp, .. }
            | ActivityItem::NewDiscussionThread { timestamp, .. }
            | ActivityItem::NewDiscussionPost { timestamp, .. } => *timestamp,
        }
    }
}

/// Merges live comments, watchlist additions, threads and posts into one
/// newest-first feed. Media titles for comment entries are resolved through
/// the catalog after the cap, so at most the visible entries cost a lookup.
pub async fn get_feed(State(state): State<AppState>) -> Json<Vec<ActivityItem>> {
    let mut items = Vec::new();

    {
        let comments = state.comments.read().await;
        for record in comments.iter().filter(|r| !r.is_deleted()) {
            items.push(ActivityItem::NewComment {
                timestamp: record.created_at,
                username: record.author.clone(),
                media_id: record.parent_key,
                media_title: String::new(),
                comment_id: record.id,
                preview: preview(&record.text),
            });
        }
    }

    {
        let profile = state.profile.read().await;
        if let Some(username) = profile.username() {
            for entry in profile.watchlist() {
                items.push(ActivityItem::AddedToWatchlist {
                    timestamp: entry.added_at,
                    username: username.to_string(),
                    media_id: entry.media.id,
                    media_title: entry
                        .media
                        .title
                        .preferred()
                        .map(str::to_string)
                        .unwrap_or_else(|| fallback_title(entry.media.id)),
                    cover_image: entry.media.cover_snapshot().map(str::to_string),
                });
            }
        }
    }

    {
        let discussions = state.discussions.read().await;
        for thread in discussions.list(ThreadSort::Newest) {
            items.push(ActivityItem::NewDiscussionThread {
                timestamp: thread.created_at,
                username: thread.author.clone(),
                thread_id: thread.id,
                thread_title: thread.title.clone(),
            });
        }
        for post in discussions.iter_posts().filter(|p| !p.is_deleted()) {
            // posts under a deleted thread carry no live parent and stay out
            let Some(thread) = discussions.thread(post.parent_key) else {
                continue;
            };
            items.push(ActivityItem::NewDiscussionPost {
                timestamp: post.created_at,
                username: post.author.clone(),
                thread_id: post.parent_key,
                thread_title: thread.title.clone(),
                post_id: post.id,
                preview: preview(&post.text),
            });
        }
    }

    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    items.truncate(MAX_ACTIVITY_ITEMS);

    let mut titles: HashMap<MediaId, String> = HashMap::new();
    for item in &mut items {
        if let ActivityItem::NewComment {
            media_id,
            media_title,
            ..
        } = item
        {
            let title = match titles.get(media_id) {
                Some(known) => known.clone(),
                None => {
                    let fetched = fetch_title(&state, *media_id).await;
                    titles.insert(*media_id, fetched.clone());
                    fetched
                }
            };
            *media_title = title;
        }
    }

    Json(items)
}

async fn fetch_title(state: &AppState, media_id: MediaId) -> String {
    match state.catalog.media_by_id(media_id, false).await {
        Ok(media) => media
            .preferred_title()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_title(media_id)),
        Err(err) => {
            warn!(media_id, error = %err, "feed title lookup failed");
            fallback_title(media_id)
        }
    }
}

fn fallback_title(media_id: MediaId) -> String {
    format!("Anime #{media_id}")
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_LEN).collect();
    if text.chars().count() > PREVIEW_LEN {
        out.push_str("...");
    }
    out
}
