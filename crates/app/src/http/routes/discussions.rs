use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::http::routes::{current_username, store_error_status};
use crate::state::AppState;
use animehub_core::domain::records::{RecordKind, RecordNode};
use animehub_core::domain::threads::{Thread, ThreadSort};
use animehub_core::error::StoreError;

#[derive(Debug, Error)]
pub enum DiscussionsApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadView {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
    pub post_count: usize,
}

impl ThreadView {
    fn from_thread(thread: &Thread) -> Self {
        Self {
            id: thread.id,
            title: thread.display_title().to_string(),
            content: thread.content.clone(),
            author: thread.author.clone(),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
            last_activity_at: thread.last_activity_at,
            post_count: thread.post_count,
        }
    }
}

/// One post with its reply subtree, as rendered to clients.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    pub replies: Vec<PostView>,
}

impl PostView {
    fn from_node(node: RecordNode<Uuid>) -> Self {
        let text = node.record.display_text(RecordKind::Post).to_string();
        let record = node.record;
        Self {
            id: record.id,
            thread_id: record.parent_key,
            author: record.author,
            text,
            created_at: record.created_at,
            updated_at: record.updated_at,
            reply_to: record.reply_to,
            replies: node.replies.into_iter().map(Self::from_node).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub sort: Option<ThreadSort>,
}

#[derive(Debug, Deserialize)]
pub struct CreateThreadBody {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThreadBody {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddPostBody {
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EditPostBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetailResponse {
    pub thread: ThreadView,
    pub total_posts: usize,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Serialize)]
pub struct CascadeResponse {
    pub deleted: usize,
}

pub async fn list_threads(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<ThreadView>> {
    let discussions = state.discussions.read().await;
    let threads = discussions.list(params.sort.unwrap_or_default());
    Json(threads.iter().map(ThreadView::from_thread).collect())
}

pub async fn create_thread(
    State(state): State<AppState>,
    Json(body): Json<CreateThreadBody>,
) -> Result<(StatusCode, Json<ThreadView>), DiscussionsApiError> {
    let author = current_username(&state).await;
    let mut discussions = state.discussions.write().await;
    let thread = discussions.create_thread(&body.title, body.content.as_deref(), &author)?;
    Ok((StatusCode::CREATED, Json(ThreadView::from_thread(&thread))))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<Json<ThreadDetailResponse>, DiscussionsApiError> {
    let discussions = state.discussions.read().await;
    let thread = discussions
        .thread(thread_id)
        .ok_or(StoreError::NotFound("thread"))?;
    let posts = discussions.posts_tree(thread_id);
    let total_posts = posts.iter().map(RecordNode::size).sum();
    Ok(Json(ThreadDetailResponse {
        thread: ThreadView::from_thread(thread),
        total_posts,
        posts: posts.into_iter().map(PostView::from_node).collect(),
    }))
}

pub async fn update_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Json(body): Json<UpdateThreadBody>,
) -> Result<StatusCode, DiscussionsApiError> {
    let author = current_username(&state).await;
    let mut discussions = state.discussions.write().await;
    discussions.update_thread(thread_id, &body.title, body.content.as_deref(), &author)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<Json<CascadeResponse>, DiscussionsApiError> {
    let author = current_username(&state).await;
    let mut discussions = state.discussions.write().await;
    let deleted = discussions.delete_thread(thread_id, &author)?;
    Ok(Json(CascadeResponse { deleted }))
}

pub async fn add_post(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Json(body): Json<AddPostBody>,
) -> Result<(StatusCode, Json<PostView>), DiscussionsApiError> {
    let author = current_username(&state).await;
    let mut discussions = state.discussions.write().await;
    let record = discussions.add_post(thread_id, &body.text, &author, body.reply_to)?;
    Ok((
        StatusCode::CREATED,
        Json(PostView::from_node(RecordNode {
            record,
            replies: Vec::new(),
        })),
    ))
}

pub async fn edit_post(
    State(state): State<AppState>,
    Path((thread_id, post_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<EditPostBody>,
) -> Result<StatusCode, DiscussionsApiError> {
    let author = current_username(&state).await;
    let mut discussions = state.discussions.write().await;
    discussions.edit_post(thread_id, post_id, &body.text, &author)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path((thread_id, post_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CascadeResponse>, DiscussionsApiError> {
    let author = current_username(&state).await;
    let mut discussions = state.discussions.write().await;
    let deleted = discussions.delete_post(thread_id, post_id, &author)?;
    Ok(Json(CascadeResponse { deleted }))
}

impl IntoResponse for DiscussionsApiError {
    fn into_response(self) -> axum::response::Response {
        warn!(error = %self, "discussions api error");
        let status = match &self {
            DiscussionsApiError::Store(err) => store_error_status(err),
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
