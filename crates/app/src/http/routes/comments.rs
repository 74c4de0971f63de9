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
use animehub_core::domain::media::MediaId;
use animehub_core::domain::records::{RecordKind, RecordNode};
use animehub_core::error::StoreError;

#[derive(Debug, Deserialize)]
pub struct CommentsParams {
    pub media_id: Option<MediaId>,
}

#[derive(Debug, Error)]
pub enum CommentsApiError {
    #[error("media_id is required")]
    MissingMediaId,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// One comment with its reply subtree, as rendered to clients.
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub media_id: MediaId,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    pub replies: Vec<CommentView>,
}

impl CommentView {
    fn from_node(node: RecordNode<MediaId>) -> Self {
        let text = node.record.display_text(RecordKind::Comment).to_string();
        let record = node.record;
        Self {
            id: record.id,
            media_id: record.parent_key,
            author: record.author,
            text,
            created_at: record.created_at,
            updated_at: record.updated_at,
            reply_to: record.reply_to,
            replies: node.replies.into_iter().map(Self::from_node).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentThreadResponse {
    pub media_id: MediaId,
    pub total: usize,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentBody {
    pub media_id: MediaId,
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EditCommentBody {
    pub media_id: MediaId,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CascadeResponse {
    pub deleted: usize,
}

pub async fn get_comments(
    State(state): State<AppState>,
    Query(params): Query<CommentsParams>,
) -> Result<Json<CommentThreadResponse>, CommentsApiError> {
    let media_id = params.media_id.ok_or(CommentsApiError::MissingMediaId)?;
    let comments = state.comments.read().await;
    let tree = comments.tree(media_id);
    let total = tree.iter().map(RecordNode::size).sum();
    Ok(Json(CommentThreadResponse {
        media_id,
        total,
        comments: tree.into_iter().map(CommentView::from_node).collect(),
    }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Json(body): Json<AddCommentBody>,
) -> Result<(StatusCode, Json<CommentView>), CommentsApiError> {
    let author = current_username(&state).await;
    let mut comments = state.comments.write().await;
    let record = comments.add(body.media_id, &body.text, &author, body.reply_to)?;
    Ok((
        StatusCode::CREATED,
        Json(CommentView::from_node(RecordNode {
            record,
            replies: Vec::new(),
        })),
    ))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Json(body): Json<EditCommentBody>,
) -> Result<StatusCode, CommentsApiError> {
    let author = current_username(&state).await;
    let mut comments = state.comments.write().await;
    comments.edit(body.media_id, comment_id, &body.text, &author)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<CommentsParams>,
) -> Result<Json<CascadeResponse>, CommentsApiError> {
    let media_id = params.media_id.ok_or(CommentsApiError::MissingMediaId)?;
    let author = current_username(&state).await;
    let mut comments = state.comments.write().await;
    let deleted = comments.delete(media_id, comment_id, &author)?;
    Ok(Json(CascadeResponse { deleted }))
}

impl IntoResponse for CommentsApiError {
    fn into_response(self) -> axum::response::Response {
        warn!(error = %self, "comments api error");
        let status = match &self {
            CommentsApiError::MissingMediaId => StatusCode::BAD_REQUEST,
            CommentsApiError::Store(err) => store_error_status(err),
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
