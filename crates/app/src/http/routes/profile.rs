use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::http::routes::store_error_status;
use crate::state::AppState;
use animehub_core::domain::media::{MediaId, MediaRef};
use animehub_core::error::StoreError;
use animehub_core::store::profile::{FavoriteThread, HistoryEntry, Toggle, WatchlistEntry};

#[derive(Debug, Error)]
pub enum ProfileApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub watchlist_count: usize,
    pub history_count: usize,
    pub favorite_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordHistoryBody {
    pub media: MediaRef,
    pub episode_number: u32,
    #[serde(default)]
    pub episode_title: Option<String>,
    pub progress_seconds: u32,
    pub duration_seconds: u32,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteBody {
    pub thread_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub status: Toggle,
}

pub async fn get_profile(State(state): State<AppState>) -> Json<ProfileResponse> {
    let profile = state.profile.read().await;
    Json(ProfileResponse {
        username: profile.username().map(str::to_string),
        watchlist_count: profile.watchlist().len(),
        history_count: profile.history().len(),
        favorite_count: profile.favorite_threads().len(),
    })
}

/// The "login" is a display-name setter; there are no credentials to check.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<ProfileResponse>, ProfileApiError> {
    if body.username.trim().is_empty() {
        return Err(StoreError::EmptyContent("username").into());
    }
    let mut profile = state.profile.write().await;
    profile.set_username(Some(&body.username))?;
    Ok(Json(ProfileResponse {
        username: profile.username().map(str::to_string),
        watchlist_count: profile.watchlist().len(),
        history_count: profile.history().len(),
        favorite_count: profile.favorite_threads().len(),
    }))
}

pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, ProfileApiError> {
    let mut profile = state.profile.write().await;
    profile.set_username(None)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_watchlist(State(state): State<AppState>) -> Json<Vec<WatchlistEntry>> {
    let profile = state.profile.read().await;
    Json(profile.watchlist().to_vec())
}

/// Toggle semantics: posting a media already on the list removes it.
pub async fn toggle_watchlist(
    State(state): State<AppState>,
    Json(media): Json<MediaRef>,
) -> Result<Json<ToggleResponse>, ProfileApiError> {
    let mut profile = state.profile.write().await;
    let status = profile.toggle_watchlist(media)?;
    Ok(Json(ToggleResponse { status }))
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path(media_id): Path<MediaId>,
) -> Result<StatusCode, ProfileApiError> {
    let mut profile = state.profile.write().await;
    if !profile.remove_from_watchlist(media_id)? {
        return Err(StoreError::NotFound("watchlist entry").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    let profile = state.profile.read().await;
    Json(profile.history().to_vec())
}

pub async fn record_history(
    State(state): State<AppState>,
    Json(body): Json<RecordHistoryBody>,
) -> Result<StatusCode, ProfileApiError> {
    let mut profile = state.profile.write().await;
    profile.record_episode(
        body.media,
        body.episode_number,
        body.episode_title,
        body.progress_seconds,
        body.duration_seconds,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_history(State(state): State<AppState>) -> Result<StatusCode, ProfileApiError> {
    let mut profile = state.profile.write().await;
    profile.clear_history()?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_favorites(State(state): State<AppState>) -> Json<Vec<FavoriteThread>> {
    let profile = state.profile.read().await;
    Json(profile.favorite_threads())
}

/// Favorites snapshot the thread title at toggle time, so the title has to
/// resolve against a live thread.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Json(body): Json<FavoriteBody>,
) -> Result<Json<ToggleResponse>, ProfileApiError> {
    let title = {
        let discussions = state.discussions.read().await;
        discussions
            .thread(body.thread_id)
            .map(|thread| thread.title.clone())
            .ok_or(StoreError::NotFound("thread"))?
    };
    let mut profile = state.profile.write().await;
    let status = profile.toggle_favorite_thread(body.thread_id, &title)?;
    Ok(Json(ToggleResponse { status }))
}

impl IntoResponse for ProfileApiError {
    fn into_response(self) -> axum::response::Response {
        warn!(error = %self, "profile api error");
        let status = match &self {
            ProfileApiError::Store(err) => store_error_status(err),
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
