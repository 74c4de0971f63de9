use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub modules: HealthModules,
}

#[derive(Debug, Serialize)]
pub struct HealthModules {
    pub storage: StorageStatus,
    pub catalog: ModuleStatus,
    pub community: CommunityStatus,
}

#[derive(Debug, Serialize)]
pub struct StorageStatus {
    pub ephemeral: bool,
}

#[derive(Debug, Serialize)]
pub struct ModuleStatus {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct CommunityStatus {
    pub logged_in: bool,
    pub comments: usize,
    pub posts: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let comments = state.comments.read().await.iter().count();
    let posts = state.discussions.read().await.iter_posts().count();
    let logged_in = state.profile.read().await.username().is_some();

    Json(HealthResponse {
        status: "ok",
        modules: HealthModules {
            storage: StorageStatus {
                ephemeral: state.ephemeral,
            },
            catalog: ModuleStatus { enabled: true },
            community: CommunityStatus {
                logged_in,
                comments,
                posts,
            },
        },
    })
}
