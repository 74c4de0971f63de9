use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::AppConfig;
use animehub_core::store::{CommentStore, DiscussionStore, ProfileStore};
use animehub_infra::anilist::AnilistClient;

/// Shared application state. Each store sits behind its own lock, so every
/// add/edit/delete runs as one critical section over that store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ephemeral: bool,
    pub catalog: Arc<AnilistClient>,
    pub comments: Arc<RwLock<CommentStore>>,
    pub discussions: Arc<RwLock<DiscussionStore>>,
    pub profile: Arc<RwLock<ProfileStore>>,
}
