use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::AppConfig;
use crate::state::AppState;
use animehub_core::error::StoreError;
use animehub_core::store::persist::{MemoryStateStore, PersistError, StateStore};
use animehub_core::store::{CommentStore, DiscussionStore, ProfileStore};
use animehub_infra::anilist::AnilistClient;
use animehub_infra::kv::FileStateStore;

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("state store error: {0}")]
    Persist(#[from] PersistError),
    #[error("store load error: {0}")]
    Store(#[from] StoreError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub fn build_state(config: AppConfig, ephemeral: bool) -> Result<AppState, WiringError> {
    let state_store: Arc<dyn StateStore> = if ephemeral {
        info!("running with in-memory state stores");
        Arc::new(MemoryStateStore::new())
    } else {
        info!(data_dir = %config.data_dir.display(), "opening state store");
        Arc::new(FileStateStore::open(&config.data_dir)?)
    };

    let comments = CommentStore::load(state_store.clone())?;
    let discussions = DiscussionStore::load(state_store.clone())?;
    let profile = ProfileStore::load(state_store)?;
    info!(
        comments = comments.iter().count(),
        posts = discussions.iter_posts().count(),
        "stores loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    Ok(AppState {
        config: Arc::new(config),
        ephemeral,
        catalog: Arc::new(AnilistClient::new(client)),
        comments: Arc::new(RwLock::new(comments)),
        discussions: Arc::new(RwLock::new(discussions)),
        profile: Arc::new(RwLock::new(profile)),
    })
}
