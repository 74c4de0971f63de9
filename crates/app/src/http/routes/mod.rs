pub mod comments;
pub mod discussions;
pub mod feed;
pub mod health;
pub mod media;
pub mod profile;

use axum::http::StatusCode;

use crate::state::AppState;
use animehub_core::error::StoreError;

/// The identity every mutation runs under: the profile store's current
/// username, or an empty string when nobody is logged in, which the stores
/// reject as unauthenticated.
pub(crate) async fn current_username(state: &AppState) -> String {
    state
        .profile
        .read()
        .await
        .username()
        .unwrap_or_default()
        .to_string()
}

/// Store failures map onto the same status codes everywhere.
pub(crate) fn store_error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
        StoreError::EmptyContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        StoreError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::store_error_status;
    use animehub_core::error::StoreError;

    #[test]
    fn store_errors_map_to_expected_statuses() {
        assert_eq!(
            store_error_status(&StoreError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            store_error_status(&StoreError::EmptyContent("comment")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            store_error_status(&StoreError::NotFound("thread")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            store_error_status(&StoreError::Forbidden("post")),
            StatusCode::FORBIDDEN
        );
    }
}
