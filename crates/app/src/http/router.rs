use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::http::routes::{comments, discussions, feed, health, media, profile};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state);
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/v1/media/search", get(media::search))
        .route("/v1/media/trending", get(media::trending))
        .route("/v1/media/season", get(media::season))
        .route("/v1/media/{id}", get(media::media_detail))
        .route(
            "/v1/comments",
            get(comments::get_comments).post(comments::add_comment),
        )
        .route(
            "/v1/comments/{id}",
            put(comments::edit_comment).delete(comments::delete_comment),
        )
        .route(
            "/v1/discussions",
            get(discussions::list_threads).post(discussions::create_thread),
        )
        .route(
            "/v1/discussions/{id}",
            get(discussions::get_thread)
                .put(discussions::update_thread)
                .delete(discussions::delete_thread),
        )
        .route("/v1/discussions/{id}/posts", post(discussions::add_post))
        .route(
            "/v1/discussions/{id}/posts/{post_id}",
            put(discussions::edit_post).delete(discussions::delete_post),
        )
        .route("/v1/profile", get(profile::get_profile))
        .route("/v1/profile/login", post(profile::login))
        .route("/v1/profile/logout", post(profile::logout))
        .route(
            "/v1/profile/watchlist",
            get(profile::get_watchlist).post(profile::toggle_watchlist),
        )
        .route(
            "/v1/profile/watchlist/{media_id}",
            delete(profile::remove_from_watchlist),
        )
        .route(
            "/v1/profile/history",
            get(profile::get_history)
                .post(profile::record_history)
                .delete(profile::clear_history),
        )
        .route(
            "/v1/profile/favorites",
            get(profile::get_favorites).post(profile::toggle_favorite),
        )
        .route("/v1/feed", get(feed::get_feed))
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn build_cors(state: &AppState) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    let mut allow_any = false;
    for origin in state.config.cors_allow_origins.iter() {
        if is_wildcard_origin(origin) {
            allow_any = true;
            break;
        }
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => origins.push(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
            }
        }
    }

    let cors = CorsLayer::new().allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ]);

    if !should_enable_cors(allow_any, &origins) {
        return None;
    }

    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_headers([CONTENT_TYPE]),
        )
    }
}

fn is_wildcard_origin(origin: &str) -> bool {
    origin.trim() == "*"
}

fn should_enable_cors(allow_any: bool, origins: &[HeaderValue]) -> bool {
    allow_any || !origins.is_empty()
}

#[cfg(test)]
mod tests {
    use super::{is_wildcard_origin, should_enable_cors};
    use axum::http::HeaderValue;

    #[test]
    fn wildcard_origin_matches_trimmed_star() {
        assert!(is_wildcard_origin("*"));
        assert!(is_wildcard_origin(" * "));
        assert!(!is_wildcard_origin("https://example.com"));
    }

    #[test]
    fn cors_enablement_requires_origin_or_wildcard() {
        assert!(!should_enable_cors(false, &[]));
        assert!(should_enable_cors(true, &[]));
        assert!(should_enable_cors(
            false,
            &[HeaderValue::from_static("https://example.com")]
        ));
    }
}
