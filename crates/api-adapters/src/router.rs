//! Route table of the forum API, mounted under `/api`.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

/// Builds the full router with tracing middleware.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Users
        .route("/user/{nickname}/create", post(handlers::create_user))
        .route(
            "/user/{nickname}/profile",
            get(handlers::user_profile).post(handlers::update_user),
        )
        // Forums
        .route("/forum/create", post(handlers::create_forum))
        .route("/forum/{slug}/details", get(handlers::forum_details))
        .route("/forum/{slug}/create", post(handlers::create_thread))
        .route("/forum/{slug}/threads", get(handlers::forum_threads))
        .route("/forum/{slug}/users", get(handlers::forum_users))
        // Threads
        .route("/thread/{slug_or_id}/create", post(handlers::create_posts))
        .route(
            "/thread/{slug_or_id}/details",
            get(handlers::thread_details).post(handlers::update_thread),
        )
        .route("/thread/{slug_or_id}/posts", get(handlers::thread_posts))
        .route("/thread/{slug_or_id}/vote", post(handlers::vote))
        // Posts
        .route(
            "/post/{id}/details",
            get(handlers::post_details).post(handlers::update_post),
        )
        // Service
        .route("/service/status", get(handlers::status))
        .route("/service/clear", post(handlers::clear));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
