//! Ripple Social Server Library
//!
//! REST backend for a small social-media application: auth and sessions,
//! posts with likes, comments and images, a follower/following graph,
//! profile management, and media upload to object storage.

pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod media;
pub mod models;
pub mod posts;
pub mod profile;
pub mod store;
pub mod users;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use auth::middleware::mw_require_auth;
use config::{AppConfig, AppState};

/// Build the full API router over the given state.
///
/// Public routes and authenticated routes share paths where the original
/// API did (for example GET vs POST `/api/posts`); the auth middleware is
/// layered onto the authenticated method routers only.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(auth::handlers::register))
        .route("/api/auth/login", post(auth::handlers::login))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/{id}", get(posts::get_post))
        .route("/api/posts/{id}/comments", get(posts::list_comments))
        // One param name per position: this segment is a username for the
        // profile lookup and a user id for the posts route.
        .route("/api/users/{id}", get(users::get_by_username))
        .route("/api/users/{id}/posts", get(users::list_user_posts))
        .route("/health", get(health_check));

    let private = Router::new()
        .route("/api/auth/current", get(auth::handlers::current))
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/{id}", delete(posts::delete_post))
        .route("/api/posts/{id}/like", post(posts::like_post))
        .route("/api/posts/{id}/unlike", post(posts::unlike_post))
        .route("/api/posts/{id}/comments", post(posts::add_comment))
        .route("/api/users/suggested", get(users::suggested))
        .route("/api/users/{id}/follow", post(users::follow))
        .route("/api/users/{id}/unfollow", post(users::unfollow))
        .route("/api/profile/me", get(profile::me))
        .route("/api/profile", put(profile::update))
        .route("/api/profile/avatar", put(profile::update_avatar))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw_require_auth,
        ));

    public
        .merge(private)
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire configuration, storage, and media, then serve until shutdown.
pub async fn run() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Ripple Server ===");

    let config = AppConfig::from_env();
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let pool = store::connect(&config.db_path()).await?;
    let media = media::from_config(&config.media);
    let keys = Arc::new(auth::TokenKeys::new(&config.jwt_secret));

    let state = AppState { pool, media, keys };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK - Ripple Server"
}
