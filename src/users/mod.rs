//! User handlers: suggestions, public profiles, and the follow graph.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::models::{PostView, PublicProfile};
use crate::posts::Pagination;
use crate::store::{posts, users};

/// GET /api/users/suggested
pub async fn suggested(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<Vec<PublicProfile>>> {
    let list = users::suggested(&state.pool, ctx.user_id()).await?;
    Ok(Json(list))
}

/// GET /api/users/{username}
///
/// Public lookup: serves the email-free profile view.
pub async fn get_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>> {
    let user = users::find_by_username(&state.pool, &username)
        .await?
        .ok_or(Error::UserNotFound)?;
    let profile = users::profile(&state.pool, &user).await?;
    Ok(Json(profile.into()))
}

/// GET /api/users/{user_id}/posts
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<PostView>>> {
    let (limit, offset) = page.limit_offset();
    let list = posts::list_by_author(&state.pool, &user_id, limit, offset).await?;
    Ok(Json(list))
}

/// POST /api/users/{id}/follow
pub async fn follow(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    info!("POST /api/users/{}/follow - {}", id, ctx.user_id());
    users::follow(&state.pool, ctx.user_id(), &id).await?;
    Ok(Json(json!({ "message": "User followed successfully" })))
}

/// POST /api/users/{id}/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    info!("POST /api/users/{}/unfollow - {}", id, ctx.user_id());
    users::unfollow(&state.pool, ctx.user_id(), &id).await?;
    Ok(Json(json!({ "message": "User unfollowed successfully" })))
}
