//! Profile handlers for the signed-in user.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::media::avatar_key;
use crate::models::UserProfile;
use crate::store::users;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// GET /api/profile/me
pub async fn me(State(state): State<AppState>, ctx: Ctx) -> Result<Json<UserProfile>> {
    let user = users::find_by_id(&state.pool, ctx.user_id())
        .await?
        .ok_or(Error::UserNotFound)?;
    let profile = users::profile(&state.pool, &user).await?;
    Ok(Json(profile))
}

/// PUT /api/profile — partial update, only provided fields change.
pub async fn update(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    info!("PUT /api/profile - {}", ctx.user_id());

    let user = users::update_profile(
        &state.pool,
        ctx.user_id(),
        req.name.as_deref(),
        req.bio.as_deref(),
        req.location.as_deref(),
    )
    .await?;
    let profile = users::profile(&state.pool, &user).await?;
    Ok(Json(profile))
}

/// PUT /api/profile/avatar (multipart: avatar file)
pub async fn update_avatar(
    State(state): State<AppState>,
    ctx: Ctx,
    mut multipart: Multipart,
) -> Result<Json<UserProfile>> {
    info!("PUT /api/profile/avatar - {}", ctx.user_id());

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "avatar" {
            let content_type = field
                .content_type()
                .unwrap_or("image/jpeg")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::BadRequest(e.to_string()))?;
            upload = Some((content_type, data));
        }
    }

    let (content_type, data) =
        upload.ok_or_else(|| Error::BadRequest("Please upload an image".to_string()))?;

    let key = avatar_key(ctx.user_id());
    let url = state
        .media
        .put(&key, data, &content_type)
        .await
        .map_err(|e| {
            error!("avatar upload failed: {}", e);
            Error::Internal(e.to_string())
        })?;

    let user = users::set_avatar(&state.pool, ctx.user_id(), &url).await?;
    let profile = users::profile(&state.pool, &user).await?;
    Ok(Json(profile))
}
