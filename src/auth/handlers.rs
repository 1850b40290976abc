//! Auth handlers: register, login, current user.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::models::UserProfile;
use crate::store::users;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /api/auth/register - {}", req.email);

    if req.username.trim().is_empty()
        || req.name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.password.is_empty()
    {
        return Err(Error::BadRequest(
            "username, name, email and password are required".to_string(),
        ));
    }

    let password_hash = crate::auth::hash_password(&req.password)?;
    let user = users::insert_user(
        &state.pool,
        req.username.trim(),
        req.name.trim(),
        req.email.trim(),
        &password_hash,
    )
    .await?;

    let token = state.keys.create_token(&user.id)?;
    let user = users::profile(&state.pool, &user).await?;

    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password fail identically, so the response never
/// reveals whether an account exists.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /api/auth/login - {}", req.email);

    let user = users::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or(Error::LoginFail)?;

    let valid = crate::auth::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        warn!("Failed login attempt for {}", req.email);
        return Err(Error::LoginFail);
    }

    let token = state.keys.create_token(&user.id)?;
    let user = users::profile(&state.pool, &user).await?;

    Ok(Json(AuthResponse { token, user }))
}

/// GET /api/auth/current
pub async fn current(State(state): State<AppState>, ctx: Ctx) -> Result<Json<UserProfile>> {
    let user = users::find_by_id(&state.pool, ctx.user_id())
        .await?
        .ok_or(Error::UserNotFound)?;
    let profile = users::profile(&state.pool, &user).await?;
    Ok(Json(profile))
}
