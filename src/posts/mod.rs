//! Post handlers: feed, single posts, likes, and comments.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::media::post_image_key;
use crate::models::{CommentView, PostView};
use crate::store::{comments, posts};

const MAX_IMAGES_PER_POST: usize = 5;

const DEFAULT_PAGE_SIZE: i64 = 10;

/// Offset pagination: `?page=1&limit=10`.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Resolve to a (limit, offset) pair; page numbers start at 1.
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
        (limit, (page - 1) * limit)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewCommentRequest {
    pub content: String,
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<PostView>>> {
    let (limit, offset) = page.limit_offset();
    let feed = posts::list(&state.pool, limit, offset).await?;
    Ok(Json(feed))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostView>> {
    let post = posts::get_view(&state.pool, &id).await?;
    Ok(Json(post))
}

/// POST /api/posts (multipart: content, tags, up to 5 images)
///
/// Every image is uploaded to object storage before the post is persisted;
/// any upload failure fails the whole request.
pub async fn create_post(
    State(state): State<AppState>,
    ctx: Ctx,
    mut multipart: Multipart,
) -> Result<Json<PostView>> {
    info!("POST /api/posts - {}", ctx.user_id());

    let mut content = String::new();
    let mut tags: Vec<String> = Vec::new();
    let mut images: Vec<(String, String, bytes::Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| Error::BadRequest(e.to_string()))?;
            }
            "tags" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| Error::BadRequest(e.to_string()))?;
                tags = raw
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            "images" => {
                let filename = field
                    .file_name()
                    .unwrap_or("unnamed")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::BadRequest(e.to_string()))?;
                images.push((filename, content_type, data));
            }
            _ => {}
        }
    }

    if content.trim().is_empty() {
        return Err(Error::BadRequest("content is required".to_string()));
    }
    if images.len() > MAX_IMAGES_PER_POST {
        return Err(Error::BadRequest(format!(
            "a post can carry at most {} images",
            MAX_IMAGES_PER_POST
        )));
    }

    let mut image_urls = Vec::with_capacity(images.len());
    for (filename, content_type, data) in images {
        let key = post_image_key(&filename);
        let url = state
            .media
            .put(&key, data, &content_type)
            .await
            .map_err(|e| {
                error!("image upload failed: {}", e);
                Error::Internal(e.to_string())
            })?;
        image_urls.push(url);
    }

    let post = posts::insert_post(&state.pool, ctx.user_id(), &content, &image_urls, &tags).await?;
    Ok(Json(post))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    posts::delete(&state.pool, &id, ctx.user_id()).await?;
    Ok(Json(serde_json::json!({ "message": "Post removed" })))
}

/// POST /api/posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<LikesResponse>> {
    let likes = posts::like(&state.pool, &id, ctx.user_id()).await?;
    Ok(Json(LikesResponse { likes }))
}

/// POST /api/posts/{id}/unlike
pub async fn unlike_post(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<LikesResponse>> {
    let likes = posts::unlike(&state.pool, &id, ctx.user_id()).await?;
    Ok(Json(LikesResponse { likes }))
}

/// GET /api/posts/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentView>>> {
    let list = comments::list_for_post(&state.pool, &id).await?;
    Ok(Json(list))
}

/// POST /api/posts/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
    Json(req): Json<NewCommentRequest>,
) -> Result<Json<CommentView>> {
    if req.content.trim().is_empty() {
        return Err(Error::BadRequest("content is required".to_string()));
    }
    let comment = comments::insert_comment(&state.pool, &id, ctx.user_id(), &req.content).await?;
    Ok(Json(comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let (limit, offset) = Pagination::default().limit_offset();
        assert_eq!((limit, offset), (10, 0));

        let page = Pagination {
            page: Some(3),
            limit: Some(5),
        };
        assert_eq!(page.limit_offset(), (5, 10));

        let bogus = Pagination {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(bogus.limit_offset(), (100, 0));
    }
}
