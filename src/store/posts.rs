//! Post repository: feed, likes, and ownership checks.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::core::error::{Error, Result};
use crate::models::{AuthorInfo, Post, PostView};

const VIEW_QUERY: &str = "SELECT p.id, p.content, p.images, p.tags, p.created_at, p.updated_at, \
       u.id, u.username, u.name, u.avatar, \
       (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id), \
       (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) \
     FROM posts p JOIN users u ON u.id = p.author_id";

type ViewRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
);

fn view_from_row(row: ViewRow) -> PostView {
    let (
        id,
        content,
        images,
        tags,
        created_at,
        updated_at,
        author_id,
        username,
        name,
        avatar,
        likes,
        comments,
    ) = row;
    PostView {
        id,
        content,
        images: serde_json::from_str(&images).unwrap_or_default(),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        author: AuthorInfo {
            id: author_id,
            username,
            name,
            avatar,
        },
        likes,
        comments,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    }
}

/// Persist a new post. Image URLs must already be uploaded.
pub async fn insert_post(
    pool: &SqlitePool,
    author_id: &str,
    content: &str,
    images: &[String],
    tags: &[String],
) -> Result<PostView> {
    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4().to_string(),
        author_id: author_id.to_string(),
        content: content.to_string(),
        images: images.to_vec(),
        tags: tags.to_vec(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO posts (id, author_id, content, images, tags, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&post.id)
    .bind(&post.author_id)
    .bind(&post.content)
    .bind(serde_json::to_string(&post.images).map_err(|e| Error::Internal(e.to_string()))?)
    .bind(serde_json::to_string(&post.tags).map_err(|e| Error::Internal(e.to_string()))?)
    .bind(post.created_at.to_rfc3339())
    .bind(post.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    info!("[Posts] {} created post {}", author_id, post.id);

    get_view(pool, &post.id).await
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Post>> {
    let row: Option<(String, String, String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, author_id, content, images, tags, created_at, updated_at \
         FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, author_id, content, images, tags, created_at, updated_at)| Post {
            id,
            author_id,
            content,
            images: serde_json::from_str(&images).unwrap_or_default(),
            tags: serde_json::from_str(&tags).unwrap_or_default(),
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
        },
    ))
}

/// Annotated view of one post. NotFound covers both absent and malformed ids.
pub async fn get_view(pool: &SqlitePool, id: &str) -> Result<PostView> {
    let row: Option<ViewRow> = sqlx::query_as(&format!("{VIEW_QUERY} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(view_from_row).ok_or(Error::PostNotFound)
}

/// Newest-first page of the feed.
pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<PostView>> {
    let rows: Vec<ViewRow> = sqlx::query_as(&format!(
        "{VIEW_QUERY} ORDER BY p.created_at DESC, p.rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(view_from_row).collect())
}

/// Newest-first page of one author's posts.
pub async fn list_by_author(
    pool: &SqlitePool,
    author_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostView>> {
    let rows: Vec<ViewRow> = sqlx::query_as(&format!(
        "{VIEW_QUERY} WHERE p.author_id = ? \
         ORDER BY p.created_at DESC, p.rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(author_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(view_from_row).collect())
}

/// Delete a post and everything hanging off it, in one transaction. Only
/// the author may delete.
pub async fn delete(pool: &SqlitePool, post_id: &str, requester_id: &str) -> Result<()> {
    let post = find_by_id(pool, post_id).await?.ok_or(Error::PostNotFound)?;
    if post.author_id != requester_id {
        return Err(Error::NotOwner);
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM post_likes WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("[Posts] {} deleted post {}", requester_id, post_id);
    Ok(())
}

pub async fn like_count(pool: &SqlitePool, post_id: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Like a post; repeat likes conflict. Returns the updated count.
pub async fn like(pool: &SqlitePool, post_id: &str, user_id: &str) -> Result<i64> {
    if find_by_id(pool, post_id).await?.is_none() {
        return Err(Error::PostNotFound);
    }

    let result = sqlx::query(
        "INSERT INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?) \
         ON CONFLICT (post_id, user_id) DO NOTHING",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyLiked);
    }

    like_count(pool, post_id).await
}

/// Remove a like; conflicts when none exists. Returns the updated count.
pub async fn unlike(pool: &SqlitePool, post_id: &str, user_id: &str) -> Result<i64> {
    if find_by_id(pool, post_id).await?.is_none() {
        return Err(Error::PostNotFound);
    }

    let result = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotLiked);
    }

    like_count(pool, post_id).await
}
