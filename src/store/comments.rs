//! Comment repository. Comments are children of posts; the post repository
//! deletes them when the parent goes away.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::core::error::{Error, Result};
use crate::models::{AuthorInfo, CommentView};

/// Newest-first comments for a post, with author annotation.
pub async fn list_for_post(pool: &SqlitePool, post_id: &str) -> Result<Vec<CommentView>> {
    let rows: Vec<(
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        Option<String>,
    )> = sqlx::query_as(
        "SELECT c.id, c.post_id, c.content, c.created_at, c.updated_at, \
                u.id, u.username, u.name, u.avatar \
         FROM comments c JOIN users u ON u.id = c.author_id \
         WHERE c.post_id = ? \
         ORDER BY c.created_at DESC, c.rowid DESC",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, post_id, content, created_at, updated_at, author_id, username, name, avatar)| {
                CommentView {
                    id,
                    post_id,
                    content,
                    author: AuthorInfo {
                        id: author_id,
                        username,
                        name,
                        avatar,
                    },
                    likes: 0,
                    created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
                    updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
                }
            },
        )
        .collect())
}

/// Add a comment to an existing post.
pub async fn insert_comment(
    pool: &SqlitePool,
    post_id: &str,
    author_id: &str,
    content: &str,
) -> Result<CommentView> {
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(Error::PostNotFound);
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(post_id)
    .bind(author_id)
    .bind(content)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let row: (
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        Option<String>,
    ) = sqlx::query_as(
        "SELECT c.id, c.post_id, c.content, c.created_at, c.updated_at, \
                u.id, u.username, u.name, u.avatar \
         FROM comments c JOIN users u ON u.id = c.author_id \
         WHERE c.id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;

    let (id, post_id, content, created_at, updated_at, author_id, username, name, avatar) = row;
    Ok(CommentView {
        id,
        post_id,
        content,
        author: AuthorInfo {
            id: author_id,
            username,
            name,
            avatar,
        },
        likes: 0,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}
