//! User repository: accounts, profiles, and the follow graph.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::core::error::{Error, Result};
use crate::models::{PublicProfile, User, UserProfile};

const USER_COLUMNS: &str =
    "id, username, name, email, password_hash, bio, avatar, location, created_at, updated_at";

type UserRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
);

fn user_from_row(row: UserRow) -> User {
    let (id, username, name, email, password_hash, bio, avatar, location, created_at, updated_at) =
        row;
    User {
        id,
        username,
        name,
        email,
        password_hash,
        bio,
        avatar,
        location,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    }
}

/// Insert a new user. Conflicts on a taken email or username.
///
/// Uniqueness rides on the table constraints rather than a check-then-insert,
/// so two concurrent registrations cannot both get past a pre-check; the
/// loser's constraint violation maps back to the conflict taxonomy.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        bio: String::new(),
        avatar: None,
        location: String::new(),
        created_at: now,
        updated_at: now,
    };

    let result = sqlx::query(
        "INSERT INTO users (id, username, name, email, password_hash, bio, avatar, location, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&user.avatar)
    .bind(&user.location)
    .bind(user.created_at.to_rfc3339())
    .bind(user.updated_at.to_rfc3339())
    .execute(pool)
    .await;

    if let Err(err) = result {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                // SQLite reports "UNIQUE constraint failed: users.<column>".
                return Err(if db.message().contains("users.email") {
                    Error::EmailTaken
                } else {
                    Error::UsernameTaken
                });
            }
        }
        return Err(err.into());
    }

    info!("[Users] Registered {} ({})", user.username, user.email);

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(user_from_row))
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(user_from_row))
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(user_from_row))
}

/// Follower, following, and post counts for a user.
pub async fn counts(pool: &SqlitePool, user_id: &str) -> Result<(i64, i64, i64)> {
    let (followers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM follows WHERE followed_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    let (following,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    let (posts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok((followers, following, posts))
}

/// Build the public profile view for a user record.
pub async fn profile(pool: &SqlitePool, user: &User) -> Result<UserProfile> {
    let (followers, following, posts) = counts(pool, &user.id).await?;
    Ok(UserProfile {
        id: user.id.clone(),
        username: user.username.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        bio: user.bio.clone(),
        avatar: user.avatar.clone(),
        location: user.location.clone(),
        followers,
        following,
        posts,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

/// Partial profile update; only provided fields change.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: &str,
    name: Option<&str>,
    bio: Option<&str>,
    location: Option<&str>,
) -> Result<User> {
    if let Some(name) = name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(user_id)
            .execute(pool)
            .await?;
    }
    if let Some(bio) = bio {
        sqlx::query("UPDATE users SET bio = ? WHERE id = ?")
            .bind(bio)
            .bind(user_id)
            .execute(pool)
            .await?;
    }
    if let Some(location) = location {
        sqlx::query("UPDATE users SET location = ? WHERE id = ?")
            .bind(location)
            .bind(user_id)
            .execute(pool)
            .await?;
    }

    sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(pool)
        .await?;

    find_by_id(pool, user_id).await?.ok_or(Error::UserNotFound)
}

/// Overwrite a user's avatar URL.
pub async fn set_avatar(pool: &SqlitePool, user_id: &str, url: &str) -> Result<User> {
    sqlx::query("UPDATE users SET avatar = ?, updated_at = ? WHERE id = ?")
        .bind(url)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(pool)
        .await?;

    find_by_id(pool, user_id).await?.ok_or(Error::UserNotFound)
}

/// Add a follow edge. The edge is one row with a composite primary key, so
/// the insert is atomic and both sides of the relationship stay in step.
pub async fn follow(pool: &SqlitePool, follower_id: &str, followed_id: &str) -> Result<()> {
    if follower_id == followed_id {
        return Err(Error::SelfFollow);
    }
    if find_by_id(pool, followed_id).await?.is_none() {
        return Err(Error::UserNotFound);
    }

    let result = sqlx::query(
        "INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?) \
         ON CONFLICT (follower_id, followed_id) DO NOTHING",
    )
    .bind(follower_id)
    .bind(followed_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyFollowing);
    }

    info!("[Users] {} now follows {}", follower_id, followed_id);
    Ok(())
}

/// Remove a follow edge; single atomic delete.
pub async fn unfollow(pool: &SqlitePool, follower_id: &str, followed_id: &str) -> Result<()> {
    if find_by_id(pool, followed_id).await?.is_none() {
        return Err(Error::UserNotFound);
    }

    let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFollowing);
    }

    info!("[Users] {} unfollowed {}", follower_id, followed_id);
    Ok(())
}

pub async fn is_following(
    pool: &SqlitePool,
    follower_id: &str,
    followed_id: &str,
) -> Result<bool> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT follower_id FROM follows WHERE follower_id = ? AND followed_id = ?",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Up to 5 users the given user does not follow yet, excluding the user,
/// with their counts. Public view only; suggestions are about other people.
pub async fn suggested(pool: &SqlitePool, user_id: &str) -> Result<Vec<PublicProfile>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE id != ? \
           AND id NOT IN (SELECT followed_id FROM follows WHERE follower_id = ?) \
         LIMIT 5"
    ))
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut profiles = Vec::with_capacity(rows.len());
    for row in rows {
        let user = user_from_row(row);
        profiles.push(profile(pool, &user).await?.into());
    }
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;

    async fn seed(pool: &SqlitePool, username: &str) -> User {
        insert_user(
            pool,
            username,
            &format!("{} name", username),
            &format!("{}@example.com", username),
            "hash",
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let pool = test_pool().await;
        seed(&pool, "alice").await;
        let err = insert_user(&pool, "alice2", "Alice", "alice@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmailTaken));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let pool = test_pool().await;
        seed(&pool, "alice").await;
        let err = insert_user(&pool, "alice", "Alice", "other@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UsernameTaken));
    }

    #[tokio::test]
    async fn follow_unfollow_round_trip() {
        let pool = test_pool().await;
        let a = seed(&pool, "alice").await;
        let b = seed(&pool, "bob").await;

        follow(&pool, &a.id, &b.id).await.unwrap();
        assert!(is_following(&pool, &a.id, &b.id).await.unwrap());

        let (followers, _, _) = counts(&pool, &b.id).await.unwrap();
        assert_eq!(followers, 1);
        let (_, following, _) = counts(&pool, &a.id).await.unwrap();
        assert_eq!(following, 1);

        unfollow(&pool, &a.id, &b.id).await.unwrap();
        assert!(!is_following(&pool, &a.id, &b.id).await.unwrap());
        let (followers, _, _) = counts(&pool, &b.id).await.unwrap();
        assert_eq!(followers, 0);
        let (_, following, _) = counts(&pool, &a.id).await.unwrap();
        assert_eq!(following, 0);
    }

    #[tokio::test]
    async fn follow_guards() {
        let pool = test_pool().await;
        let a = seed(&pool, "alice").await;
        let b = seed(&pool, "bob").await;

        assert!(matches!(
            follow(&pool, &a.id, &a.id).await.unwrap_err(),
            Error::SelfFollow
        ));
        assert!(matches!(
            follow(&pool, &a.id, "missing").await.unwrap_err(),
            Error::UserNotFound
        ));

        follow(&pool, &a.id, &b.id).await.unwrap();
        assert!(matches!(
            follow(&pool, &a.id, &b.id).await.unwrap_err(),
            Error::AlreadyFollowing
        ));
        assert!(matches!(
            unfollow(&pool, &b.id, &a.id).await.unwrap_err(),
            Error::NotFollowing
        ));
    }

    #[tokio::test]
    async fn suggested_excludes_self_and_followed() {
        let pool = test_pool().await;
        let a = seed(&pool, "alice").await;
        let b = seed(&pool, "bob").await;
        let c = seed(&pool, "carol").await;

        follow(&pool, &a.id, &b.id).await.unwrap();

        let suggestions = suggested(&pool, &a.id).await.unwrap();
        let ids: Vec<&str> = suggestions.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec![c.id.as_str()]);
    }
}
