//! Data models shared between the store, the handlers, and the API client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public profile view: safe fields plus denormalized counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub location: String,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile as served to anyone other than the owner. Same shape as
/// [`UserProfile`] minus the email; third-party lookups never see contact
/// details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub location: String,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserProfile> for PublicProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            name: profile.name,
            bio: profile.bio,
            avatar: profile.avatar,
            location: profile.location,
            followers: profile.followers,
            following: profile.following,
            posts: profile.posts,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// Abridged author info embedded in posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
}

/// Post record as persisted. Image URLs and tags are stored as JSON text
/// columns; likes live in their own relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post annotated with its author and like/comment counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub author: AuthorInfo,
    pub likes: i64,
    pub comments: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment annotated with its author. Comments carry no like relation yet,
/// so the count serializes as a constant zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub author: AuthorInfo,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
