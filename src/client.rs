//! HTTP API client.
//!
//! Plays the role the browser frontend plays against the server: it keeps
//! the auth session locally (the token captured from register/login) and
//! exposes one method per endpoint. The integration tests drive the server
//! through this client.

use reqwest::{multipart, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::auth::handlers::AuthResponse;
use crate::auth::TOKEN_HEADER;
use crate::models::{CommentView, PostView, PublicProfile, UserProfile};
use crate::posts::LikesResponse;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error status; `message` is the message
    /// from its JSON error body.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// The current session token, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drop the local session.
    pub fn sign_out(&mut self) {
        self.token = None;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = match response.json::<serde_json::Value>().await {
                Ok(body) => body["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
                Err(_) => "unknown error".to_string(),
            };
            Err(ClientError::Api { status, message })
        }
    }

    // --- Auth ---

    pub async fn register(
        &mut self,
        username: &str,
        name: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<AuthResponse> {
        let body = serde_json::json!({
            "username": username,
            "name": name,
            "email": email,
            "password": password,
        });
        let auth: AuthResponse = self
            .send(self.request(Method::POST, "/api/auth/register").json(&body))
            .await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let body = serde_json::json!({ "email": email, "password": password });
        let auth: AuthResponse = self
            .send(self.request(Method::POST, "/api/auth/login").json(&body))
            .await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn current_user(&self) -> ClientResult<UserProfile> {
        self.send(self.request(Method::GET, "/api/auth/current"))
            .await
    }

    // --- Posts ---

    pub async fn list_posts(&self, page: i64, limit: i64) -> ClientResult<Vec<PostView>> {
        self.send(
            self.request(Method::GET, "/api/posts")
                .query(&[("page", page), ("limit", limit)]),
        )
        .await
    }

    pub async fn get_post(&self, id: &str) -> ClientResult<PostView> {
        self.send(self.request(Method::GET, &format!("/api/posts/{}", id)))
            .await
    }

    /// Create a post; `images` are (filename, content type, bytes) triples.
    pub async fn create_post(
        &self,
        content: &str,
        tags: &[&str],
        images: Vec<(String, String, Vec<u8>)>,
    ) -> ClientResult<PostView> {
        let mut form = multipart::Form::new()
            .text("content", content.to_string())
            .text("tags", tags.join(","));
        for (filename, content_type, data) in images {
            let part = multipart::Part::bytes(data)
                .file_name(filename)
                .mime_str(&content_type)?;
            form = form.part("images", part);
        }
        self.send(self.request(Method::POST, "/api/posts").multipart(form))
            .await
    }

    pub async fn delete_post(&self, id: &str) -> ClientResult<serde_json::Value> {
        self.send(self.request(Method::DELETE, &format!("/api/posts/{}", id)))
            .await
    }

    pub async fn like_post(&self, id: &str) -> ClientResult<LikesResponse> {
        self.send(self.request(Method::POST, &format!("/api/posts/{}/like", id)))
            .await
    }

    pub async fn unlike_post(&self, id: &str) -> ClientResult<LikesResponse> {
        self.send(self.request(Method::POST, &format!("/api/posts/{}/unlike", id)))
            .await
    }

    pub async fn list_comments(&self, post_id: &str) -> ClientResult<Vec<CommentView>> {
        self.send(self.request(Method::GET, &format!("/api/posts/{}/comments", post_id)))
            .await
    }

    pub async fn add_comment(&self, post_id: &str, content: &str) -> ClientResult<CommentView> {
        let body = serde_json::json!({ "content": content });
        self.send(
            self.request(Method::POST, &format!("/api/posts/{}/comments", post_id))
                .json(&body),
        )
        .await
    }

    // --- Users ---

    pub async fn suggested_users(&self) -> ClientResult<Vec<PublicProfile>> {
        self.send(self.request(Method::GET, "/api/users/suggested"))
            .await
    }

    pub async fn user_by_username(&self, username: &str) -> ClientResult<PublicProfile> {
        self.send(self.request(Method::GET, &format!("/api/users/{}", username)))
            .await
    }

    pub async fn user_posts(
        &self,
        user_id: &str,
        page: i64,
        limit: i64,
    ) -> ClientResult<Vec<PostView>> {
        self.send(
            self.request(Method::GET, &format!("/api/users/{}/posts", user_id))
                .query(&[("page", page), ("limit", limit)]),
        )
        .await
    }

    pub async fn follow(&self, user_id: &str) -> ClientResult<serde_json::Value> {
        self.send(self.request(Method::POST, &format!("/api/users/{}/follow", user_id)))
            .await
    }

    pub async fn unfollow(&self, user_id: &str) -> ClientResult<serde_json::Value> {
        self.send(self.request(Method::POST, &format!("/api/users/{}/unfollow", user_id)))
            .await
    }

    // --- Profile ---

    pub async fn my_profile(&self) -> ClientResult<UserProfile> {
        self.send(self.request(Method::GET, "/api/profile/me")).await
    }

    pub async fn update_profile(
        &self,
        name: Option<&str>,
        bio: Option<&str>,
        location: Option<&str>,
    ) -> ClientResult<UserProfile> {
        let body = serde_json::json!({
            "name": name,
            "bio": bio,
            "location": location,
        });
        self.send(self.request(Method::PUT, "/api/profile").json(&body))
            .await
    }

    pub async fn update_avatar(
        &self,
        content_type: &str,
        data: Vec<u8>,
    ) -> ClientResult<UserProfile> {
        let part = multipart::Part::bytes(data)
            .file_name("avatar.jpg")
            .mime_str(content_type)?;
        let form = multipart::Form::new().part("avatar", part);
        self.send(self.request(Method::PUT, "/api/profile/avatar").multipart(form))
            .await
    }
}
