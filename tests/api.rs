//! End-to-end tests: real router on an ephemeral port, driven through the
//! API client the way the frontend drives the server.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ripple::auth::TokenKeys;
use ripple::client::{ApiClient, ClientError, ClientResult};
use ripple::config::{AppConfig, AppState};
use ripple::media::{MediaError, MediaStore};
use tempfile::TempDir;

async fn spawn_server() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::with_base_dir(dir.path());
    let media = ripple::media::from_config(&config.media);
    spawn_server_with(dir, media).await
}

async fn spawn_server_with(dir: TempDir, media: Arc<dyn MediaStore>) -> (TempDir, String) {
    let config = AppConfig::with_base_dir(dir.path());

    let pool = ripple::store::connect(&config.db_path()).await.unwrap();
    let keys = Arc::new(TokenKeys::new(&config.jwt_secret));

    let app = ripple::router(AppState { pool, media, keys });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (dir, format!("http://{}", addr))
}

/// Object store whose bucket is unreachable; every upload fails.
struct DownMediaStore;

#[async_trait]
impl MediaStore for DownMediaStore {
    async fn put(
        &self,
        _key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Result<String, MediaError> {
        Err(MediaError::Rejected("bucket unreachable".to_string()))
    }
}

async fn signed_up(base: &str, username: &str) -> ApiClient {
    let mut client = ApiClient::new(base);
    client
        .register(
            username,
            &format!("{} Name", username),
            &format!("{}@example.com", username),
            "secret123",
        )
        .await
        .unwrap();
    client
}

fn expect_api_err<T: std::fmt::Debug>(res: ClientResult<T>) -> (u16, String) {
    match res {
        Err(ClientError::Api { status, message }) => (status.as_u16(), message),
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn register_login_current_round_trip() {
    let (_dir, base) = spawn_server().await;
    let mut client = ApiClient::new(&base);

    let auth = client
        .register("a", "A", "a@x.com", "secret123")
        .await
        .unwrap();
    assert!(!auth.token.is_empty());
    assert_eq!(auth.user.username, "a");
    assert_eq!(auth.user.followers, 0);
    assert_eq!(auth.user.following, 0);
    assert_eq!(auth.user.posts, 0);

    let auth = client.login("a@x.com", "secret123").await.unwrap();
    assert_eq!(auth.user.followers, 0);

    let me = client.current_user().await.unwrap();
    assert_eq!(me.username, "a");
    assert_eq!(me.name, "A");
    assert_eq!(me.email, "a@x.com");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (_dir, base) = spawn_server().await;
    let mut client = ApiClient::new(&base);

    client
        .register("a", "A", "a@x.com", "secret123")
        .await
        .unwrap();

    let mut second = ApiClient::new(&base);
    let (status, message) = expect_api_err(second.register("b", "B", "a@x.com", "pw123456").await);
    assert_eq!(status, 400);
    assert_eq!(message, "User already exists");
}

#[tokio::test]
async fn login_does_not_leak_account_existence() {
    let (_dir, base) = spawn_server().await;
    let mut client = ApiClient::new(&base);
    client
        .register("a", "A", "a@x.com", "secret123")
        .await
        .unwrap();

    let mut fresh = ApiClient::new(&base);
    let (wrong_status, wrong_message) = expect_api_err(fresh.login("a@x.com", "nope").await);
    let (unknown_status, unknown_message) =
        expect_api_err(fresh.login("ghost@x.com", "nope").await);

    assert_eq!(wrong_status, 401);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_message, unknown_message);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let (_dir, base) = spawn_server().await;

    let anonymous = ApiClient::new(&base);
    let (status, _) = expect_api_err(anonymous.current_user().await);
    assert_eq!(status, 401);

    // Feed stays public.
    assert!(anonymous.list_posts(1, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn post_with_image_appears_in_feed() {
    let (_dir, base) = spawn_server().await;
    let client = signed_up(&base, "alice").await;

    let post = client
        .create_post(
            "hello world",
            &["rust", "feed"],
            vec![(
                "pic.jpg".to_string(),
                "image/jpeg".to_string(),
                b"\xff\xd8 fake jpeg".to_vec(),
            )],
        )
        .await
        .unwrap();

    assert_eq!(post.likes, 0);
    assert_eq!(post.comments, 0);
    assert_eq!(post.tags, vec!["rust", "feed"]);
    assert_eq!(post.images.len(), 1);
    assert!(post.images[0].contains("/posts/"));
    assert!(post.images[0].ends_with("-pic.jpg"));

    let feed = client.list_posts(1, 10).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].author.username, "alice");
    assert_eq!(feed[0].content, "hello world");
}

#[tokio::test]
async fn failed_image_upload_fails_the_whole_post() {
    let dir = tempfile::tempdir().unwrap();
    let (_dir, base) = spawn_server_with(dir, Arc::new(DownMediaStore)).await;
    let alice = signed_up(&base, "alice").await;

    let (status, message) = expect_api_err(
        alice
            .create_post(
                "doomed",
                &[],
                vec![(
                    "pic.jpg".to_string(),
                    "image/jpeg".to_string(),
                    b"\xff\xd8 fake jpeg".to_vec(),
                )],
            )
            .await,
    );
    assert_eq!(status, 500);
    assert_eq!(message, "Server error");

    // Nothing was persisted for the failed request.
    assert!(alice.list_posts(1, 10).await.unwrap().is_empty());

    // Posts that need no upload are untouched by the outage.
    let post = alice.create_post("words only", &[], vec![]).await.unwrap();
    assert!(post.images.is_empty());
}

#[tokio::test]
async fn public_profile_views_omit_email() {
    let (_dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;
    let bob = signed_up(&base, "bob").await;

    // Third-party lookup, unauthenticated: no email on the wire.
    let body: serde_json::Value = reqwest::get(format!("{}/api/users/alice", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["username"], "alice");
    assert!(body.get("email").is_none(), "leaked email: {}", body);

    // Suggestions are other people's profiles; same rule applies.
    let suggestions: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/api/users/suggested", base))
        .header("x-auth-token", bob.token().unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let first = &suggestions[0];
    assert_eq!(first["username"], "alice");
    assert!(first.get("email").is_none(), "leaked email: {}", first);

    // The owner's own views keep the email.
    assert_eq!(alice.current_user().await.unwrap().email, "alice@example.com");
    assert_eq!(alice.my_profile().await.unwrap().email, "alice@example.com");
}

#[tokio::test]
async fn liking_twice_conflicts_and_count_moves_by_one() {
    let (_dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;
    let bob = signed_up(&base, "bob").await;

    let post = client_post(&alice, "likeable").await;

    assert_eq!(bob.like_post(&post.id).await.unwrap().likes, 1);
    let (status, message) = expect_api_err(bob.like_post(&post.id).await);
    assert_eq!(status, 400);
    assert_eq!(message, "Post already liked");

    assert_eq!(alice.get_post(&post.id).await.unwrap().likes, 1);

    assert_eq!(bob.unlike_post(&post.id).await.unwrap().likes, 0);
    let (status, message) = expect_api_err(bob.unlike_post(&post.id).await);
    assert_eq!(status, 400);
    assert_eq!(message, "Post has not yet been liked");
}

async fn client_post(client: &ApiClient, content: &str) -> ripple::models::PostView {
    client.create_post(content, &[], vec![]).await.unwrap()
}

#[tokio::test]
async fn comments_are_newest_first_and_post_scoped() {
    let (_dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;

    let post = client_post(&alice, "talk to me").await;
    alice.add_comment(&post.id, "first").await.unwrap();
    alice.add_comment(&post.id, "second").await.unwrap();

    let comments = alice.list_comments(&post.id).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].content, "second");
    assert_eq!(comments[1].content, "first");
    assert_eq!(comments[0].likes, 0);

    let (status, _) = expect_api_err(alice.add_comment("missing-post", "hi").await);
    assert_eq!(status, 404);

    assert_eq!(alice.get_post(&post.id).await.unwrap().comments, 2);
}

#[tokio::test]
async fn only_the_author_may_delete_and_comments_cascade() {
    let (_dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;
    let bob = signed_up(&base, "bob").await;

    let post = client_post(&alice, "mine").await;
    bob.add_comment(&post.id, "drive-by").await.unwrap();

    let (status, _) = expect_api_err(bob.delete_post(&post.id).await);
    assert_eq!(status, 401);
    // Post and its comment survived the rejected delete.
    assert_eq!(alice.get_post(&post.id).await.unwrap().comments, 1);

    alice.delete_post(&post.id).await.unwrap();
    let (status, _) = expect_api_err(alice.get_post(&post.id).await);
    assert_eq!(status, 404);
    assert!(alice.list_comments(&post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn follow_graph_round_trips() {
    let (_dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;
    let _bob = signed_up(&base, "bob").await;

    let bob_profile = alice.user_by_username("bob").await.unwrap();

    alice.follow(&bob_profile.id).await.unwrap();
    assert_eq!(alice.user_by_username("bob").await.unwrap().followers, 1);
    assert_eq!(alice.my_profile().await.unwrap().following, 1);

    // Bob is followed now, so he drops out of alice's suggestions.
    assert!(alice.suggested_users().await.unwrap().is_empty());

    let me = alice.my_profile().await.unwrap();
    let (status, message) = expect_api_err(alice.follow(&me.id).await);
    assert_eq!(status, 400);
    assert_eq!(message, "You cannot follow yourself");

    let (status, _) = expect_api_err(alice.follow(&bob_profile.id).await);
    assert_eq!(status, 400);

    alice.unfollow(&bob_profile.id).await.unwrap();
    assert_eq!(alice.user_by_username("bob").await.unwrap().followers, 0);
    assert_eq!(alice.my_profile().await.unwrap().following, 0);

    let (status, _) = expect_api_err(alice.unfollow(&bob_profile.id).await);
    assert_eq!(status, 400);
}

#[tokio::test]
async fn profile_updates_are_partial() {
    let (dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;

    let updated = alice
        .update_profile(None, Some("writes Rust"), None)
        .await
        .unwrap();
    assert_eq!(updated.bio, "writes Rust");
    assert_eq!(updated.name, "alice Name");
    assert_eq!(updated.location, "");

    let updated = alice
        .update_avatar("image/jpeg", b"\xff\xd8 avatar".to_vec())
        .await
        .unwrap();
    let avatar = updated.avatar.expect("avatar set");
    assert!(avatar.contains("/avatars/"));

    // The test double stored the bytes under the media dir.
    let key = avatar.split("/media.local/").nth(1).unwrap_or_default();
    let stored = dir.path().join("media").join(key);
    assert!(stored.exists(), "expected {:?} on disk", stored);
}

#[tokio::test]
async fn feed_paginates_newest_first() {
    let (_dir, base) = spawn_server().await;
    let alice = signed_up(&base, "alice").await;

    for n in 1..=3 {
        client_post(&alice, &format!("post {}", n)).await;
    }

    let first_page = alice.list_posts(1, 2).await.unwrap();
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].content, "post 3");
    assert_eq!(first_page[1].content, "post 2");

    let second_page = alice.list_posts(2, 2).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].content, "post 1");

    let me = alice.my_profile().await.unwrap();
    let mine = alice.user_posts(&me.id, 1, 10).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert_eq!(me.posts, 3);
}
