//! Server configuration and shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::TokenKeys;
use crate::media::MediaStore;

/// Where uploaded media goes.
#[derive(Clone, Debug)]
pub enum MediaConfig {
    /// S3-compatible bucket with public-read objects, token auth.
    Bucket {
        endpoint: String,
        bucket: String,
        token: String,
    },
    /// Local directory, for development and tests.
    Local { dir: PathBuf, base_url: String },
}

/// Configuration for the Ripple server.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
    /// Port to listen on.
    pub port: u16,
    /// Secret used to sign auth tokens.
    pub jwt_secret: String,
    /// Media storage backend.
    pub media: MediaConfig,
}

impl AppConfig {
    /// Build configuration from the environment.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("RIPPLE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ripple_data"));

        let port = std::env::var("RIPPLE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4000);

        let jwt_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());

        let media = match (
            std::env::var("MEDIA_ENDPOINT"),
            std::env::var("MEDIA_BUCKET"),
            std::env::var("MEDIA_TOKEN"),
        ) {
            (Ok(endpoint), Ok(bucket), Ok(token)) => MediaConfig::Bucket {
                endpoint,
                bucket,
                token,
            },
            _ => MediaConfig::Local {
                dir: data_dir.join("media"),
                base_url: format!("http://localhost:{}/media", port),
            },
        };

        Self {
            data_dir,
            port,
            jwt_secret,
            media,
        }
    }

    /// Config rooted at a custom directory, with local media storage.
    /// Used by tests.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base = base_dir.into();
        Self {
            data_dir: base.clone(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            media: MediaConfig::Local {
                dir: base.join("media"),
                base_url: "http://media.local".to_string(),
            },
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ripple.sqlite")
    }
}

/// App state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub media: Arc<dyn MediaStore>,
    pub keys: Arc<TokenKeys>,
}
