//! Server configuration
//!
//! Configuration is loaded from environment variables once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public base URL for link generation (optional)
    pub public_base_url: Option<String>,
    /// Metadata store connection string
    pub database_url: String,
    /// Root directory for stored image bytes
    pub data_dir: PathBuf,

    /// Mask oracle configuration
    pub oracle: OracleConfig,

    /// Session token configuration
    pub auth: AuthConfig,

    /// Image lifecycle configuration
    pub images: ImageConfig,
}

/// Mask oracle (model server) configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Base URL of the model server
    pub url: String,
    /// Per-request timeout; segmentation is slow
    pub timeout: Duration,
}

/// Session token configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session tokens
    pub token_secret: String,
    /// Token lifetime
    pub token_ttl: Duration,
}

/// Image lifecycle configuration
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Cap on active images; the oldest is evicted past this
    pub max_images: usize,
    /// Maximum accepted upload body in bytes
    pub max_upload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: None,
            database_url: "sqlite://data/segview.db".to_string(),
            data_dir: PathBuf::from("data"),
            oracle: OracleConfig::default(),
            auth: AuthConfig::default(),
            images: ImageConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: "insecure-dev-secret".to_string(),
            token_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_images: 10,
            max_upload_size: 20 * 1024 * 1024, // 20 MB
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(url) = env::var("PUBLIC_BASE_URL")
            && !url.is_empty()
        {
            config.public_base_url = Some(url);
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(dir) = env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        // Oracle config
        if let Ok(url) = env::var("ORACLE_URL") {
            config.oracle.url = url;
        }
        if let Ok(val) = env::var("ORACLE_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.oracle.timeout = Duration::from_secs(secs);
        }

        // Auth config
        if let Ok(secret) = env::var("SECRET_KEY")
            && !secret.is_empty()
        {
            config.auth.token_secret = secret;
        }
        if let Ok(val) = env::var("TOKEN_TTL_HOURS")
            && let Ok(hours) = val.parse::<u64>()
        {
            config.auth.token_ttl = Duration::from_secs(hours * 60 * 60);
        }

        // Image config
        if let Ok(val) = env::var("MAX_IMAGES")
            && let Ok(v) = val.parse()
        {
            config.images.max_images = v;
        }
        if let Ok(val) = env::var("MAX_UPLOAD_SIZE_MB")
            && let Ok(mb) = val.parse::<usize>()
        {
            config.images.max_upload_size = mb * 1024 * 1024;
        }

        config
    }
}
