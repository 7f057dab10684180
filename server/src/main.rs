use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use segview_server::auth::TokenManager;
use segview_server::config::Config;
use segview_server::db::Database;
use segview_server::oracle::{MaskOracle, RemoteMaskOracle};
use segview_server::server::{AppState, build_router};
use segview_server::store::LocalImageStore;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ensure a directory exists, creating it if necessary.
fn ensure_directory(path: &Path, name: &str) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created {} directory: {:?}", name, path);
    } else if !path.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} path {:?} exists but is not a directory", name, path),
        ));
    }
    Ok(())
}

/// Probe the mask oracle once at startup so a misconfigured model server
/// shows up in the logs immediately instead of on the first request.
async fn bootstrap_oracle(oracle: &dyn MaskOracle, url: &str) {
    match tokio::time::timeout(Duration::from_secs(5), oracle.ping()).await {
        Ok(Ok(())) => info!("Mask oracle reachable at {}", url),
        Ok(Err(e)) => warn!("Mask oracle not reachable at {}: {}", url, e),
        Err(_) => warn!("Mask oracle health probe timed out for {}", url),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segview=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}",
        config.host, config.port
    );
    if let Some(ref base_url) = config.public_base_url {
        info!("Public base URL: {}", base_url);
    }
    if config.auth.token_secret == "insecure-dev-secret" {
        warn!("SECRET_KEY not set - using the insecure development secret");
    }

    // Data directories for original and processed bytes
    ensure_directory(&config.data_dir, "data")?;
    ensure_directory(&config.data_dir.join("uploads"), "uploads")?;
    ensure_directory(&config.data_dir.join("segments"), "segments")?;

    // Metadata store: create schema and seed roles on first start
    let db = Database::connect(&config.database_url).await?;
    db.init_schema().await?;
    db.seed_roles().await?;
    info!("Metadata store ready at {}", config.database_url);

    let store = Arc::new(LocalImageStore::new(config.data_dir.clone())?);

    let oracle: Arc<dyn MaskOracle> = Arc::new(RemoteMaskOracle::new(
        config.oracle.url.clone(),
        config.oracle.timeout,
    ));
    bootstrap_oracle(oracle.as_ref(), &config.oracle.url).await;

    let tokens = Arc::new(TokenManager::new(
        &config.auth.token_secret,
        config.auth.token_ttl,
    ));

    let state = AppState::new(db, store, oracle, tokens, &config);
    let app = build_router(state).layer(TraceLayer::new_for_http());

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("SegView server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
