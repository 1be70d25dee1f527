use std::sync::Arc;
use std::time::Duration;

use lost_found::cache::{FsCache, LocalCache};
use lost_found::config::Config;
use lost_found::db::{
    create_pool, ensure_schema, ClaimRepository, ItemRepository, MemoryRepository,
    PgClaimRepository, PgItemRepository,
};
use lost_found::http_client::HttpClient;
use lost_found::notify::MailRelayNotifier;
use lost_found::services::LostFoundService;
use lost_found::storage::{PhotoStore, R2Backend};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lost_found=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting lost-found service...");

    let backend = FsCache::open(&config.cache_dir).await?;
    tracing::info!("Local cache at {}", config.cache_dir.display());
    let cache = Arc::new(LocalCache::new(Arc::new(backend)));

    // Remote store: Postgres when configured, otherwise in-process
    let items: Arc<ItemRepository>;
    let claims: Arc<ClaimRepository>;
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to database...");
        let pool = create_pool(url).await?;
        ensure_schema(&pool).await?;
        tracing::info!("Database connection established");
        items = Arc::new(PgItemRepository::new(pool.clone()));
        claims = Arc::new(PgClaimRepository::new(pool));
    } else {
        tracing::warn!("DATABASE_URL not set, remote store is in-memory only");
        items = Arc::new(MemoryRepository::new());
        claims = Arc::new(MemoryRepository::new());
    }

    let http_client = Arc::new(HttpClient::new(Duration::from_secs(30))?);
    if config.mail_relay_url.is_none() {
        tracing::warn!("MAIL_RELAY_URL not set, notifications will be queued");
    }
    let notifier = Arc::new(MailRelayNotifier::new(
        http_client,
        config.mail_relay_url.clone(),
        config.mail_sender.clone(),
        config.notifications_enabled,
    ));

    let photos: Option<Arc<dyn PhotoStore>> = match &config.r2 {
        Some(r2) => match R2Backend::new(r2) {
            Ok(store) => {
                tracing::info!("Photo storage enabled: bucket={}", store.bucket());
                Some(Arc::new(store) as Arc<dyn PhotoStore>)
            }
            Err(e) => {
                tracing::error!("Failed to create R2 client: {}", e);
                None
            }
        },
        None => {
            tracing::info!("Photo storage disabled");
            None
        }
    };

    let mut service = LostFoundService::new(cache, items, claims, notifier);
    if let Some(photos) = photos {
        service = service.with_photo_store(photos);
    }

    let stats = service.stats().await;
    tracing::info!(
        "Service ready: items={}, active={}, claimed={}, queued_notifications={}",
        stats.total,
        stats.active,
        stats.claimed,
        service.queued_notifications().await.len()
    );

    let mut ticker = tokio::time::interval(config.drain_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = service.drain_notifications().await {
                    tracing::error!("Notification drain failed: {}", e);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
