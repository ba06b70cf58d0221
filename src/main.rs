use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hiring_pipeline::{
    config::{init_config, Config, LogFormat},
    database::{
        memory::InMemoryRepository,
        pool::{create_pool, run_migrations},
        postgres::PgRepository,
        repository::Repository,
    },
    routes,
    services::notification_service::{LogNotifier, Notifier, WebhookNotifier},
    AppState,
};
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hiring_pipeline=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Using PostgreSQL repository");
            Ok(Arc::new(PgRepository::new(pool)))
        }
        None => {
            warn!("DATABASE_URL is not set, data will be kept in memory only");
            Ok(Arc::new(InMemoryRepository::new()))
        }
    }
}

fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.notification_webhook_url {
        Some(url) => {
            let client = Client::builder()
                .timeout(config.notification_timeout + Duration::from_secs(1))
                .build()?;
            info!(target_url = %url, "Status notifications go to webhook");
            Ok(Arc::new(WebhookNotifier::new(
                client,
                url.clone(),
                config.notification_secret.clone(),
            )))
        }
        None => {
            info!("NOTIFICATION_WEBHOOK_URL is not set, notifications are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = init_config()?;
    init_tracing(config.log_format);

    let repository = build_repository(config).await?;
    let notifier = build_notifier(config)?;
    let app_state = AppState::new(repository, notifier, config.notification_timeout);

    let app = routes::router(app_state, config.api_rps);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
