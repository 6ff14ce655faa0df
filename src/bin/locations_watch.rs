//! Follows the location stream and logs every change to the local view.

use pinboard_core::core::config::ClientConfig;
use pinboard_core::modules::client::{ApiClient, LocationSubscriber, ReconnectPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Watching locations with {:?}", config);

    let client = ApiClient::new(&config)?
        .with_unauthorized_hook(|| tracing::warn!("API token rejected; continuing without it"));
    let subscriber = LocationSubscriber::new(client, ReconnectPolicy::from_config(&config));
    let mut changes = subscriber.subscribe();

    let log_changes = async {
        while changes.changed().await.is_ok() {
            let view = changes.borrow_and_update().clone();
            match view.snapshot().first() {
                Some(latest) => tracing::info!(
                    "{} locations; latest: {} ({}, {}) updated {}",
                    view.len(),
                    latest.name,
                    latest.lat,
                    latest.lng,
                    latest.updated_at
                ),
                None => tracing::info!("No locations"),
            }
        }
    };

    tokio::select! {
        result = subscriber.run() => result?,
        _ = log_changes => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, stopping"),
    }

    Ok(())
}
