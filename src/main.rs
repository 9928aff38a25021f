use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardhub::api::{self, AppState};
use cardhub::config::Config;
use cardhub::services::card_lifecycle::LifecycleSettings;
use cardhub::services::{Argon2Hasher, CardService, HttpBankValidator, IdentifierGenerator};
use cardhub::store::{CardStore, MemoryCardStore, PostgresCardStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting card service...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let store: Arc<dyn CardStore> = match &config.database_url {
        Some(database_url) => Arc::new(
            PostgresCardStore::connect(database_url, config.database_max_connections).await?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, cards are kept in memory only");
            Arc::new(MemoryCardStore::new())
        }
    };

    let banks = HttpBankValidator::new(config.bank_service_url.clone(), config.bank_timeout())
        .context("failed to build bank registry client")?;
    let hasher = Argon2Hasher::new(config.hash_cost(), config.cvv_pepper.clone())
        .context("invalid CVV hashing parameters")?;
    let generator = IdentifierGenerator::new(config.card_number_prefix.clone())
        .context("invalid card number prefix")?;

    let service = CardService::new(
        store,
        Arc::new(banks),
        Arc::new(hasher),
        generator,
        LifecycleSettings {
            bank_timeout: config.bank_timeout(),
            max_identifier_attempts: config.max_identifier_attempts,
        },
    );

    let app = api::router(AppState::new(service));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
