//! Scooter lease service binary.
//!
//! Loads configuration from the environment, connects to PostgreSQL,
//! wires the Stripe adapter and serves the HTTP API until Ctrl+C.

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scooter_lease::adapters::http::{build_router, LeaseAppState};
use scooter_lease::adapters::postgres::{
    PostgresCustomerProfileRepository, PostgresScooterInventory, PostgresSubscriptionRepository,
    PostgresTransactionRepository, PostgresWebhookEventRepository,
};
use scooter_lease::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use scooter_lease::application::CheckoutSettings;
use scooter_lease::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = config.database.connect().await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let payment_provider =
        StripePaymentAdapter::new(StripeConfig::from_payment_config(&config.payment))?;

    let state = LeaseAppState {
        payment_provider: Arc::new(payment_provider),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        transactions: Arc::new(PostgresTransactionRepository::new(pool.clone())),
        profiles: Arc::new(PostgresCustomerProfileRepository::new(pool.clone())),
        inventory: Arc::new(PostgresScooterInventory::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
        catalog: Arc::new(config.leasing.catalog()),
        checkout: CheckoutSettings {
            success_url: config.leasing.success_url(),
            cancel_url: config.leasing.cancel_url(),
            delivery_policy: config.leasing.delivery_policy(),
        },
    };

    let app = build_router(
        state,
        config.server.request_timeout(),
        &config.server.cors_origins_list(),
    );

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        %addr,
        environment = ?config.server.environment,
        live_mode = config.payment.is_live_mode(),
        "Scooter lease service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => tracing::error!(error = %err, "Failed to listen for shutdown signal"),
    }
}
