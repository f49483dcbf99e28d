//! PostgreSQL adapters - Database implementations for the store ports.
//!
//! - `PostgresSubscriptionRepository` - leases, with transactional activation
//! - `PostgresTransactionRepository` - append-only payment log
//! - `PostgresCustomerProfileRepository` - billing customer references
//! - `PostgresScooterInventory` - scooter availability reads
//! - `PostgresWebhookEventRepository` - processed event ledger
//!
//! Schema lives in `migrations/`.

mod customer_profile_repository;
mod scooter_inventory;
mod subscription_repository;
mod transaction_repository;
mod webhook_event_repository;

pub use customer_profile_repository::PostgresCustomerProfileRepository;
pub use scooter_inventory::PostgresScooterInventory;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use transaction_repository::PostgresTransactionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
