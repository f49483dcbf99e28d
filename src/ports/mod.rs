//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Payment Processor
//!
//! - `PaymentProvider` - customers, checkout sessions, cancellation, webhook verification
//!
//! ## Store
//!
//! - `SubscriptionRepository` - lease records and atomic activation
//! - `TransactionRepository` - append-only payment log
//! - `CustomerProfileRepository` - billing customer reference cache
//! - `ScooterInventory` - scooter availability reads
//! - `WebhookEventRepository` - processed event ledger

mod customer_profile_repository;
mod payment_provider;
mod scooter_inventory;
mod subscription_repository;
mod transaction_repository;
mod webhook_event_repository;

pub use customer_profile_repository::CustomerProfileRepository;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentProvider,
};
pub use scooter_inventory::ScooterInventory;
pub use subscription_repository::SubscriptionRepository;
pub use transaction_repository::TransactionRepository;
pub use webhook_event_repository::{
    SaveResult, WebhookDisposition, WebhookEventRecord, WebhookEventRepository,
};
