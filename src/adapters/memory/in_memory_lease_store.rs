//! In-memory lease store.
//!
//! Implements every store port over one `tokio::sync::RwLock`, so the
//! activation unit of work is atomic the same way a database transaction
//! is. Writes can be made to fail on demand to exercise error paths.
//!
//! Not for production: state lives only as long as the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ScooterId, SubscriptionId, Timestamp, UserId};
use crate::domain::leasing::{CustomerProfile, PaymentTransaction, Scooter, Subscription};
use crate::ports::{
    CustomerProfileRepository, SaveResult, ScooterInventory, SubscriptionRepository,
    TransactionRepository, WebhookEventRecord, WebhookEventRepository,
};

#[derive(Default)]
struct StoreState {
    subscriptions: Vec<Subscription>,
    transactions: Vec<PaymentTransaction>,
    profiles: HashMap<UserId, CustomerProfile>,
    scooters: HashMap<ScooterId, Scooter>,
    webhook_events: HashMap<String, WebhookEventRecord>,
}

/// Store backed by process memory.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryLeaseStore::new());
/// store.add_scooter(scooter).await;
/// store.set_fail_writes(true);
/// ```
#[derive(Default)]
pub struct InMemoryLeaseStore {
    state: RwLock<StoreState>,
    fail_writes: AtomicBool,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Seeding ===

    pub async fn add_scooter(&self, scooter: Scooter) {
        self.state.write().await.scooters.insert(scooter.id, scooter);
    }

    pub async fn add_profile(&self, profile: CustomerProfile) {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile);
    }

    /// Make every subsequent write fail until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    // === Inspection ===

    pub async fn scooter(&self, id: &ScooterId) -> Option<Scooter> {
        self.state.read().await.scooters.get(id).cloned()
    }

    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.state.read().await.subscriptions.clone()
    }

    pub async fn transactions(&self) -> Vec<PaymentTransaction> {
        self.state.read().await.transactions.clone()
    }

    pub async fn recorded_event_count(&self) -> usize {
        self.state.read().await.webhook_events.len()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("Injected write failure"));
        }
        Ok(())
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> Timestamp) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created(row)));
    rows
}

#[async_trait]
impl SubscriptionRepository for InMemoryLeaseStore {
    async fn create_with_reservation(
        &self,
        subscription: &Subscription,
    ) -> Result<SaveResult, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        if state
            .subscriptions
            .iter()
            .any(|s| s.external_subscription_id == subscription.external_subscription_id)
        {
            return Ok(SaveResult::AlreadyExists);
        }

        if let Some(scooter) = subscription
            .scooter_id
            .and_then(|id| state.scooters.get_mut(&id))
        {
            if !scooter.is_available {
                tracing::warn!(
                    scooter_id = %scooter.id,
                    subscription_id = %subscription.id,
                    "Leased scooter was already reserved"
                );
            }
            scooter.is_available = false;
        }

        for transaction in state.transactions.iter_mut().filter(|t| {
            t.subscription_id.is_none()
                && t.external_subscription_id.as_deref()
                    == Some(subscription.external_subscription_id.as_str())
        }) {
            transaction.subscription_id = Some(subscription.id);
            transaction.updated_at = subscription.updated_at;
        }

        state.subscriptions.push(subscription.clone());
        Ok(SaveResult::Inserted)
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state.subscriptions.iter().find(|s| &s.id == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.external_subscription_id == external_subscription_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        let rows = state
            .subscriptions
            .iter()
            .filter(|s| s.is_owned_by(user_id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |s: &Subscription| s.created_at))
    }

    async fn mark_cancelled(&self, subscription: &Subscription) -> Result<bool, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let stored = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or_else(|| DomainError::database("Cancelling a subscription that is not stored"))?;

        if stored.is_cancelled() {
            return Ok(false);
        }
        stored.status = subscription.status;
        stored.cancelled_at = subscription.cancelled_at;
        stored.updated_at = subscription.updated_at;
        Ok(true)
    }
}

#[async_trait]
impl TransactionRepository for InMemoryLeaseStore {
    async fn append(&self, transaction: &PaymentTransaction) -> Result<SaveResult, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let duplicate = transaction.external_invoice_id.is_some()
            && state
                .transactions
                .iter()
                .any(|t| t.external_invoice_id == transaction.external_invoice_id);
        if duplicate {
            return Ok(SaveResult::AlreadyExists);
        }

        let mut stored = transaction.clone();
        if stored.subscription_id.is_none() {
            stored.subscription_id = state
                .subscriptions
                .iter()
                .find(|s| {
                    stored.external_subscription_id.as_deref()
                        == Some(s.external_subscription_id.as_str())
                })
                .map(|s| s.id);
        }
        state.transactions.push(stored);
        Ok(SaveResult::Inserted)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentTransaction>, DomainError> {
        let state = self.state.read().await;
        let rows = state
            .transactions
            .iter()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &PaymentTransaction| t.created_at))
    }

    async fn list_by_external_subscription(
        &self,
        external_subscription_id: &str,
    ) -> Result<Vec<PaymentTransaction>, DomainError> {
        let state = self.state.read().await;
        let rows = state
            .transactions
            .iter()
            .filter(|t| t.external_subscription_id.as_deref() == Some(external_subscription_id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &PaymentTransaction| t.created_at))
    }
}

#[async_trait]
impl CustomerProfileRepository for InMemoryLeaseStore {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<CustomerProfile>, DomainError> {
        Ok(self.state.read().await.profiles.get(user_id).cloned())
    }

    async fn find_user_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .values()
            .find(|p| p.billing_customer_id.as_deref() == Some(customer_id))
            .map(|p| p.user_id.clone()))
    }

    async fn attach_billing_customer(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<String, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let profile = state
            .profiles
            .entry(user_id.clone())
            .or_insert_with(|| CustomerProfile::new(user_id.clone()));
        let attached = profile
            .billing_customer_id
            .get_or_insert_with(|| customer_id.to_string());
        Ok(attached.clone())
    }
}

#[async_trait]
impl ScooterInventory for InMemoryLeaseStore {
    async fn find_scooter(&self, id: &ScooterId) -> Result<Option<Scooter>, DomainError> {
        Ok(self.state.read().await.scooters.get(id).cloned())
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryLeaseStore {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.state.read().await.webhook_events.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        if state.webhook_events.contains_key(&record.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        state.webhook_events.insert(record.event_id.clone(), record);
        Ok(SaveResult::Inserted)
    }
}
