//! Subscription store wrapper that answers one lookup from an old snapshot.
//!
//! Lets handler tests replay the window where a concurrent writer lands
//! between a handler's read and its write.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::leasing::Subscription;
use crate::ports::{SaveResult, SubscriptionRepository};

use super::InMemoryLeaseStore;

pub(crate) struct StaleSubscriptionReads {
    inner: Arc<InMemoryLeaseStore>,
    snapshot: Mutex<Option<Option<Subscription>>>,
}

impl StaleSubscriptionReads {
    /// The next `find_by_id` or `find_by_external_id` returns `snapshot`;
    /// every later call reads the live store.
    pub(crate) fn new(inner: Arc<InMemoryLeaseStore>, snapshot: Option<Subscription>) -> Self {
        Self {
            inner,
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    fn take_snapshot(&self) -> Option<Option<Subscription>> {
        self.snapshot.lock().unwrap().take()
    }
}

#[async_trait]
impl SubscriptionRepository for StaleSubscriptionReads {
    async fn create_with_reservation(
        &self,
        subscription: &Subscription,
    ) -> Result<SaveResult, DomainError> {
        self.inner.create_with_reservation(subscription).await
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        match self.take_snapshot() {
            Some(stale) => Ok(stale),
            None => self.inner.find_by_id(id).await,
        }
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        match self.take_snapshot() {
            Some(stale) => Ok(stale),
            None => self.inner.find_by_external_id(external_subscription_id).await,
        }
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        self.inner.list_by_user(user_id).await
    }

    async fn mark_cancelled(&self, subscription: &Subscription) -> Result<bool, DomainError> {
        self.inner.mark_cancelled(subscription).await
    }
}
