//! CancelSubscriptionHandler - Command handler for owner-initiated cancellation.

use std::sync::Arc;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::leasing::{LeaseError, Subscription};
use crate::ports::{PaymentProvider, SubscriptionRepository};

use super::processor_error;

/// Command to cancel a lease.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
    /// False when the processor no longer knew the subscription.
    pub processor_cancelled: bool,
}

/// Handler for cancelling a lease on behalf of its owner.
///
/// The local status only changes after the processor confirms the
/// cancellation, or reports the subscription as already gone. Any other
/// processor failure leaves the lease untouched.
pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            subscriptions,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, LeaseError> {
        // 1. Load and authorize
        let mut subscription = self
            .subscriptions
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or(LeaseError::SubscriptionNotFound(cmd.subscription_id))?;

        if !subscription.is_owned_by(&cmd.user_id) {
            return Err(LeaseError::forbidden(
                "You do not have permission to cancel this subscription",
            ));
        }

        // 2. Apply the transition locally first so conflicts surface
        //    before the processor is called
        subscription.cancel(Timestamp::now())?;

        // 3. Cancel with the processor
        let processor_cancelled = match self
            .payment_provider
            .cancel_subscription(&subscription.external_subscription_id)
            .await
        {
            Ok(()) => true,
            Err(err) if err.is_resource_missing() => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    external_subscription_id = %subscription.external_subscription_id,
                    "Processor subscription already gone, cancelling locally"
                );
                false
            }
            Err(err) => {
                tracing::error!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "Processor cancellation failed, lease left unchanged"
                );
                return Err(processor_error(err));
            }
        };

        // 4. Persist; a concurrent webhook may have cancelled it already
        let applied = self.subscriptions.mark_cancelled(&subscription).await?;
        if !applied {
            if let Some(stored) = self.subscriptions.find_by_id(&subscription.id).await? {
                subscription = stored;
            }
        }

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %cmd.user_id,
            processor_cancelled,
            applied,
            "Subscription cancelled by owner"
        );

        Ok(CancelSubscriptionResult {
            subscription,
            processor_cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryLeaseStore, StaleSubscriptionReads};
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::leasing::{test_subscription, SubscriptionStatus};
    use crate::ports::{PaymentError, SaveResult};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        handler: CancelSubscriptionHandler,
        provider: MockPaymentProvider,
        store: Arc<InMemoryLeaseStore>,
    }

    fn fixture() -> Fixture {
        let provider = MockPaymentProvider::new();
        let store = Arc::new(InMemoryLeaseStore::new());
        let handler = CancelSubscriptionHandler::new(store.clone(), Arc::new(provider.clone()));
        Fixture {
            handler,
            provider,
            store,
        }
    }

    async fn seed(store: &InMemoryLeaseStore, subscription: &Subscription) {
        let saved = store.create_with_reservation(subscription).await.unwrap();
        assert_eq!(saved, SaveResult::Inserted);
    }

    fn command(user: &str, subscription: &Subscription) -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            user_id: UserId::new(user).unwrap(),
            subscription_id: subscription.id,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn owner_cancels_active_subscription() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;

        let result = f.handler.handle(command("user-1", &sub)).await.unwrap();

        assert!(result.processor_cancelled);
        assert_eq!(result.subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(f.provider.cancelled_subscriptions(), vec!["sub_1".to_string()]);
        let stored = f.store.find_by_id(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Cancelled);
        assert!(stored.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn resource_missing_at_processor_still_cancels_locally() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;
        f.provider
            .set_method_error("cancel_subscription", PaymentError::not_found("subscription"));

        let result = f.handler.handle(command("user-1", &sub)).await.unwrap();

        assert!(!result.processor_cancelled);
        assert_eq!(result.subscription.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn webhook_cancellation_landing_mid_request_returns_stored_row() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;

        // The processor's deletion commits after the owner's read
        let mut by_webhook = sub.clone();
        by_webhook.cancel(Timestamp::now()).unwrap();
        assert!(f.store.mark_cancelled(&by_webhook).await.unwrap());

        let stale = StaleSubscriptionReads::new(f.store.clone(), Some(sub.clone()));
        let handler =
            CancelSubscriptionHandler::new(Arc::new(stale), Arc::new(f.provider.clone()));

        let result = handler.handle(command("user-1", &sub)).await.unwrap();

        assert!(result.processor_cancelled);
        assert_eq!(result.subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(result.subscription.cancelled_at, by_webhook.cancelled_at);
        assert_eq!(f.provider.call_count("cancel_subscription"), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejection Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");

        let err = f.handler.handle(command("user-1", &sub)).await.unwrap_err();

        assert_eq!(err, LeaseError::SubscriptionNotFound(sub.id));
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_and_processor_untouched() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;

        let err = f.handler.handle(command("user-2", &sub)).await.unwrap_err();

        assert!(matches!(err, LeaseError::Forbidden(_)));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn already_cancelled_is_a_conflict_without_second_processor_call() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;

        f.handler.handle(command("user-1", &sub)).await.unwrap();
        let err = f.handler.handle(command("user-1", &sub)).await.unwrap_err();

        assert_eq!(err, LeaseError::AlreadyCancelled(sub.id));
        assert_eq!(f.provider.call_count("cancel_subscription"), 1);
    }

    #[tokio::test]
    async fn completed_lease_cannot_be_cancelled() {
        let f = fixture();
        let mut sub = test_subscription("user-1", "sub_1");
        sub.status = SubscriptionStatus::Completed;
        seed(&f.store, &sub).await;

        let err = f.handler.handle(command("user-1", &sub)).await.unwrap_err();

        assert!(matches!(err, LeaseError::InvalidState { .. }));
        assert!(!f.provider.was_called("cancel_subscription"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn processor_failure_leaves_lease_active() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;
        f.provider
            .set_method_error("cancel_subscription", PaymentError::network("unreachable"));

        let err = f.handler.handle(command("user-1", &sub)).await.unwrap_err();

        assert!(matches!(err, LeaseError::PaymentProcessor { retryable: true, .. }));
        let stored = f.store.find_by_id(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn storage_failure_after_processor_is_retryable() {
        let f = fixture();
        let sub = test_subscription("user-1", "sub_1");
        seed(&f.store, &sub).await;
        f.store.set_fail_writes(true);

        let err = f.handler.handle(command("user-1", &sub)).await.unwrap_err();

        assert!(matches!(err, LeaseError::Infrastructure(_)));
        assert!(err.is_retryable());
    }
}
