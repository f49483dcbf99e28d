//! Subscription repository port.
//!
//! Written only by webhook reconciliation and owner cancellation; read by
//! the dashboard queries.
//!
//! # Design
//!
//! - **Unique external id**: at most one row per processor subscription
//! - **Atomic activation**: subscription insert and scooter reservation
//!   commit together, or not at all
//! - **Optimistic cancel**: the status write only applies if the row is
//!   not already cancelled

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::leasing::Subscription;

use super::SaveResult;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Persist a newly confirmed lease in one unit of work.
    ///
    /// - inserts the subscription unless one exists for its external id
    /// - marks its scooter unavailable
    /// - links payment transactions recorded earlier for the same
    ///   external subscription id
    ///
    /// Returns `AlreadyExists` (and changes nothing) on a duplicate.
    async fn create_with_reservation(
        &self,
        subscription: &Subscription,
    ) -> Result<SaveResult, DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All subscriptions of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError>;

    /// Store the cancellation carried by `subscription`.
    ///
    /// Returns `false` when the stored row was already cancelled.
    async fn mark_cancelled(&self, subscription: &Subscription) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
