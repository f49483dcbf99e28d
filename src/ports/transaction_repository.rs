//! Payment transaction repository port (append-only log).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::leasing::PaymentTransaction;

use super::SaveResult;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Append a transaction.
    ///
    /// A second transaction for the same external invoice id is not
    /// stored and yields `AlreadyExists`. An unlinked transaction whose
    /// external subscription is already stored is linked on insert.
    async fn append(&self, transaction: &PaymentTransaction) -> Result<SaveResult, DomainError>;

    /// All transactions of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentTransaction>, DomainError>;

    async fn list_by_external_subscription(
        &self,
        external_subscription_id: &str,
    ) -> Result<Vec<PaymentTransaction>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn TransactionRepository) {}
    }
}
