//! Customer profile port: the billing customer reference cache.
//!
//! Each user maps to at most one processor customer. The reference is
//! written once, on the first checkout, with a set-if-empty update.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::leasing::CustomerProfile;

#[async_trait]
pub trait CustomerProfileRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<CustomerProfile>, DomainError>;

    /// Reverse lookup from processor customer id to local user.
    async fn find_user_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError>;

    /// Attach `customer_id` unless the user already has one.
    ///
    /// Returns the reference now on the profile, which is the existing one
    /// if a concurrent checkout attached first. Creates the profile row if
    /// the user has none yet.
    async fn attach_billing_customer(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<String, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_profile_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn CustomerProfileRepository) {}
    }
}
