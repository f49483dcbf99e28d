//! Scooter inventory read port.
//!
//! Availability is flipped by [`super::SubscriptionRepository`] inside the
//! activation unit of work, never through this port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ScooterId};
use crate::domain::leasing::Scooter;

#[async_trait]
pub trait ScooterInventory: Send + Sync {
    async fn find_scooter(&self, id: &ScooterId) -> Result<Option<Scooter>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scooter_inventory_is_object_safe() {
        fn _accepts_dyn(_inventory: &dyn ScooterInventory) {}
    }
}
