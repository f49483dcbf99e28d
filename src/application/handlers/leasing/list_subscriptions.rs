//! ListSubscriptionsHandler - Query handler for a user's leases.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::leasing::{LeaseError, Subscription};
use crate::ports::SubscriptionRepository;

/// Query for the caller's subscriptions.
#[derive(Debug, Clone)]
pub struct ListSubscriptionsQuery {
    pub user_id: UserId,
}

/// Handler for listing subscriptions, newest first.
pub struct ListSubscriptionsHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl ListSubscriptionsHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    pub async fn handle(&self, query: ListSubscriptionsQuery) -> Result<Vec<Subscription>, LeaseError> {
        Ok(self.subscriptions.list_by_user(&query.user_id).await?)
    }
}
