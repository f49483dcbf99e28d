//! ListTransactionsHandler - Query handler for a user's payment history.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::leasing::{LeaseError, PaymentTransaction};
use crate::ports::TransactionRepository;

/// Query for the caller's payment transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsQuery {
    pub user_id: UserId,
}

pub struct ListTransactionsHandler {
    transactions: Arc<dyn TransactionRepository>,
}

impl ListTransactionsHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn handle(
        &self,
        query: ListTransactionsQuery,
    ) -> Result<Vec<PaymentTransaction>, LeaseError> {
        Ok(self.transactions.list_by_user(&query.user_id).await?)
    }
}
