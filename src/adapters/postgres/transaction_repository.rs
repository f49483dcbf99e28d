//! PostgreSQL implementation of TransactionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, Money, SubscriptionId, Timestamp, TransactionId, UserId,
};
use crate::domain::leasing::{PaymentTransaction, TransactionStatus, TransactionType};
use crate::ports::{SaveResult, TransactionRepository};

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, subscription_id, stripe_subscription_id, stripe_invoice_id,
           stripe_payment_intent_id, amount_cents, transaction_type, status, description,
           created_at, updated_at
    FROM payment_transactions
"#;

pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    subscription_id: Option<Uuid>,
    stripe_subscription_id: Option<String>,
    stripe_invoice_id: Option<String>,
    stripe_payment_intent_id: Option<String>,
    amount_cents: i64,
    transaction_type: String,
    status: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::parse(&row.transaction_type).ok_or_else(|| {
            DomainError::database(format!("Invalid transaction_type: {}", row.transaction_type))
        })?;
        let status = TransactionStatus::parse(&row.status)
            .ok_or_else(|| DomainError::database(format!("Invalid status: {}", row.status)))?;

        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            external_subscription_id: row.stripe_subscription_id,
            external_invoice_id: row.stripe_invoice_id,
            external_payment_intent_id: row.stripe_payment_intent_id,
            amount: Money::from_cents(row.amount_cents),
            transaction_type,
            status,
            description: row.description,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn append(&self, transaction: &PaymentTransaction) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, user_id, subscription_id, stripe_subscription_id, stripe_invoice_id,
                stripe_payment_intent_id, amount_cents, transaction_type, status, description,
                created_at, updated_at
            ) VALUES (
                $1, $2,
                COALESCE($3, (SELECT id FROM subscriptions WHERE stripe_subscription_id = $4)),
                $4, $5, $6, $7, $8, $9, $10, $11, $12
            )
            ON CONFLICT (stripe_invoice_id) DO NOTHING
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.user_id.as_str())
        .bind(transaction.subscription_id.map(|id| *id.as_uuid()))
        .bind(&transaction.external_subscription_id)
        .bind(&transaction.external_invoice_id)
        .bind(&transaction.external_payment_intent_id)
        .bind(transaction.amount.cents())
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.status.as_str())
        .bind(&transaction.description)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append transaction: {}", e)))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentTransaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list transactions: {}", e)))?;

        rows.into_iter().map(PaymentTransaction::try_from).collect()
    }

    async fn list_by_external_subscription(
        &self,
        external_subscription_id: &str,
    ) -> Result<Vec<PaymentTransaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{} WHERE stripe_subscription_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(external_subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list transactions: {}", e)))?;

        rows.into_iter().map(PaymentTransaction::try_from).collect()
    }
}
