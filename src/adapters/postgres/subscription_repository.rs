//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Activation runs as one transaction: the subscription insert, the
//! scooter reservation, and the back-fill of payments recorded before the
//! subscription existed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, Money, ScooterId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::leasing::{LockTier, PlanId, Semester, Subscription, SubscriptionStatus};
use crate::ports::{SaveResult, SubscriptionRepository};

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, scooter_id, plan_type, stripe_subscription_id, stripe_customer_id,
           status, semester, monthly_price_cents, security_deposit_cents, include_insurance,
           lock_type, delivery_address, contact_number, delivery_date, delivery_time,
           lease_start_date, lease_end_date, created_at, updated_at, cancelled_at
    FROM subscriptions
"#;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    scooter_id: Option<Uuid>,
    plan_type: String,
    stripe_subscription_id: String,
    stripe_customer_id: Option<String>,
    status: String,
    semester: String,
    monthly_price_cents: i64,
    security_deposit_cents: i64,
    include_insurance: bool,
    lock_type: String,
    delivery_address: Option<String>,
    contact_number: Option<String>,
    delivery_date: Option<NaiveDate>,
    delivery_time: Option<String>,
    lease_start_date: NaiveDate,
    lease_end_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let plan_id: PlanId = row
            .plan_type
            .parse()
            .map_err(|_| invalid_column("plan_type", &row.plan_type))?;
        let status = SubscriptionStatus::parse(&row.status)
            .ok_or_else(|| invalid_column("status", &row.status))?;
        let semester = Semester::parse(&row.semester)
            .ok_or_else(|| invalid_column("semester", &row.semester))?;
        let lock_tier = LockTier::parse(&row.lock_type)
            .ok_or_else(|| invalid_column("lock_type", &row.lock_type))?;
        let user_id = UserId::new(row.user_id)
            .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id,
            scooter_id: row.scooter_id.map(ScooterId::from_uuid),
            plan_id,
            external_subscription_id: row.stripe_subscription_id,
            external_customer_id: row.stripe_customer_id,
            status,
            semester,
            monthly_price: Money::from_cents(row.monthly_price_cents),
            security_deposit: Money::from_cents(row.security_deposit_cents),
            include_insurance: row.include_insurance,
            lock_tier,
            delivery_address: row.delivery_address,
            contact_number: row.contact_number,
            delivery_date: row.delivery_date,
            delivery_time: row.delivery_time,
            lease_start_date: row.lease_start_date,
            lease_end_date: row.lease_end_date,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
        })
    }
}

fn invalid_column(column: &str, value: &str) -> DomainError {
    DomainError::database(format!("Invalid {} value: {}", column, value))
        .with_detail("column", column)
}

fn db_error(context: &str, error: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, error))
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn create_with_reservation(
        &self,
        subscription: &Subscription,
    ) -> Result<SaveResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, scooter_id, plan_type, stripe_subscription_id, stripe_customer_id,
                status, semester, monthly_price_cents, security_deposit_cents, include_insurance,
                lock_type, delivery_address, contact_number, delivery_date, delivery_time,
                lease_start_date, lease_end_date, created_at, updated_at, cancelled_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            ON CONFLICT (stripe_subscription_id) DO NOTHING
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.scooter_id.map(|id| *id.as_uuid()))
        .bind(subscription.plan_id.as_str())
        .bind(&subscription.external_subscription_id)
        .bind(&subscription.external_customer_id)
        .bind(subscription.status.as_str())
        .bind(subscription.semester.as_str())
        .bind(subscription.monthly_price.cents())
        .bind(subscription.security_deposit.cents())
        .bind(subscription.include_insurance)
        .bind(subscription.lock_tier.as_str())
        .bind(&subscription.delivery_address)
        .bind(&subscription.contact_number)
        .bind(subscription.delivery_date)
        .bind(&subscription.delivery_time)
        .bind(subscription.lease_start_date)
        .bind(subscription.lease_end_date)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.cancelled_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert subscription", e))?
        .rows_affected();

        if inserted == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back", e))?;
            return Ok(SaveResult::AlreadyExists);
        }

        if let Some(scooter_id) = subscription.scooter_id {
            let reserved = sqlx::query(
                "UPDATE scooters SET is_available = FALSE WHERE id = $1 AND is_available",
            )
            .bind(scooter_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to reserve scooter", e))?
            .rows_affected();
            if reserved == 0 {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM scooters WHERE id = $1)")
                        .bind(scooter_id.as_uuid())
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(|e| db_error("Failed to look up scooter", e))?;
                if exists {
                    tracing::warn!(
                        scooter_id = %scooter_id,
                        subscription_id = %subscription.id,
                        "Leased scooter was already reserved"
                    );
                } else {
                    tracing::warn!(
                        scooter_id = %scooter_id,
                        subscription_id = %subscription.id,
                        "Leased scooter is not in inventory"
                    );
                }
            }
        }

        let linked = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET subscription_id = $1, updated_at = $2
            WHERE stripe_subscription_id = $3 AND subscription_id IS NULL
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.updated_at.as_datetime())
        .bind(&subscription.external_subscription_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to link payments", e))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit activation", e))?;

        if linked > 0 {
            tracing::info!(
                subscription_id = %subscription.id,
                linked_payments = linked,
                "Linked payments recorded before activation"
            );
        }
        Ok(SaveResult::Inserted)
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to fetch subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE stripe_subscription_id = $1",
            SELECT_COLUMNS
        ))
        .bind(external_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn mark_cancelled(&self, subscription: &Subscription) -> Result<bool, DomainError> {
        let cancelled_at = subscription
            .cancelled_at
            .ok_or_else(|| DomainError::database("Cancellation without a timestamp"))?;

        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', cancelled_at = $2, updated_at = $3
            WHERE id = $1 AND status <> 'cancelled'
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(cancelled_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to cancel subscription", e))?;

        Ok(result.rows_affected() == 1)
    }
}
