//! PostgreSQL implementation of CustomerProfileRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::leasing::CustomerProfile;
use crate::ports::CustomerProfileRepository;

pub struct PostgresCustomerProfileRepository {
    pool: PgPool,
}

impl PostgresCustomerProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
    stripe_customer_id: Option<String>,
}

impl TryFrom<ProfileRow> for CustomerProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(CustomerProfile {
            user_id: UserId::new(row.id)
                .map_err(|e| DomainError::database(format!("Invalid profile id: {}", e)))?,
            email: row.email,
            full_name: row.full_name,
            billing_customer_id: row.stripe_customer_id,
        })
    }
}

#[async_trait]
impl CustomerProfileRepository for PostgresCustomerProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<CustomerProfile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, email, full_name, stripe_customer_id FROM profiles WHERE id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch profile: {}", e)))?;

        row.map(CustomerProfile::try_from).transpose()
    }

    async fn find_user_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE stripe_customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to look up customer: {}", e)))?;

        id.map(|id| {
            UserId::new(id).map_err(|e| DomainError::database(format!("Invalid profile id: {}", e)))
        })
        .transpose()
    }

    async fn attach_billing_customer(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<String, DomainError> {
        // Set-if-empty: a concurrent first checkout keeps whichever id landed first.
        let attached: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO profiles (id, stripe_customer_id)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
                SET stripe_customer_id = COALESCE(profiles.stripe_customer_id, EXCLUDED.stripe_customer_id),
                    updated_at = NOW()
            RETURNING stripe_customer_id
            "#,
        )
        .bind(user_id.as_str())
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to attach customer: {}", e)))?;

        attached.ok_or_else(|| DomainError::database("Customer reference not stored"))
    }
}
