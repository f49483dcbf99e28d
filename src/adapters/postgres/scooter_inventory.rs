//! PostgreSQL implementation of ScooterInventory.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ScooterId};
use crate::domain::leasing::{PlanId, Scooter};
use crate::ports::ScooterInventory;

pub struct PostgresScooterInventory {
    pool: PgPool,
}

impl PostgresScooterInventory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScooterRow {
    id: Uuid,
    title: String,
    plan_type: String,
    is_available: bool,
}

impl TryFrom<ScooterRow> for Scooter {
    type Error = DomainError;

    fn try_from(row: ScooterRow) -> Result<Self, Self::Error> {
        let plan_id: PlanId = row
            .plan_type
            .parse()
            .map_err(|_| DomainError::database(format!("Invalid plan_type: {}", row.plan_type)))?;
        Ok(Scooter {
            id: ScooterId::from_uuid(row.id),
            title: row.title,
            plan_id,
            is_available: row.is_available,
        })
    }
}

#[async_trait]
impl ScooterInventory for PostgresScooterInventory {
    async fn find_scooter(&self, id: &ScooterId) -> Result<Option<Scooter>, DomainError> {
        let row: Option<ScooterRow> = sqlx::query_as(
            "SELECT id, title, plan_type, is_available FROM scooters WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch scooter: {}", e)))?;

        row.map(Scooter::try_from).transpose()
    }
}
