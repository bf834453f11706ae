use crate::models::{Holding, HoldingRef};
use crate::repositories::{HoldingStore, RepositoryResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const HOLDING_COLUMNS: &str =
    "id, user_id, symbol, quantity, avg_price, country, created_at, updated_at";

/// Repository for holding data access
pub struct HoldingRepository {
    pool: PgPool,
}

impl HoldingRepository {
    /// Create a new HoldingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoldingStore for HoldingRepository {
    async fn list_symbol_country(&self) -> RepositoryResult<Vec<HoldingRef>> {
        let rows = sqlx::query_as::<_, HoldingRef>(
            r#"
            SELECT symbol, country
            FROM holdings
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        let rows = sqlx::query_as::<_, Holding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM holdings WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert(&self, holding: &Holding) -> RepositoryResult<Holding> {
        let row = sqlx::query_as::<_, Holding>(&format!(
            r#"
            INSERT INTO holdings (id, user_id, symbol, quantity, avg_price, country, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {HOLDING_COLUMNS}
            "#
        ))
        .bind(holding.id)
        .bind(holding.user_id)
        .bind(&holding.symbol)
        .bind(holding.quantity)
        .bind(holding.avg_price)
        .bind(&holding.country)
        .bind(holding.created_at)
        .bind(holding.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(
        &self,
        user_id: Uuid,
        symbol: &str,
        country: &str,
        quantity: Option<Decimal>,
        avg_price: Option<Decimal>,
    ) -> RepositoryResult<Option<Holding>> {
        let row = sqlx::query_as::<_, Holding>(&format!(
            r#"
            UPDATE holdings
            SET quantity = COALESCE($4, quantity),
                avg_price = COALESCE($5, avg_price),
                updated_at = NOW()
            WHERE user_id = $1 AND symbol = $2 AND country = $3
            RETURNING {HOLDING_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(symbol)
        .bind(country)
        .bind(quantity)
        .bind(avg_price)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_by_symbol(&self, user_id: Uuid, symbol: &str) -> RepositoryResult<u64> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM holdings
            WHERE user_id = $1 AND symbol = $2
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
