// src/db/count_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stock_repo::BalanceKey,
    models::count::{CountFilter, InventoryCount},
};

#[derive(Clone)]
pub struct CountRepository {
    pool: PgPool,
}

impl CountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &CountFilter) -> Result<Vec<InventoryCount>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM inventory_counts WHERE TRUE");

        if let Some(ean) = filter.ean.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND ean = ").push_bind(ean.to_string());
        }
        if let Some(expiration) = filter.expiration_date {
            qb.push(" AND expiration_date = ").push_bind(expiration);
        }
        if let Some(location) = filter.location {
            qb.push(" AND location = ").push_bind(location);
        }
        qb.push(" ORDER BY ean ASC, expiration_date ASC, count_number ASC");

        let counts = qb.build_query_as::<InventoryCount>().fetch_all(&self.pool).await?;
        Ok(counts)
    }

    pub async fn latest<'e, E>(&self, executor: E, key: BalanceKey<'_>) -> Result<Option<InventoryCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_as::<_, InventoryCount>(
            r#"
            SELECT * FROM inventory_counts
            WHERE product_id = $1 AND location = $2 AND expiration_date = $3 AND address = $4
            ORDER BY count_number DESC
            LIMIT 1
            "#,
        )
        .bind(key.product_id)
        .bind(key.location)
        .bind(key.expiration_date)
        .bind(key.address)
        .fetch_optional(executor)
        .await?;
        Ok(count)
    }

    /// Trava a chave da contagem até o fim da transação, exista ou não a linha do saldo.
    pub async fn lock_key<'e, E>(&self, executor: E, key: BalanceKey<'_>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lock_name = format!(
            "contagem:{}:{:?}:{}:{}",
            key.product_id, key.location, key.expiration_date, key.address
        );
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(lock_name)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Grava a contagem com o próximo número da sequência daquele saldo.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        key: BalanceKey<'_>,
        ean: &str,
        counted_quantity: i32,
        system_quantity: i32,
        user_id: Option<Uuid>,
        user_email: Option<&str>,
    ) -> Result<InventoryCount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_as::<_, InventoryCount>(
            r#"
            INSERT INTO inventory_counts (
                product_id, ean, location, expiration_date, address,
                count_number, counted_quantity, system_quantity, user_id, user_email
            )
            SELECT $1, $2, $3, $4, $5,
                   COALESCE(MAX(c.count_number), 0) + 1, $6, $7, $8, $9
            FROM inventory_counts c
            WHERE c.product_id = $1 AND c.location = $3 AND c.expiration_date = $4 AND c.address = $5
            RETURNING *
            "#,
        )
        .bind(key.product_id)
        .bind(ean)
        .bind(key.location)
        .bind(key.expiration_date)
        .bind(key.address)
        .bind(counted_quantity)
        .bind(system_quantity)
        .bind(user_id)
        .bind(user_email)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }
}
