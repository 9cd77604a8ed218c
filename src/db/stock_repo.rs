// src/db/stock_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        product::ProductFilter,
        stock::{ConsolidatedBalance, StockBalance, StockBalanceView, StockFilter, StockLocation},
    },
};

const BALANCE_VIEW_SELECT: &str = r#"
    SELECT b.id, b.product_id, p.ean, p.description, p.brand, b.location,
           b.expiration_date, b.address, b.batch, b.quantity, b.updated_at
    FROM stock_balances b
    JOIN products p ON p.id = b.product_id
    WHERE TRUE"#;

// Chave do saldo: produto + local + validade + endereço
#[derive(Debug, Clone, Copy)]
pub struct BalanceKey<'a> {
    pub product_id: Uuid,
    pub location: StockLocation,
    pub expiration_date: NaiveDate,
    pub address: &'a str,
}

#[derive(Clone)]
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn list_balances(&self, filter: &StockFilter) -> Result<Vec<StockBalanceView>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(BALANCE_VIEW_SELECT);

        if let Some(location) = filter.location {
            qb.push(" AND b.location = ").push_bind(location);
        }
        if let Some(ean) = filter.ean.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND p.ean = ").push_bind(ean.to_string());
        }
        if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND p.brand ILIKE ").push_bind(format!("%{}%", brand));
        }
        if let Some(expiration) = filter.expiration_date {
            qb.push(" AND b.expiration_date = ").push_bind(expiration);
        }
        if filter.only_positive {
            qb.push(" AND b.quantity > 0");
        }
        qb.push(" ORDER BY b.expiration_date ASC, p.description ASC");

        let balances = qb.build_query_as::<StockBalanceView>().fetch_all(&self.pool).await?;
        Ok(balances)
    }

    pub async fn consolidated(&self, filter: &ProductFilter) -> Result<Vec<ConsolidatedBalance>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT p.id AS product_id, p.ean, p.description, p.brand,
                   COALESCE(SUM(b.quantity) FILTER (WHERE b.location = 'WAREHOUSE'), 0)::BIGINT AS warehouse_quantity,
                   COALESCE(SUM(b.quantity) FILTER (WHERE b.location = 'STORE'), 0)::BIGINT AS store_quantity,
                   COALESCE(SUM(b.quantity), 0)::BIGINT AS total_quantity
            FROM products p
            JOIN stock_balances b ON b.product_id = p.id
            WHERE TRUE"#,
        );

        if let Some(ean) = filter.ean.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND p.ean ILIKE ").push_bind(format!("%{}%", ean));
        }
        if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND p.brand ILIKE ").push_bind(format!("%{}%", brand));
        }
        if let Some(desc) = filter.description.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND p.description ILIKE ").push_bind(format!("%{}%", desc));
        }
        qb.push(
            r#"
            GROUP BY p.id, p.ean, p.description, p.brand
            HAVING COALESCE(SUM(b.quantity), 0) > 0
            ORDER BY p.description ASC"#,
        );

        let rows = qb.build_query_as::<ConsolidatedBalance>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // ---
    // Funções de "Escrita" (Transacionais)
    // ---

    /// Trava a linha do saldo até o fim da transação.
    pub async fn get_balance_for_update<'e, E>(
        &self,
        executor: E,
        key: BalanceKey<'_>,
    ) -> Result<Option<StockBalance>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let balance = sqlx::query_as::<_, StockBalance>(
            r#"
            SELECT * FROM stock_balances
            WHERE product_id = $1 AND location = $2 AND expiration_date = $3 AND address = $4
            FOR UPDATE
            "#,
        )
        .bind(key.product_id)
        .bind(key.location)
        .bind(key.expiration_date)
        .bind(key.address)
        .fetch_optional(executor)
        .await?;
        Ok(balance)
    }

    /// Garante que a linha do saldo exista (quantidade zero se nova), sem travá-la.
    pub async fn ensure_balance_row<'e, E>(&self, executor: E, key: BalanceKey<'_>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO stock_balances (product_id, location, expiration_date, address, quantity)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT (product_id, location, expiration_date, address) DO NOTHING
            "#,
        )
        .bind(key.product_id)
        .bind(key.location)
        .bind(key.expiration_date)
        .bind(key.address)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Trava origem e destino de uma transferência num único SELECT,
    /// sempre na ordem (local, endereço). As duas chaves compartilham produto e validade.
    pub async fn lock_transfer_pair<'e, E>(
        &self,
        executor: E,
        origin: BalanceKey<'_>,
        destination: BalanceKey<'_>,
    ) -> Result<Vec<StockBalance>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let balances = sqlx::query_as::<_, StockBalance>(
            r#"
            SELECT * FROM stock_balances
            WHERE product_id = $1 AND expiration_date = $2
              AND ((location = $3 AND address = $4) OR (location = $5 AND address = $6))
            ORDER BY location, address
            FOR UPDATE
            "#,
        )
        .bind(origin.product_id)
        .bind(origin.expiration_date)
        .bind(origin.location)
        .bind(origin.address)
        .bind(destination.location)
        .bind(destination.address)
        .fetch_all(executor)
        .await?;
        Ok(balances)
    }

    /// Menor validade anterior a `before` que ainda tem saldo no mesmo local.
    pub async fn earliest_pending_expiration<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        location: StockLocation,
        before: NaiveDate,
    ) -> Result<Option<NaiveDate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let earliest: Option<NaiveDate> = sqlx::query_scalar(
            r#"
            SELECT MIN(expiration_date) FROM stock_balances
            WHERE product_id = $1 AND location = $2 AND expiration_date < $3 AND quantity > 0
            "#,
        )
        .bind(product_id)
        .bind(location)
        .bind(before)
        .fetch_one(executor)
        .await?;
        Ok(earliest)
    }

    /// UPSERT atômico: cria o saldo ou soma à quantidade existente.
    pub async fn add_to_balance<'e, E>(
        &self,
        executor: E,
        key: BalanceKey<'_>,
        batch: Option<&str>,
        quantity: i32,
    ) -> Result<StockBalance, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let balance = sqlx::query_as::<_, StockBalance>(
            r#"
            INSERT INTO stock_balances (product_id, location, expiration_date, address, batch, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id, location, expiration_date, address)
            DO UPDATE SET
                quantity = stock_balances.quantity + EXCLUDED.quantity,
                batch = COALESCE(EXCLUDED.batch, stock_balances.batch),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(key.product_id)
        .bind(key.location)
        .bind(key.expiration_date)
        .bind(key.address)
        .bind(batch)
        .bind(quantity)
        .fetch_one(executor)
        .await?;
        Ok(balance)
    }

    pub async fn set_quantity<'e, E>(
        &self,
        executor: E,
        balance_id: Uuid,
        quantity: i32,
    ) -> Result<StockBalance, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let balance = sqlx::query_as::<_, StockBalance>(
            r#"
            UPDATE stock_balances
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(balance_id)
        .bind(quantity)
        .fetch_one(executor)
        .await?;
        Ok(balance)
    }
}
