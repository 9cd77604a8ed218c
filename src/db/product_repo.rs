// src/db/product_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    models::product::{Product, ProductFilter},
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_ean<'e, E>(&self, executor: E, ean: &str) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE ean = $1")
            .bind(ean)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products WHERE TRUE");

        if let Some(ean) = filter.ean.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND ean = ").push_bind(ean.to_string());
        }
        if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND brand ILIKE ").push_bind(format!("%{}%", brand));
        }
        if let Some(desc) = filter.description.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND description ILIKE ").push_bind(format!("%{}%", desc));
        }
        qb.push(" ORDER BY description ASC");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Cadastra um produto. EAN duplicado vira `ProductAlreadyExists`.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        ean: &str,
        description: &str,
        brand: &str,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (ean, description, brand)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(ean)
        .bind(description)
        .bind(brand)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::ProductAlreadyExists(ean.to_string());
                }
            }
            e.into()
        })
    }

    /// Cadastra se o EAN ainda não existir. `None` quando outro cadastro chegou antes.
    pub async fn insert_if_absent<'e, E>(
        &self,
        executor: E,
        ean: &str,
        description: &str,
        brand: &str,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (ean, description, brand)
            VALUES ($1, $2, $3)
            ON CONFLICT (ean) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(ean)
        .bind(description)
        .bind(brand)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    pub async fn update(
        &self,
        ean: &str,
        description: &str,
        brand: &str,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET description = $2, brand = $3, updated_at = NOW()
            WHERE ean = $1
            RETURNING *
            "#,
        )
        .bind(ean)
        .bind(description)
        .bind(brand)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }
}
