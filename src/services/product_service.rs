// src/services/product_service.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::product::{Product, ProductFilter, RegistrationOutcome},
    services::validation::{normalize_ean, optional_text, require_non_empty},
};

#[derive(Clone)]
pub struct ProductService {
    product_repo: ProductRepository,
}

impl ProductService {
    pub fn new(product_repo: ProductRepository) -> Self {
        Self { product_repo }
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        self.product_repo.list(filter).await
    }

    pub async fn find_by_ean<'e, E>(&self, executor: E, raw_ean: &str) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ean = normalize_ean(raw_ean)?;
        self.product_repo
            .find_by_ean(executor, &ean)
            .await?
            .ok_or(AppError::ProductNotFound(ean))
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        raw_ean: &str,
        description: &str,
        brand: &str,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ean = normalize_ean(raw_ean)?;
        let description = require_non_empty("descricao", description)?;
        let brand = require_non_empty("marca", brand)?;

        let product = self.product_repo.create(executor, &ean, description, brand).await?;
        tracing::info!("🆕 Produto {} cadastrado ({}).", product.ean, product.description);
        Ok(product)
    }

    pub async fn update_product(&self, raw_ean: &str, description: &str, brand: &str) -> Result<Product, AppError> {
        let ean = normalize_ean(raw_ean)?;
        let description = require_non_empty("descricao", description)?;
        let brand = require_non_empty("marca", brand)?;

        self.product_repo
            .update(&ean, description, brand)
            .await?
            .ok_or(AppError::ProductNotFound(ean))
    }

    /// Devolve o produto existente ou faz o cadastro dinâmico, se houver descrição e marca.
    pub async fn get_or_register(
        &self,
        conn: &mut sqlx::PgConnection,
        raw_ean: &str,
        description: Option<&str>,
        brand: Option<&str>,
    ) -> Result<(Product, RegistrationOutcome), AppError> {
        let ean = normalize_ean(raw_ean)?;

        if let Some(product) = self.product_repo.find_by_ean(&mut *conn, &ean).await? {
            return Ok((product, RegistrationOutcome::Existing));
        }

        match (optional_text(description), optional_text(brand)) {
            (Some(description), Some(brand)) => {
                let inserted = self.product_repo
                    .insert_if_absent(&mut *conn, &ean, &description, &brand)
                    .await?;

                match inserted {
                    Some(product) => {
                        tracing::info!("🆕 Cadastro dinâmico do produto {}.", product.ean);
                        Ok((product, RegistrationOutcome::Registered))
                    }
                    // Cadastro concorrente venceu: usa o produto dele
                    None => self.product_repo
                        .find_by_ean(&mut *conn, &ean)
                        .await?
                        .map(|product| (product, RegistrationOutcome::Existing))
                        .ok_or(AppError::ProductNotFound(ean)),
                }
            }
            _ => Err(AppError::ProductNotFoundIncomplete(ean)),
        }
    }
}
