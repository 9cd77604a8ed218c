// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{CountRepository, MovementRepository, ProductRepository, StockRepository, UserRepository},
    services::{
        auth::AuthService, count_service::CountService, import_service::ImportService,
        movement_service::MovementService, product_service::ProductService, stock_service::StockService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_JWT_EXPIRATION_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub jwt_expiration_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Separado do `from_env` para poder testar sem mexer no ambiente do processo
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().context("DB_MAX_CONNECTIONS deve ser um número inteiro")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let jwt_expiration_days = match lookup("JWT_EXPIRATION_DAYS") {
            Some(raw) => raw.parse::<i64>().context("JWT_EXPIRATION_DAYS deve ser um número inteiro")?,
            None => DEFAULT_JWT_EXPIRATION_DAYS,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            db_max_connections,
            jwt_expiration_days,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub product_service: ProductService,
    pub stock_service: StockService,
    pub count_service: CountService,
    pub movement_service: MovementService,
    pub import_service: ImportService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, config: &Config) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let stock_repo = StockRepository::new(db_pool.clone());
        let movement_repo = MovementRepository::new(db_pool.clone());
        let count_repo = CountRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, config.jwt_secret.clone(), config.jwt_expiration_days);
        let product_service = ProductService::new(product_repo);
        let stock_service = StockService::new(
            db_pool.clone(),
            product_service.clone(),
            stock_repo.clone(),
            movement_repo.clone(),
        );
        let count_service = CountService::new(
            db_pool.clone(),
            product_service.clone(),
            stock_repo,
            movement_repo.clone(),
            count_repo,
        );
        let movement_service = MovementService::new(movement_repo);
        let import_service = ImportService::new(db_pool.clone(), product_service.clone(), stock_service.clone());

        Self {
            db_pool,
            auth_service,
            product_service,
            stock_service,
            count_service,
            movement_service,
            import_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/estoque"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.jwt_expiration_days, 7);
    }

    #[test]
    fn requires_jwt_secret() {
        let result = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/estoque")]));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_numeric_pool_size() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/estoque"),
            ("JWT_SECRET", "segredo"),
            ("DB_MAX_CONNECTIONS", "muitas"),
        ]));
        assert!(result.is_err());
    }
}
