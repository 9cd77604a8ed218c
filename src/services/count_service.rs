// src/services/count_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{movement_repo::NewMovement, stock_repo::BalanceKey, CountRepository, MovementRepository, StockRepository},
    models::{
        auth::User,
        count::{CountFilter, InventoryCount},
        movement::{MovementKind, StockOperationResult},
        stock::StockLocation,
    },
    services::{
        product_service::ProductService,
        stock_service::resolve_address,
        validation::ensure_not_negative,
    },
};

#[derive(Debug, Clone)]
pub struct CountRequest {
    pub ean: String,
    pub expiration_date: NaiveDate,
    pub location: StockLocation,
    pub address: Option<String>,
    pub counted_quantity: i32,
}

#[derive(Debug, Clone)]
pub struct ApplyCountRequest {
    pub ean: String,
    pub expiration_date: NaiveDate,
    pub location: StockLocation,
    pub address: Option<String>,
}

/// Diferença a lançar para o saldo bater com a contagem.
pub fn adjustment_delta(system_quantity: i32, counted_quantity: i32) -> i32 {
    counted_quantity - system_quantity
}

#[derive(Clone)]
pub struct CountService {
    pool: PgPool,
    product_service: ProductService,
    stock_repo: StockRepository,
    movement_repo: MovementRepository,
    count_repo: CountRepository,
}

impl CountService {
    pub fn new(
        pool: PgPool,
        product_service: ProductService,
        stock_repo: StockRepository,
        movement_repo: MovementRepository,
        count_repo: CountRepository,
    ) -> Self {
        Self { pool, product_service, stock_repo, movement_repo, count_repo }
    }

    pub async fn list_counts(&self, filter: &CountFilter) -> Result<Vec<InventoryCount>, AppError> {
        self.count_repo.list(filter).await
    }

    pub async fn register_count(&self, req: CountRequest, actor: &User) -> Result<InventoryCount, AppError> {
        let counted = ensure_not_negative(req.counted_quantity)?;
        let address = resolve_address(req.address.as_deref());

        let mut tx = self.pool.begin().await?;

        let product = self.product_service.find_by_ean(&mut *tx, &req.ean).await?;
        let key = BalanceKey {
            product_id: product.id,
            location: req.location,
            expiration_date: req.expiration_date,
            address: &address,
        };

        // Numeração serializada pela chave; o saldo travado dá a quantidade do sistema
        self.count_repo.lock_key(&mut *tx, key).await?;
        let system_quantity = self.stock_repo
            .get_balance_for_update(&mut *tx, key)
            .await?
            .map(|b| b.quantity)
            .unwrap_or(0);

        let count = self.count_repo
            .insert(&mut *tx, key, &product.ean, counted, system_quantity, Some(actor.id), Some(&actor.email))
            .await?;

        tx.commit().await?;

        tracing::info!(
            "🧮 Contagem #{} do EAN {}: contado {}, sistema {}, diferença {}.",
            count.count_number, count.ean, count.counted_quantity, count.system_quantity, count.difference()
        );
        Ok(count)
    }

    /// Ajusta o saldo para a última contagem registrada.
    pub async fn apply_latest_count(&self, req: ApplyCountRequest, actor: &User) -> Result<StockOperationResult, AppError> {
        let address = resolve_address(req.address.as_deref());

        let mut tx = self.pool.begin().await?;

        let product = self.product_service.find_by_ean(&mut *tx, &req.ean).await?;
        let key = BalanceKey {
            product_id: product.id,
            location: req.location,
            expiration_date: req.expiration_date,
            address: &address,
        };

        let current = self.stock_repo.get_balance_for_update(&mut *tx, key).await?;
        let latest = self.count_repo
            .latest(&mut *tx, key)
            .await?
            .ok_or(AppError::CountNotFound)?;

        let system_quantity = current.as_ref().map(|b| b.quantity).unwrap_or(0);
        let delta = adjustment_delta(system_quantity, latest.counted_quantity);

        let balance = match current {
            Some(balance) => self.stock_repo.set_quantity(&mut *tx, balance.id, latest.counted_quantity).await?,
            None => self.stock_repo.add_to_balance(&mut *tx, key, None, latest.counted_quantity).await?,
        };

        let notes = format!("Ajuste pela contagem #{}", latest.count_number);
        let movement = self.movement_repo
            .record(&mut *tx, NewMovement {
                product_id: product.id,
                ean: &product.ean,
                location: req.location,
                kind: MovementKind::Adjustment,
                quantity_changed: delta,
                balance_after: balance.quantity,
                expiration_date: req.expiration_date,
                batch: balance.batch.as_deref(),
                address: &address,
                user_id: Some(actor.id),
                user_email: Some(&actor.email),
                notes: Some(&notes),
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            "🛠️ Saldo do EAN {} ajustado para {} (diferença {}).",
            product.ean, balance.quantity, delta
        );
        Ok(StockOperationResult { balance, movement })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{ProductRepository, UserRepository},
        services::stock_service::{EntryRequest, StockService},
    };

    #[test]
    fn delta_is_signed_difference() {
        assert_eq!(adjustment_delta(10, 7), -3);
        assert_eq!(adjustment_delta(0, 4), 4);
        assert_eq!(adjustment_delta(5, 5), 0);
    }

    const EAN: &str = "7891000100103";

    struct Fixture {
        counts: CountService,
        stock: StockService,
        user: User,
    }

    async fn fixture(pool: &PgPool) -> Fixture {
        let product_service = ProductService::new(ProductRepository::new(pool.clone()));
        let stock_repo = StockRepository::new(pool.clone());
        let movement_repo = MovementRepository::new(pool.clone());
        let user = UserRepository::new(pool.clone())
            .create_user(pool, "Conferente", "conferente@exemplo.com", "hash", false)
            .await
            .unwrap();

        Fixture {
            counts: CountService::new(
                pool.clone(),
                product_service.clone(),
                stock_repo.clone(),
                movement_repo.clone(),
                CountRepository::new(pool.clone()),
            ),
            stock: StockService::new(pool.clone(), product_service, stock_repo, movement_repo),
            user,
        }
    }

    fn expiration() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 31).unwrap()
    }

    fn count(counted_quantity: i32) -> CountRequest {
        CountRequest {
            ean: EAN.into(),
            expiration_date: expiration(),
            location: StockLocation::Warehouse,
            address: None,
            counted_quantity,
        }
    }

    fn apply() -> ApplyCountRequest {
        ApplyCountRequest {
            ean: EAN.into(),
            expiration_date: expiration(),
            location: StockLocation::Warehouse,
            address: None,
        }
    }

    async fn stock_in(fx: &Fixture, quantity: i32) {
        fx.stock
            .register_entry(EntryRequest {
                ean: EAN.into(),
                expiration_date: expiration(),
                quantity,
                location: StockLocation::Warehouse,
                batch: None,
                address: None,
                description: Some("café torrado".into()),
                brand: Some("pilão".into()),
            }, &fx.user)
            .await
            .unwrap();
    }

    #[sqlx::test]
    async fn counts_are_numbered_with_system_snapshot(pool: PgPool) {
        let fx = fixture(&pool).await;
        stock_in(&fx, 10).await;

        let first = fx.counts.register_count(count(8), &fx.user).await.unwrap();
        let second = fx.counts.register_count(count(9), &fx.user).await.unwrap();

        assert_eq!((first.count_number, second.count_number), (1, 2));
        assert_eq!(first.system_quantity, 10);
        assert_eq!(first.difference(), -2);
        assert_eq!(second.user_email.as_deref(), Some("conferente@exemplo.com"));
    }

    #[sqlx::test]
    async fn applying_latest_count_records_signed_adjustment(pool: PgPool) {
        let fx = fixture(&pool).await;
        stock_in(&fx, 10).await;
        fx.counts.register_count(count(12), &fx.user).await.unwrap();
        fx.counts.register_count(count(7), &fx.user).await.unwrap();

        let result = fx.counts.apply_latest_count(apply(), &fx.user).await.unwrap();

        assert_eq!(result.balance.quantity, 7);
        assert_eq!(result.movement.kind, MovementKind::Adjustment);
        assert_eq!(result.movement.quantity_changed, -3);
        assert_eq!(result.movement.balance_after, 7);
        assert_eq!(result.movement.notes.as_deref(), Some("Ajuste pela contagem #2"));
    }

    #[sqlx::test]
    async fn applying_without_count_fails(pool: PgPool) {
        let fx = fixture(&pool).await;
        stock_in(&fx, 10).await;

        let result = fx.counts.apply_latest_count(apply(), &fx.user).await;
        assert!(matches!(result, Err(AppError::CountNotFound)));
    }

    #[sqlx::test]
    async fn concurrent_counts_without_balance_get_distinct_numbers(pool: PgPool) {
        let fx = fixture(&pool).await;
        fx.counts.product_service
            .create_product(&pool, EAN, "Café torrado", "Pilão")
            .await
            .unwrap();

        let handles: Vec<_> = (1..=5)
            .map(|counted| {
                let counts = fx.counts.clone();
                let user = fx.user.clone();
                tokio::spawn(async move { counts.register_count(count(counted), &user).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            let registered = handle.await.unwrap().unwrap();
            assert_eq!(registered.system_quantity, 0);
            numbers.push(registered.count_number);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, [1, 2, 3, 4, 5]);
    }
}
