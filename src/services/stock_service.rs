// src/services/stock_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{movement_repo::NewMovement, stock_repo::BalanceKey, MovementRepository, StockRepository},
    models::{
        auth::User,
        movement::{MovementKind, StockOperationResult, TransferResult},
        product::ProductFilter,
        stock::{
            ConsolidatedBalance, ExpiryBand, ExpiryPanelEntry, StockBalanceView, StockFilter,
            StockLocation, DEFAULT_ADDRESS,
        },
    },
    services::{
        product_service::ProductService,
        validation::{ensure_positive, normalize_brand, normalize_name, optional_text},
    },
};

// Faixas do painel de validade (em dias)
pub const RED_BAND_DAYS: i64 = 90;
pub const ORANGE_BAND_DAYS: i64 = 180;

#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub ean: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub location: StockLocation,
    pub batch: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExitRequest {
    pub ean: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub location: StockLocation,
    pub batch: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub ean: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub from_location: StockLocation,
    pub from_address: Option<String>,
    pub to_location: StockLocation,
    pub to_address: Option<String>,
}

/// Endereço vazio vira o endereço padrão; sempre em maiúsculas.
pub fn resolve_address(raw: Option<&str>) -> String {
    optional_text(raw)
        .map(|a| a.to_uppercase())
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string())
}

/// Regra FEFO: não sai validade mais longa enquanto houver saldo em validade anterior.
pub fn ensure_no_earlier_pending(earliest_pending: Option<NaiveDate>) -> Result<(), AppError> {
    match earliest_pending {
        Some(date) => Err(AppError::EarlierExpirationPending(date)),
        None => Ok(()),
    }
}

/// Saldo que sobra após retirar `requested` de `available`.
pub fn remaining_after_exit(available: i32, requested: i32) -> Result<i32, AppError> {
    let requested = ensure_positive(requested)?;
    if requested > available {
        return Err(AppError::InsufficientStock { available });
    }
    Ok(available - requested)
}

pub fn classify_expiry(days_to_expire: i64) -> ExpiryBand {
    if days_to_expire <= RED_BAND_DAYS {
        ExpiryBand::Red
    } else if days_to_expire <= ORANGE_BAND_DAYS {
        ExpiryBand::Orange
    } else {
        ExpiryBand::Green
    }
}

pub fn build_expiry_panel(balances: Vec<StockBalanceView>, today: NaiveDate) -> Vec<ExpiryPanelEntry> {
    let mut panel: Vec<ExpiryPanelEntry> = balances
        .into_iter()
        .filter(|b| b.quantity > 0)
        .map(|b| {
            let days_to_expire = (b.expiration_date - today).num_days();
            ExpiryPanelEntry {
                ean: b.ean,
                description: b.description,
                brand: b.brand,
                location: b.location,
                address: b.address,
                expiration_date: b.expiration_date,
                quantity: b.quantity,
                days_to_expire,
                band: classify_expiry(days_to_expire),
            }
        })
        .collect();

    panel.sort_by(|a, b| a.days_to_expire.cmp(&b.days_to_expire).then_with(|| a.ean.cmp(&b.ean)));
    panel
}

#[derive(Clone)]
pub struct StockService {
    pool: PgPool,
    product_service: ProductService,
    stock_repo: StockRepository,
    movement_repo: MovementRepository,
}

impl StockService {
    pub fn new(
        pool: PgPool,
        product_service: ProductService,
        stock_repo: StockRepository,
        movement_repo: MovementRepository,
    ) -> Self {
        Self { pool, product_service, stock_repo, movement_repo }
    }

    pub async fn list_balances(&self, filter: &StockFilter) -> Result<Vec<StockBalanceView>, AppError> {
        self.stock_repo.list_balances(filter).await
    }

    pub async fn consolidated(&self, filter: &ProductFilter) -> Result<Vec<ConsolidatedBalance>, AppError> {
        self.stock_repo.consolidated(filter).await
    }

    pub async fn expiry_panel(
        &self,
        location: Option<StockLocation>,
        today: NaiveDate,
    ) -> Result<Vec<ExpiryPanelEntry>, AppError> {
        let filter = StockFilter { location, only_positive: true, ..Default::default() };
        let balances = self.stock_repo.list_balances(&filter).await?;
        Ok(build_expiry_panel(balances, today))
    }

    // --- ENTRADA ---
    pub async fn register_entry(&self, req: EntryRequest, actor: &User) -> Result<StockOperationResult, AppError> {
        let quantity = ensure_positive(req.quantity)?;
        let description = optional_text(req.description.as_deref()).map(|d| normalize_name(Some(&d)));
        let brand = optional_text(req.brand.as_deref()).map(|b| normalize_brand(Some(&b)));
        let batch = optional_text(req.batch.as_deref());
        let address = resolve_address(req.address.as_deref());

        let mut tx = self.pool.begin().await?;

        // 1. Produto (cadastro dinâmico se necessário)
        let (product, _) = self.product_service
            .get_or_register(&mut *tx, &req.ean, description.as_deref(), brand.as_deref())
            .await?;

        let key = BalanceKey {
            product_id: product.id,
            location: req.location,
            expiration_date: req.expiration_date,
            address: &address,
        };

        // 2. Saldo (UPSERT atômico)
        let balance = self.stock_repo
            .add_to_balance(&mut *tx, key, batch.as_deref(), quantity)
            .await?;

        // 3. Histórico
        let movement = self.movement_repo
            .record(&mut *tx, NewMovement {
                product_id: product.id,
                ean: &product.ean,
                location: req.location,
                kind: MovementKind::Entry,
                quantity_changed: quantity,
                balance_after: balance.quantity,
                expiration_date: req.expiration_date,
                batch: batch.as_deref(),
                address: &address,
                user_id: Some(actor.id),
                user_email: Some(&actor.email),
                notes: None,
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            "📥 Entrada de {} un. do EAN {} ({:?}, validade {}). Saldo: {}",
            quantity, product.ean, req.location, req.expiration_date, balance.quantity
        );
        Ok(StockOperationResult { balance, movement })
    }

    // --- SAÍDA ---
    pub async fn register_exit(&self, req: ExitRequest, actor: &User) -> Result<StockOperationResult, AppError> {
        let quantity = ensure_positive(req.quantity)?;
        let batch = optional_text(req.batch.as_deref());
        let address = resolve_address(req.address.as_deref());

        let mut tx = self.pool.begin().await?;

        let product = self.product_service.find_by_ean(&mut *tx, &req.ean).await?;
        let key = BalanceKey {
            product_id: product.id,
            location: req.location,
            expiration_date: req.expiration_date,
            address: &address,
        };

        // 1. Trava o saldo antes de validar (evita a leitura de saldo obsoleto)
        let balance = self.stock_repo.get_balance_for_update(&mut *tx, key).await?;

        // 2. FEFO
        let earliest = self.stock_repo
            .earliest_pending_expiration(&mut *tx, product.id, req.location, req.expiration_date)
            .await?;
        if let Err(e) = ensure_no_earlier_pending(earliest) {
            tracing::warn!("⛔ Saída do EAN {} recusada: validade anterior com saldo.", product.ean);
            return Err(e);
        }

        // 3. Saldo suficiente
        let balance = balance.ok_or(AppError::StockLotNotFound)?;
        let remaining = remaining_after_exit(balance.quantity, quantity)?;

        let balance = self.stock_repo.set_quantity(&mut *tx, balance.id, remaining).await?;

        let movement = self.movement_repo
            .record(&mut *tx, NewMovement {
                product_id: product.id,
                ean: &product.ean,
                location: req.location,
                kind: MovementKind::Exit,
                quantity_changed: -quantity,
                balance_after: balance.quantity,
                expiration_date: req.expiration_date,
                batch: batch.as_deref().or(balance.batch.as_deref()),
                address: &address,
                user_id: Some(actor.id),
                user_email: Some(&actor.email),
                notes: req.notes.as_deref(),
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            "📤 Saída de {} un. do EAN {} ({:?}, validade {}). Saldo: {}",
            quantity, product.ean, req.location, req.expiration_date, balance.quantity
        );
        Ok(StockOperationResult { balance, movement })
    }

    // --- TRANSFERÊNCIA (galpão -> loja, ou entre endereços) ---
    pub async fn transfer(&self, req: TransferRequest, actor: &User) -> Result<TransferResult, AppError> {
        let quantity = ensure_positive(req.quantity)?;
        let from_address = resolve_address(req.from_address.as_deref());
        let to_address = resolve_address(req.to_address.as_deref());

        if req.from_location == req.to_location && from_address == to_address {
            return Err(AppError::InvalidTransfer);
        }

        let mut tx = self.pool.begin().await?;

        let product = self.product_service.find_by_ean(&mut *tx, &req.ean).await?;
        let origin_key = BalanceKey {
            product_id: product.id,
            location: req.from_location,
            expiration_date: req.expiration_date,
            address: &from_address,
        };
        let destination_key = BalanceKey {
            location: req.to_location,
            address: &to_address,
            ..origin_key
        };

        // Destino criado antes; as duas linhas são travadas juntas, em ordem fixa
        self.stock_repo.ensure_balance_row(&mut *tx, destination_key).await?;
        let locked = self.stock_repo
            .lock_transfer_pair(&mut *tx, origin_key, destination_key)
            .await?;

        let origin = locked
            .into_iter()
            .find(|b| b.location == req.from_location && b.address == from_address)
            .ok_or(AppError::StockLotNotFound)?;
        let remaining = remaining_after_exit(origin.quantity, quantity)?;

        let origin = self.stock_repo.set_quantity(&mut *tx, origin.id, remaining).await?;
        let destination = self.stock_repo
            .add_to_balance(&mut *tx, destination_key, origin.batch.as_deref(), quantity)
            .await?;

        let mut movements = Vec::with_capacity(2);
        for (kind, balance, delta) in [
            (MovementKind::TransferOut, &origin, -quantity),
            (MovementKind::TransferIn, &destination, quantity),
        ] {
            let movement = self.movement_repo
                .record(&mut *tx, NewMovement {
                    product_id: product.id,
                    ean: &product.ean,
                    location: balance.location,
                    kind,
                    quantity_changed: delta,
                    balance_after: balance.quantity,
                    expiration_date: req.expiration_date,
                    batch: balance.batch.as_deref(),
                    address: &balance.address,
                    user_id: Some(actor.id),
                    user_email: Some(&actor.email),
                    notes: None,
                })
                .await?;
            movements.push(movement);
        }

        tx.commit().await?;

        tracing::info!(
            "🔁 Transferência de {} un. do EAN {}: {:?}/{} -> {:?}/{}",
            quantity, product.ean, req.from_location, from_address, req.to_location, to_address
        );
        Ok(TransferResult { origin, destination, movements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn balance(ean: &str, expiration: NaiveDate, quantity: i32) -> StockBalanceView {
        StockBalanceView {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            ean: ean.to_string(),
            description: "LEITE INTEGRAL".into(),
            brand: "Itambé".into(),
            location: StockLocation::Store,
            expiration_date: expiration,
            address: DEFAULT_ADDRESS.into(),
            batch: None,
            quantity,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exit_within_balance_leaves_remainder() {
        assert_eq!(remaining_after_exit(10, 4).unwrap(), 6);
        assert_eq!(remaining_after_exit(10, 10).unwrap(), 0);
    }

    #[test]
    fn exit_beyond_balance_reports_available() {
        match remaining_after_exit(3, 5) {
            Err(AppError::InsufficientStock { available }) => assert_eq!(available, 3),
            other => panic!("esperava saldo insuficiente, veio {other:?}"),
        }
    }

    #[test]
    fn exit_of_zero_is_invalid() {
        assert!(matches!(remaining_after_exit(3, 0), Err(AppError::InvalidQuantity(_))));
    }

    #[test]
    fn fefo_blocks_when_earlier_lot_has_stock() {
        assert!(ensure_no_earlier_pending(None).is_ok());
        let pending = date(2025, 1, 10);
        assert!(matches!(
            ensure_no_earlier_pending(Some(pending)),
            Err(AppError::EarlierExpirationPending(d)) if d == pending
        ));
    }

    #[test]
    fn address_defaults_and_normalizes() {
        assert_eq!(resolve_address(None), DEFAULT_ADDRESS);
        assert_eq!(resolve_address(Some("  ")), DEFAULT_ADDRESS);
        assert_eq!(resolve_address(Some(" a-01-02 ")), "A-01-02");
    }

    #[test]
    fn expiry_band_boundaries() {
        assert_eq!(classify_expiry(-5), ExpiryBand::Red);
        assert_eq!(classify_expiry(90), ExpiryBand::Red);
        assert_eq!(classify_expiry(91), ExpiryBand::Orange);
        assert_eq!(classify_expiry(180), ExpiryBand::Orange);
        assert_eq!(classify_expiry(181), ExpiryBand::Green);
    }

    #[test]
    fn expiry_panel_sorted_by_days_and_skips_empty_lots() {
        let today = date(2025, 6, 1);
        let panel = build_expiry_panel(
            vec![
                balance("7891000100103", date(2026, 1, 1), 5),
                balance("7891000100104", date(2025, 6, 20), 2),
                balance("7891000100105", date(2025, 7, 1), 0),
                balance("7891000100106", date(2025, 10, 1), 8),
            ],
            today,
        );

        let eans: Vec<&str> = panel.iter().map(|e| e.ean.as_str()).collect();
        assert_eq!(eans, ["7891000100104", "7891000100106", "7891000100103"]);
        assert_eq!(panel[0].days_to_expire, 19);
        assert_eq!(panel[0].band, ExpiryBand::Red);
        assert_eq!(panel[1].band, ExpiryBand::Orange);
        assert_eq!(panel[2].band, ExpiryBand::Green);
    }

    // --- Com banco (sqlx::test aplica as migrations) ---

    use crate::db::{ProductRepository, UserRepository};

    const EAN: &str = "7891000100103";

    fn stock_service(pool: &PgPool) -> StockService {
        let product_service = ProductService::new(ProductRepository::new(pool.clone()));
        StockService::new(
            pool.clone(),
            product_service,
            StockRepository::new(pool.clone()),
            MovementRepository::new(pool.clone()),
        )
    }

    async fn operator(pool: &PgPool) -> User {
        UserRepository::new(pool.clone())
            .create_user(pool, "Operador", "operador@exemplo.com", "hash", true)
            .await
            .unwrap()
    }

    fn entry(expiration: NaiveDate, quantity: i32, location: StockLocation) -> EntryRequest {
        EntryRequest {
            ean: EAN.into(),
            expiration_date: expiration,
            quantity,
            location,
            batch: None,
            address: None,
            description: Some("leite integral".into()),
            brand: Some("itambé".into()),
        }
    }

    fn exit(expiration: NaiveDate, quantity: i32, location: StockLocation) -> ExitRequest {
        ExitRequest {
            ean: EAN.into(),
            expiration_date: expiration,
            quantity,
            location,
            batch: None,
            address: None,
            notes: None,
        }
    }

    fn transfer(from: StockLocation, to: StockLocation, quantity: i32) -> TransferRequest {
        TransferRequest {
            ean: EAN.into(),
            expiration_date: date(2030, 1, 31),
            quantity,
            from_location: from,
            from_address: None,
            to_location: to,
            to_address: None,
        }
    }

    async fn quantity_at(service: &StockService, location: StockLocation, expiration: NaiveDate) -> Option<i32> {
        let product = service.product_service.find_by_ean(&service.pool, EAN).await.unwrap();
        let key = BalanceKey {
            product_id: product.id,
            location,
            expiration_date: expiration,
            address: DEFAULT_ADDRESS,
        };
        service.stock_repo
            .get_balance_for_update(&service.pool, key)
            .await
            .unwrap()
            .map(|b| b.quantity)
    }

    #[sqlx::test]
    async fn concurrent_exits_keep_every_unit(pool: PgPool) {
        let service = stock_service(&pool);
        let user = operator(&pool).await;
        let expiration = date(2030, 1, 31);
        service.register_entry(entry(expiration, 50, StockLocation::Warehouse), &user).await.unwrap();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let service = service.clone();
                let user = user.clone();
                tokio::spawn(async move {
                    service.register_exit(exit(expiration, 10, StockLocation::Warehouse), &user).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(quantity_at(&service, StockLocation::Warehouse, expiration).await, Some(20));
    }

    #[sqlx::test]
    async fn exit_of_later_expiration_is_refused_while_earlier_has_stock(pool: PgPool) {
        let service = stock_service(&pool);
        let user = operator(&pool).await;
        let (earlier, later) = (date(2030, 1, 31), date(2030, 6, 30));
        service.register_entry(entry(earlier, 10, StockLocation::Store), &user).await.unwrap();
        service.register_entry(entry(later, 10, StockLocation::Store), &user).await.unwrap();

        let refused = service.register_exit(exit(later, 1, StockLocation::Store), &user).await;
        assert!(matches!(refused, Err(AppError::EarlierExpirationPending(d)) if d == earlier));

        // Validade sem lote também cai no FEFO antes de "lote não encontrado"
        let missing = service.register_exit(exit(date(2031, 1, 1), 1, StockLocation::Store), &user).await;
        assert!(matches!(missing, Err(AppError::EarlierExpirationPending(d)) if d == earlier));

        // Outro local não conta para o FEFO
        service.register_entry(entry(later, 5, StockLocation::Warehouse), &user).await.unwrap();
        service.register_exit(exit(later, 5, StockLocation::Warehouse), &user).await.unwrap();

        service.register_exit(exit(earlier, 10, StockLocation::Store), &user).await.unwrap();
        let result = service.register_exit(exit(later, 4, StockLocation::Store), &user).await.unwrap();
        assert_eq!(result.balance.quantity, 6);
        assert_eq!(result.movement.kind, MovementKind::Exit);
        assert_eq!(result.movement.quantity_changed, -4);
    }

    #[sqlx::test]
    async fn insufficient_exit_leaves_balance_untouched(pool: PgPool) {
        let service = stock_service(&pool);
        let user = operator(&pool).await;
        let expiration = date(2030, 1, 31);
        service.register_entry(entry(expiration, 5, StockLocation::Store), &user).await.unwrap();

        let result = service.register_exit(exit(expiration, 8, StockLocation::Store), &user).await;
        assert!(matches!(result, Err(AppError::InsufficientStock { available: 5 })));
        assert_eq!(quantity_at(&service, StockLocation::Store, expiration).await, Some(5));

        let unknown_lot = service.register_exit(exit(expiration, 1, StockLocation::Warehouse), &user).await;
        assert!(matches!(unknown_lot, Err(AppError::StockLotNotFound)));
    }

    #[sqlx::test]
    async fn opposing_transfers_all_complete(pool: PgPool) {
        let service = stock_service(&pool);
        let user = operator(&pool).await;
        let expiration = date(2030, 1, 31);
        service.register_entry(entry(expiration, 100, StockLocation::Warehouse), &user).await.unwrap();
        service.register_entry(entry(expiration, 100, StockLocation::Store), &user).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let service = service.clone();
                let user = user.clone();
                let (from, to) = if i % 2 == 0 {
                    (StockLocation::Warehouse, StockLocation::Store)
                } else {
                    (StockLocation::Store, StockLocation::Warehouse)
                };
                tokio::spawn(async move { service.transfer(transfer(from, to, 1), &user).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(quantity_at(&service, StockLocation::Warehouse, expiration).await, Some(100));
        assert_eq!(quantity_at(&service, StockLocation::Store, expiration).await, Some(100));
    }

    #[sqlx::test]
    async fn transfer_to_new_address_creates_destination(pool: PgPool) {
        let service = stock_service(&pool);
        let user = operator(&pool).await;
        service.register_entry(entry(date(2030, 1, 31), 10, StockLocation::Warehouse), &user).await.unwrap();

        let result = service
            .transfer(TransferRequest { to_address: Some("b-02".into()), ..transfer(StockLocation::Warehouse, StockLocation::Warehouse, 4) }, &user)
            .await
            .unwrap();

        assert_eq!(result.origin.quantity, 6);
        assert_eq!(result.destination.quantity, 4);
        assert_eq!(result.destination.address, "B-02");
        let kinds: Vec<MovementKind> = result.movements.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, [MovementKind::TransferOut, MovementKind::TransferIn]);

        let same_place = service.transfer(transfer(StockLocation::Store, StockLocation::Store, 1), &user).await;
        assert!(matches!(same_place, Err(AppError::InvalidTransfer)));

        let missing_origin = service.transfer(transfer(StockLocation::Store, StockLocation::Warehouse, 1), &user).await;
        assert!(matches!(missing_origin, Err(AppError::StockLotNotFound)));
    }

    #[sqlx::test]
    async fn concurrent_first_entries_register_the_product_once(pool: PgPool) {
        let service = stock_service(&pool);
        let user = operator(&pool).await;
        let expiration = date(2030, 1, 31);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                let user = user.clone();
                tokio::spawn(async move {
                    service.register_entry(entry(expiration, 3, StockLocation::Warehouse), &user).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE ean = $1")
            .bind(EAN)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(products, 1);
        assert_eq!(quantity_at(&service, StockLocation::Warehouse, expiration).await, Some(12));
    }
}
