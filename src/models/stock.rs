// src/models/stock.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Endereço usado quando o cliente não informa um.
pub const DEFAULT_ADDRESS: &str = "GERAL";

// Galpão ou loja
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "stock_location", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum StockLocation {
    #[default]
    Warehouse, // Vira "WAREHOUSE"
    Store,     // Vira "STORE"
}

// Saldo atual de um produto em um local, para uma validade e endereço.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockBalance {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location: StockLocation,
    pub expiration_date: NaiveDate,
    pub address: String,
    pub batch: Option<String>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Saldo com os dados do produto, para as listagens.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockBalanceView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub ean: String,
    pub description: String,
    pub brand: String,
    pub location: StockLocation,
    pub expiration_date: NaiveDate,
    pub address: String,
    pub batch: Option<String>,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    pub location: Option<StockLocation>,
    pub ean: Option<String>,
    pub brand: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    /// Se verdadeiro, omite saldos zerados
    #[serde(default)]
    pub only_positive: bool,
}

// Saldo somado por produto (galpão + loja)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedBalance {
    pub product_id: Uuid,
    pub ean: String,
    pub description: String,
    pub brand: String,
    pub warehouse_quantity: i64,
    pub store_quantity: i64,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryBand {
    Red,    // até 90 dias
    Orange, // até 180 dias
    Green,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryPanelEntry {
    pub ean: String,
    pub description: String,
    pub brand: String,
    pub location: StockLocation,
    pub address: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub days_to_expire: i64,
    pub band: ExpiryBand,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryPanelQuery {
    pub location: Option<StockLocation>,
}

impl StockLocation {
    // Rótulo usado na exportação
    pub fn label(&self) -> &'static str {
        match self {
            StockLocation::Warehouse => "galpao",
            StockLocation::Store => "loja",
        }
    }
}
