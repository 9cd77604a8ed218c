// src/models/movement.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::stock::StockLocation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Entry,       // "ENTRY"
    Exit,        // "EXIT"
    TransferIn,  // "TRANSFER_IN"
    TransferOut, // "TRANSFER_OUT"
    Adjustment,  // "ADJUSTMENT"
}

impl MovementKind {
    // Rótulo usado na exportação
    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entrada",
            MovementKind::Exit => "saida",
            MovementKind::TransferIn => "transferencia_entrada",
            MovementKind::TransferOut => "transferencia_saida",
            MovementKind::Adjustment => "ajuste",
        }
    }
}

// --- STOCK MOVEMENT (Histórico, somente inserção) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub ean: String,
    pub location: StockLocation,
    pub kind: MovementKind,
    pub quantity_changed: i32,
    pub balance_after: i32,
    pub expiration_date: NaiveDate,
    pub batch: Option<String>,
    pub address: String,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    pub ean: Option<String>,
    pub kind: Option<MovementKind>,
    pub location: Option<StockLocation>,
    pub batch: Option<String>,
    pub user_email: Option<String>,
    /// Data inicial (inclusiva)
    pub from: Option<NaiveDate>,
    /// Data final (inclusiva)
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

// Totais agregados no banco
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct MovementTotals {
    pub entries: i64,
    pub exits: i64,
}

// Formato esperado pelo gráfico do painel
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<i64>,
    pub background_color: Vec<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyMovement {
    pub day: NaiveDate,
    pub entries: i64,
    pub exits: i64,
}

// Produtividade por usuário
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProductivity {
    pub user_email: String,
    pub entry_count: i64,
    pub entry_quantity: i64,
    pub exit_count: i64,
    pub exit_quantity: i64,
}

// Entrada/saída: saldo resultante + registro no histórico
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockOperationResult {
    pub balance: crate::models::stock::StockBalance,
    pub movement: StockMovement,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub origin: crate::models::stock::StockBalance,
    pub destination: crate::models::stock::StockBalance,
    pub movements: Vec<StockMovement>,
}
