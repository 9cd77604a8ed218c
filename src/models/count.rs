// src/models/count.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::stock::StockLocation;

// Contagem física de inventário
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCount {
    pub id: Uuid,
    pub product_id: Uuid,
    pub ean: String,
    pub location: StockLocation,
    pub expiration_date: NaiveDate,
    pub address: String,
    pub count_number: i32,
    pub counted_quantity: i32,
    pub system_quantity: i32,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryCount {
    /// Diferença entre o contado e o sistema (positivo = sobra)
    pub fn difference(&self) -> i32 {
        self.counted_quantity - self.system_quantity
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CountFilter {
    pub ean: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: Option<StockLocation>,
}
