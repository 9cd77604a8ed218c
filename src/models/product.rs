// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Catálogo de produtos, identificado pelo EAN de 13 dígitos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub ean: String,
    pub description: String,
    pub brand: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub ean: Option<String>,
    /// Busca parcial, sem diferenciar maiúsculas
    pub brand: Option<String>,
    /// Busca parcial, sem diferenciar maiúsculas
    pub description: Option<String>,
}

// Resultado do "obter ou cadastrar"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationOutcome {
    Existing,
    Registered,
}
