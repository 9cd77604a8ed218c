// src/models/import.rs

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub message: String,
    pub imported_count: usize,
    /// "Linha N: motivo"
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductImportSummary {
    pub imported_count: usize,
    pub duplicated_count: usize,
    pub invalid_count: usize,
}
