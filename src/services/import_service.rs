// src/services/import_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{auth::User, import::ProductImportSummary, stock::StockLocation},
    services::{
        product_service::ProductService,
        spreadsheet::{parse_rows, SheetRow},
        stock_service::{EntryRequest, ExitRequest, StockService},
        validation::{normalize_ean, parse_quantity, parse_sheet_expiration, require_non_empty, title_case, UNKNOWN_BRAND},
    },
};

pub const DEFAULT_IMPORT_DESCRIPTION: &str = "Produto sem descrição";
const ADJUSTMENT_NOTE: &str = "Baixa por planilha de ajuste";

// Linha que falhou; não interrompe a importação
#[derive(Debug)]
pub struct RowFailure {
    pub line: usize,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub failures: Vec<RowFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub ean: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub description: String,
    pub brand: String,
    pub batch: Option<String>,
    pub address: Option<String>,
}

// A descrição aparece com nomes diferentes conforme a origem da planilha
const DESCRIPTION_COLUMNS: [&str; 3] = ["descricao", "descrição", "nome"];

fn description_of(row: &SheetRow) -> Option<&str> {
    DESCRIPTION_COLUMNS.iter().find_map(|col| row.get_opt(col))
}

/// Colunas: ean, validade, quantidade (obrigatórias), descricao, marca, lote, endereco.
pub fn map_stock_row(row: &SheetRow) -> Result<StockRow, AppError> {
    let ean = require_non_empty("ean", row.get("ean"))?;
    let expiration = require_non_empty("validade", row.get("validade"))?;
    let quantity = require_non_empty("quantidade", row.get("quantidade"))?;

    Ok(StockRow {
        quantity: parse_quantity(quantity)?,
        expiration_date: parse_sheet_expiration(expiration)?,
        ean: normalize_ean(ean)?,
        description: description_of(row).unwrap_or(DEFAULT_IMPORT_DESCRIPTION).to_string(),
        brand: row.get_opt("marca").unwrap_or(UNKNOWN_BRAND).to_string(),
        batch: row.get_opt("lote").map(str::to_string),
        address: row.get_opt("endereco").map(str::to_string),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub ean: String,
    pub description: String,
    pub brand: String,
}

/// Colunas: ean, marca, descricao. Marca e descrição em "Title Case".
pub fn map_product_row(row: &SheetRow) -> Result<ProductRow, AppError> {
    let ean = normalize_ean(&row.get("ean").to_uppercase())?;
    let brand = title_case(require_non_empty("marca", row.get("marca"))?);
    let description = title_case(require_non_empty("descricao", description_of(row).unwrap_or(""))?);
    Ok(ProductRow { ean, description, brand })
}

#[derive(Clone)]
pub struct ImportService {
    pool: PgPool,
    product_service: ProductService,
    stock_service: StockService,
}

impl ImportService {
    pub fn new(pool: PgPool, product_service: ProductService, stock_service: StockService) -> Self {
        Self { pool, product_service, stock_service }
    }

    /// Cada linha vira uma entrada de estoque, em transação própria.
    pub async fn import_stock(
        &self,
        file_name: &str,
        bytes: &[u8],
        location: StockLocation,
        actor: &User,
    ) -> Result<ImportReport, AppError> {
        let rows = parse_rows(file_name, bytes)?;
        let mut report = ImportReport::default();

        for row in &rows {
            let outcome = match map_stock_row(row) {
                Ok(mapped) => self.stock_service
                    .register_entry(EntryRequest {
                        ean: mapped.ean,
                        expiration_date: mapped.expiration_date,
                        quantity: mapped.quantity,
                        location,
                        batch: mapped.batch,
                        address: mapped.address,
                        description: Some(mapped.description),
                        brand: Some(mapped.brand),
                    }, actor)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            record_outcome(&mut report, row.line, outcome);
        }

        tracing::info!(
            "📦 Importação de estoque ({:?}) concluída: {} linhas importadas, {} com erro.",
            location, report.imported, report.failures.len()
        );
        Ok(report)
    }

    /// Planilha de ajuste da loja: cada linha vira uma baixa (saída) na loja.
    pub async fn import_store_adjustments(
        &self,
        file_name: &str,
        bytes: &[u8],
        actor: &User,
    ) -> Result<ImportReport, AppError> {
        let rows = parse_rows(file_name, bytes)?;
        let mut report = ImportReport::default();

        for row in &rows {
            let outcome = match map_stock_row(row) {
                Ok(mapped) => self.stock_service
                    .register_exit(ExitRequest {
                        ean: mapped.ean,
                        expiration_date: mapped.expiration_date,
                        quantity: mapped.quantity,
                        location: StockLocation::Store,
                        batch: mapped.batch,
                        address: mapped.address,
                        notes: Some(ADJUSTMENT_NOTE.to_string()),
                    }, actor)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            record_outcome(&mut report, row.line, outcome);
        }

        tracing::info!(
            "📉 Baixa por planilha concluída: {} linhas baixadas, {} com erro.",
            report.imported, report.failures.len()
        );
        Ok(report)
    }

    /// Cadastro de produtos em lote: conta importados, duplicados e inválidos.
    pub async fn import_products(&self, file_name: &str, bytes: &[u8]) -> Result<ProductImportSummary, AppError> {
        let rows = parse_rows(file_name, bytes)?;
        let mut summary = ProductImportSummary::default();

        for row in &rows {
            let mapped = match map_product_row(row) {
                Ok(mapped) => mapped,
                Err(_) => {
                    summary.invalid_count += 1;
                    continue;
                }
            };

            match self.product_service
                .create_product(&self.pool, &mapped.ean, &mapped.description, &mapped.brand)
                .await
            {
                Ok(_) => summary.imported_count += 1,
                Err(AppError::ProductAlreadyExists(_)) => summary.duplicated_count += 1,
                Err(e) => {
                    tracing::warn!("❌ Erro ao importar produto da linha {}: {}", row.line, e);
                    summary.invalid_count += 1;
                }
            }
        }

        tracing::info!(
            "✅ Importação de produtos: {} importados, {} já cadastrados, {} ignorados.",
            summary.imported_count, summary.duplicated_count, summary.invalid_count
        );
        Ok(summary)
    }
}

fn record_outcome(report: &mut ImportReport, line: usize, outcome: Result<(), AppError>) {
    match outcome {
        Ok(()) => report.imported += 1,
        Err(error) => {
            tracing::warn!("❌ Erro na linha {}: {}", line, error);
            report.failures.push(RowFailure { line, error });
        }
    }
}
