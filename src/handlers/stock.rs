// src/handlers/stock.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        movement::{StockOperationResult, TransferResult},
        product::ProductFilter,
        stock::{ConsolidatedBalance, ExpiryPanelEntry, ExpiryPanelQuery, StockBalanceView, StockFilter, StockLocation},
    },
    services::{
        stock_service::{EntryRequest, ExitRequest, TransferRequest},
        validation::parse_expiration,
    },
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockEntryPayload {
    #[validate(length(min = 1, message = "O EAN é obrigatório."))]
    pub ean: String,
    /// Aceita AAAA-MM-DD ou DD/MM/AAAA
    #[validate(length(min = 1, message = "A validade é obrigatória."))]
    pub expiration_date: String,
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,
    pub location: StockLocation,
    pub batch: Option<String>,
    pub address: Option<String>,
    // Usados só se o produto ainda não estiver cadastrado
    pub description: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockExitPayload {
    #[validate(length(min = 1, message = "O EAN é obrigatório."))]
    pub ean: String,
    #[validate(length(min = 1, message = "A validade é obrigatória."))]
    pub expiration_date: String,
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,
    pub location: StockLocation,
    pub batch: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockTransferPayload {
    #[validate(length(min = 1, message = "O EAN é obrigatório."))]
    pub ean: String,
    #[validate(length(min = 1, message = "A validade é obrigatória."))]
    pub expiration_date: String,
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,
    pub from_location: StockLocation,
    pub from_address: Option<String>,
    pub to_location: StockLocation,
    pub to_address: Option<String>,
}

// ---
// Consultas
// ---

#[utoipa::path(
    get,
    path = "/api/stock",
    tag = "Stock",
    params(StockFilter),
    responses(
        (status = 200, description = "Saldos por produto, local, validade e endereço", body = Vec<StockBalanceView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_balances(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<StockFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let balances = app_state
        .stock_service
        .list_balances(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(balances)))
}

#[utoipa::path(
    get,
    path = "/api/stock/consolidated",
    tag = "Stock",
    params(ProductFilter),
    responses(
        (status = 200, description = "Saldo somado de galpão e loja por produto", body = Vec<ConsolidatedBalance>)
    ),
    security(("api_jwt" = []))
)]
pub async fn consolidated(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = app_state
        .stock_service
        .consolidated(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/stock/expiry-panel",
    tag = "Stock",
    params(ExpiryPanelQuery),
    responses(
        (status = 200, description = "Lotes com saldo, classificados por proximidade do vencimento", body = Vec<ExpiryPanelEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn expiry_panel(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ExpiryPanelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let today = chrono::Local::now().date_naive();

    let panel = app_state
        .stock_service
        .expiry_panel(query.location, today)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(panel)))
}

// ---
// Operações
// ---

#[utoipa::path(
    post,
    path = "/api/stock/entries",
    tag = "Stock",
    request_body = StockEntryPayload,
    responses(
        (status = 201, description = "Entrada registrada", body = StockOperationResult),
        (status = 400, description = "Dados inválidos ou produto sem cadastro")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<StockEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let expiration_date = parse_expiration(&payload.expiration_date)
        .map_err(|e| e.to_api_error(&locale))?;

    let result = app_state
        .stock_service
        .register_entry(EntryRequest {
            ean: payload.ean,
            expiration_date,
            quantity: payload.quantity,
            location: payload.location,
            batch: payload.batch,
            address: payload.address,
            description: payload.description,
            brand: payload.brand,
        }, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    post,
    path = "/api/stock/exits",
    tag = "Stock",
    request_body = StockExitPayload,
    responses(
        (status = 201, description = "Saída registrada", body = StockOperationResult),
        (status = 400, description = "Estoque insuficiente"),
        (status = 404, description = "Produto ou validade não encontrados"),
        (status = 409, description = "Existe validade anterior com saldo")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_exit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<StockExitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let expiration_date = parse_expiration(&payload.expiration_date)
        .map_err(|e| e.to_api_error(&locale))?;

    let result = app_state
        .stock_service
        .register_exit(ExitRequest {
            ean: payload.ean,
            expiration_date,
            quantity: payload.quantity,
            location: payload.location,
            batch: payload.batch,
            address: payload.address,
            notes: payload.notes,
        }, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    post,
    path = "/api/stock/transfers",
    tag = "Stock",
    request_body = StockTransferPayload,
    responses(
        (status = 201, description = "Transferência registrada", body = TransferResult),
        (status = 400, description = "Estoque insuficiente ou origem igual ao destino")
    ),
    security(("api_jwt" = []))
)]
pub async fn transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<StockTransferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let expiration_date = parse_expiration(&payload.expiration_date)
        .map_err(|e| e.to_api_error(&locale))?;

    let result = app_state
        .stock_service
        .transfer(TransferRequest {
            ean: payload.ean,
            expiration_date,
            quantity: payload.quantity,
            from_location: payload.from_location,
            from_address: payload.from_address,
            to_location: payload.to_location,
            to_address: payload.to_address,
        }, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(result)))
}
