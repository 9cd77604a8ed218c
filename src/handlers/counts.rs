// src/handlers/counts.rs

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
        count::{CountFilter, InventoryCount},
        movement::StockOperationResult,
        stock::StockLocation,
    },
    services::{
        count_service::{ApplyCountRequest, CountRequest},
        validation::parse_expiration,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCountPayload {
    #[validate(length(min = 1, message = "O EAN é obrigatório."))]
    pub ean: String,
    #[validate(length(min = 1, message = "A validade é obrigatória."))]
    pub expiration_date: String,
    pub location: StockLocation,
    pub address: Option<String>,
    #[validate(range(min = 0, message = "A quantidade contada não pode ser negativa."))]
    pub counted_quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCountPayload {
    #[validate(length(min = 1, message = "O EAN é obrigatório."))]
    pub ean: String,
    #[validate(length(min = 1, message = "A validade é obrigatória."))]
    pub expiration_date: String,
    pub location: StockLocation,
    pub address: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/counts",
    tag = "Counts",
    request_body = RegisterCountPayload,
    responses(
        (status = 201, description = "Contagem registrada", body = InventoryCount),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<RegisterCountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let expiration_date = parse_expiration(&payload.expiration_date)
        .map_err(|e| e.to_api_error(&locale))?;

    let count = app_state
        .count_service
        .register_count(CountRequest {
            ean: payload.ean,
            expiration_date,
            location: payload.location,
            address: payload.address,
            counted_quantity: payload.counted_quantity,
        }, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(count)))
}

#[utoipa::path(
    get,
    path = "/api/counts",
    tag = "Counts",
    params(CountFilter),
    responses(
        (status = 200, description = "Contagens registradas", body = Vec<InventoryCount>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_counts(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<CountFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let counts = app_state
        .count_service
        .list_counts(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(counts)))
}

#[utoipa::path(
    post,
    path = "/api/counts/apply",
    tag = "Counts",
    request_body = ApplyCountPayload,
    responses(
        (status = 200, description = "Saldo ajustado pela última contagem", body = StockOperationResult),
        (status = 404, description = "Nenhuma contagem para este saldo")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ApplyCountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let expiration_date = parse_expiration(&payload.expiration_date)
        .map_err(|e| e.to_api_error(&locale))?;

    let result = app_state
        .count_service
        .apply_latest_count(ApplyCountRequest {
            ean: payload.ean,
            expiration_date,
            location: payload.location,
            address: payload.address,
        }, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(result)))
}
