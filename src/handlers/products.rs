// src/handlers/products.rs

use axum::{
    extract::{Path, Query, State},
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
    middleware::i18n::Locale,
    models::product::{Product, ProductFilter},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(equal = 13, message = "O EAN deve ter 13 dígitos."))]
    pub ean: String,
    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,
    #[validate(length(min = 1, message = "A marca é obrigatória."))]
    pub brand: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,
    #[validate(length(min = 1, message = "A marca é obrigatória."))]
    pub brand: String,
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto cadastrado", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "EAN já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let product = app_state
        .product_service
        .create_product(&app_state.db_pool, &payload.ean, &payload.description, &payload.brand)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(ProductFilter),
    responses(
        (status = 200, description = "Produtos cadastrados", body = Vec<Product>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .product_service
        .list_products(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/{ean}",
    tag = "Products",
    params(("ean" = String, Path, description = "EAN de 13 dígitos")),
    responses(
        (status = 200, description = "Produto encontrado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(ean): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .product_service
        .find_by_ean(&app_state.db_pool, &ean)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{ean}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("ean" = String, Path, description = "EAN de 13 dígitos")),
    responses(
        (status = 200, description = "Produto atualizado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(ean): Path<String>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let product = app_state
        .product_service
        .update_product(&ean, &payload.description, &payload.brand)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(product)))
}
