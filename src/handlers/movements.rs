// src/handlers/movements.rs

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::movement::{ChartData, DailyMovement, MovementFilter, StockMovement, UserProductivity},
    services::movement_service::EXPORT_FILE_NAME,
};

#[utoipa::path(
    get,
    path = "/api/movements",
    tag = "Movements",
    params(MovementFilter),
    responses(
        (status = 200, description = "Histórico de movimentações, mais recentes primeiro", body = Vec<StockMovement>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .movement_service
        .list(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(movements)))
}

#[utoipa::path(
    get,
    path = "/api/movements/chart",
    tag = "Movements",
    params(MovementFilter),
    responses(
        (status = 200, description = "Totais de entrada e saída para o gráfico", body = ChartData)
    ),
    security(("api_jwt" = []))
)]
pub async fn chart(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let data = app_state
        .movement_service
        .chart(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(data)))
}

#[utoipa::path(
    get,
    path = "/api/movements/daily",
    tag = "Movements",
    params(MovementFilter),
    responses(
        (status = 200, description = "Entradas e saídas por dia", body = Vec<DailyMovement>)
    ),
    security(("api_jwt" = []))
)]
pub async fn daily(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let days = app_state
        .movement_service
        .daily(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(days)))
}

#[utoipa::path(
    get,
    path = "/api/movements/productivity",
    tag = "Movements",
    params(MovementFilter),
    responses(
        (status = 200, description = "Movimentações agrupadas por usuário", body = Vec<UserProductivity>)
    ),
    security(("api_jwt" = []))
)]
pub async fn productivity(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = app_state
        .movement_service
        .productivity(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/movements/export",
    tag = "Movements",
    params(MovementFilter),
    responses(
        (status = 200, description = "Arquivo CSV com as movimentações filtradas", content_type = "text/csv")
    ),
    security(("api_jwt" = []))
)]
pub async fn export(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = app_state
        .movement_service
        .export_csv(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME)),
    ];

    Ok((StatusCode::OK, headers, bytes))
}
