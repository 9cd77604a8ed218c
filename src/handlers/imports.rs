// src/handlers/imports.rs

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        import::{ImportSummary, ProductImportSummary},
        stock::StockLocation,
    },
    services::import_service::ImportReport,
};

const FILE_FIELD: &str = "file";

// Planilhas de estoque passam fácil dos 2 MB padrão do axum
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn upload_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_UPLOAD_BYTES)
}

// Só para documentar o upload no Swagger
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ImportStockQuery {
    /// WAREHOUSE (padrão) ou STORE
    #[serde(default)]
    pub location: StockLocation,
}

// Lê o campo "file" do multipart: (nome do arquivo, conteúdo)
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::SpreadsheetError(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::SpreadsheetError(e.to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::EmptyUpload);
        }
        return Ok((file_name, bytes.to_vec()));
    }

    Err(AppError::EmptyUpload)
}

pub fn summarize(report: ImportReport, locale: &Locale) -> ImportSummary {
    let (message, line_label) = if locale.is_english() {
        ("Import finished", "Line")
    } else {
        ("Importação concluída", "Linha")
    };

    ImportSummary {
        message: message.to_string(),
        imported_count: report.imported,
        errors: report
            .failures
            .iter()
            .map(|f| format!("{} {}: {}", line_label, f.line, f.error.message(locale)))
            .collect(),
    }
}

#[utoipa::path(
    post,
    path = "/api/imports/stock",
    tag = "Imports",
    params(ImportStockQuery),
    request_body(content_type = "multipart/form-data", content = UploadForm),
    responses(
        (status = 200, description = "Resumo da importação, com os erros por linha", body = ImportSummary),
        (status = 400, description = "Arquivo ausente ou em formato inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ImportStockQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .import_service
        .import_stock(&file_name, &bytes, query.location, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(summarize(report, &locale))))
}

#[utoipa::path(
    post,
    path = "/api/imports/store-adjustments",
    tag = "Imports",
    request_body(content_type = "multipart/form-data", content = UploadForm),
    responses(
        (status = 200, description = "Resumo da baixa por planilha", body = ImportSummary),
        (status = 400, description = "Arquivo ausente ou em formato inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_store_adjustments(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .import_service
        .import_store_adjustments(&file_name, &bytes, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(summarize(report, &locale))))
}

#[utoipa::path(
    post,
    path = "/api/imports/products",
    tag = "Imports",
    request_body(content_type = "multipart/form-data", content = UploadForm),
    responses(
        (status = 200, description = "Produtos importados, duplicados e inválidos", body = ProductImportSummary),
        (status = 400, description = "Arquivo ausente ou em formato inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_products(
    State(app_state): State<AppState>,
    locale: Locale,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let summary = app_state
        .import_service
        .import_products(&file_name, &bytes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import_service::RowFailure;

    fn report() -> ImportReport {
        ImportReport {
            imported: 3,
            failures: vec![RowFailure { line: 4, error: AppError::MissingField("validade".into()) }],
        }
    }

    #[test]
    fn summary_lists_failures_by_line() {
        let summary = summarize(report(), &Locale::default());
        assert_eq!(summary.message, "Importação concluída");
        assert_eq!(summary.imported_count, 3);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Linha 4: "));
    }

    #[test]
    fn summary_follows_locale() {
        let summary = summarize(report(), &Locale("en".into()));
        assert_eq!(summary.message, "Import finished");
        assert!(summary.errors[0].starts_with("Line 4: "));
    }

    async fn uploaded_size(mut multipart: Multipart) -> Result<String, StatusCode> {
        let (_, bytes) = read_upload(&mut multipart)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        Ok(bytes.len().to_string())
    }

    #[tokio::test]
    async fn upload_above_axum_default_limit_is_accepted() {
        use axum::{routing::post, Router};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        let app = Router::new()
            .route("/upload", post(uploaded_size))
            .layer(upload_limit());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        // 3 MB: acima do limite padrão de 2 MB
        let content = "7891000100103,2025-09-30,1\n".repeat(3 * 1024 * 1024 / 27 + 1);
        let boundary = "limite-do-upload";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"estoque.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        let request = format!(
            "POST /upload HTTP/1.1\r\nHost: localhost\r\n\
             Content-Type: multipart/form-data; boundary={boundary}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "resposta: {response}");
        assert!(response.ends_with(&content.len().to_string()));
    }
}
