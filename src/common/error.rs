use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Erro de domínio. Os handlers convertem para `ApiError` com o idioma do cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo obrigatório '{0}' está ausente.")]
    MissingField(String),

    #[error("EAN inválido: {0}")]
    InvalidEan(String),

    #[error("Quantidade inválida: {0}")]
    InvalidQuantity(String),

    #[error("Data inválida: {0}")]
    InvalidDate(String),

    #[error("Transferência inválida")]
    InvalidTransfer,

    #[error("E-mail já existe: {0}")]
    EmailAlreadyExists(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso restrito a administradores")]
    AdminRequired,

    #[error("Produto já cadastrado: {0}")]
    ProductAlreadyExists(String),

    #[error("Produto não encontrado: {0}")]
    ProductNotFound(String),

    #[error("Produto não encontrado e dados incompletos: {0}")]
    ProductNotFoundIncomplete(String),

    #[error("Estoque com essa validade não encontrado")]
    StockLotNotFound,

    #[error("Saldo pendente com validade anterior: {0}")]
    EarlierExpirationPending(NaiveDate),

    #[error("Estoque insuficiente. Disponível: {available}")]
    InsufficientStock { available: i32 },

    #[error("Nenhuma contagem registrada")]
    CountNotFound,

    #[error("Arquivo vazio ou não enviado")]
    EmptyUpload,

    #[error("Formato não suportado: {0}")]
    UnsupportedFormat(String),

    #[error("Falha ao ler a planilha: {0}")]
    SpreadsheetError(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro que efetivamente vai para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::MissingField(_)
            | AppError::InvalidEan(_)
            | AppError::InvalidQuantity(_)
            | AppError::InvalidDate(_)
            | AppError::InvalidTransfer
            | AppError::ProductNotFoundIncomplete(_)
            | AppError::InsufficientStock { .. }
            | AppError::EmptyUpload
            | AppError::UnsupportedFormat(_)
            | AppError::SpreadsheetError(_) => StatusCode::BAD_REQUEST,

            AppError::EmailAlreadyExists(_)
            | AppError::ProductAlreadyExists(_)
            | AppError::EarlierExpirationPending(_) => StatusCode::CONFLICT,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::AdminRequired => StatusCode::FORBIDDEN,

            AppError::UserNotFound
            | AppError::ProductNotFound(_)
            | AppError::StockLotNotFound
            | AppError::CountNotFound => StatusCode::NOT_FOUND,

            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Mensagem legível para o usuário final, no idioma pedido.
    pub fn message(&self, locale: &Locale) -> String {
        let en = locale.is_english();
        match self {
            AppError::ValidationError(_) => pick(en, "Um ou mais campos são inválidos.", "One or more fields are invalid."),
            AppError::MissingField(field) => if en {
                format!("Required field '{}' is missing.", field)
            } else {
                format!("Campo obrigatório '{}' está ausente.", field)
            },
            AppError::InvalidEan(ean) => if en {
                format!("Invalid EAN '{}': it must have 13 digits.", ean)
            } else {
                format!("EAN inválido '{}': deve conter 13 dígitos numéricos.", ean)
            },
            AppError::InvalidQuantity(_) => pick(en, "Quantidade inválida ou zero", "Invalid or zero quantity"),
            AppError::InvalidDate(raw) => if en {
                format!("Invalid expiration date: {}", raw)
            } else {
                format!("Data de validade inválida: {}", raw)
            },
            AppError::InvalidTransfer => pick(en, "Origem e destino da transferência devem ser diferentes.", "Transfer origin and destination must differ."),
            AppError::EmailAlreadyExists(email) => if en {
                format!("E-mail {} is already registered.", email)
            } else {
                format!("E-mail {} já está cadastrado.", email)
            },
            AppError::InvalidCredentials => pick(en, "E-mail ou senha inválidos.", "Invalid e-mail or password."),
            AppError::InvalidToken => pick(en, "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
            AppError::UserNotFound => pick(en, "Usuário não encontrado.", "User not found."),
            AppError::AdminRequired => pick(en, "Apenas administradores podem realizar esta ação.", "Only administrators can perform this action."),
            AppError::ProductAlreadyExists(_) => pick(en, "Produto já cadastrado.", "Product already registered."),
            AppError::ProductNotFound(ean) => if en {
                format!("Product {} not found.", ean)
            } else {
                format!("Produto {} não encontrado.", ean)
            },
            AppError::ProductNotFoundIncomplete(_) => pick(en, "Produto não encontrado e dados incompletos", "Product not found and registration data is incomplete"),
            AppError::StockLotNotFound => pick(en, "Estoque com essa validade não encontrado.", "No stock found for this expiration date."),
            AppError::EarlierExpirationPending(date) => if en {
                format!("There is still stock expiring on {}. Write that lot off first.", date.format("%Y-%m-%d"))
            } else {
                format!("Ainda há saldo do lote com validade {}. É necessário dar baixa nesse lote primeiro.", date.format("%d/%m/%Y"))
            },
            AppError::InsufficientStock { available } => if en {
                format!("Insufficient stock. Available: {}", available)
            } else {
                format!("Estoque insuficiente. Disponível: {}", available)
            },
            AppError::CountNotFound => pick(en, "Nenhuma contagem registrada para este produto e validade.", "No count registered for this product and expiration date."),
            AppError::EmptyUpload => pick(en, "Arquivo vazio ou não enviado.", "File is empty or missing."),
            AppError::UnsupportedFormat(_) => pick(en, "Formato inválido. Use .csv ou .xlsx", "Invalid format. Use .csv or .xlsx"),
            AppError::SpreadsheetError(detail) => if en {
                format!("Failed to read the spreadsheet: {}", detail)
            } else {
                format!("Falha ao ler a planilha: {}", detail)
            },
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => pick(en, "Ocorreu um erro inesperado.", "An unexpected error occurred."),
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            _ => None,
        };

        ApiError {
            status,
            error: self.message(locale),
            details,
        }
    }
}

fn pick(en: bool, pt: &str, english: &str) -> String {
    if en { english.to_string() } else { pt.to_string() }
}

// Retorna todos os detalhes da validação, campo a campo.
fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details = serde_json::Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<Value> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .map(Value::String)
            .collect();
        details.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(details)
}

// Sem Locale em mãos, responde no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error(&Locale::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_client_statuses() {
        assert_eq!(AppError::InsufficientStock { available: 3 }.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ProductAlreadyExists("7891000100103".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::StockLotNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AdminRequired.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn messages_default_to_portuguese() {
        let err = AppError::InsufficientStock { available: 4 };
        assert_eq!(err.message(&Locale::default()), "Estoque insuficiente. Disponível: 4");
        assert_eq!(err.message(&Locale("en".into())), "Insufficient stock. Available: 4");
    }

    #[test]
    fn earlier_expiration_uses_brazilian_date_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let msg = AppError::EarlierExpirationPending(date).message(&Locale::default());
        assert!(msg.contains("09/03/2025"), "{msg}");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("pool exhausted"));
        let api = err.to_api_error(&Locale::default());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "Ocorreu um erro inesperado.");
    }

    #[tokio::test]
    async fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut field_err = validator::ValidationError::new("length");
        field_err.message = Some("A senha deve ter no mínimo 6 caracteres.".into());
        errors.add("password", field_err);

        let response = AppError::ValidationError(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["details"]["password"][0], "A senha deve ter no mínimo 6 caracteres.");
    }
}
