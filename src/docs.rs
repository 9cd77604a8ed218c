// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::change_password,
        handlers::auth::list_users,

        // --- Products ---
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::update_product,

        // --- Stock ---
        handlers::stock::list_balances,
        handlers::stock::consolidated,
        handlers::stock::expiry_panel,
        handlers::stock::register_entry,
        handlers::stock::register_exit,
        handlers::stock::transfer,

        // --- Counts ---
        handlers::counts::register_count,
        handlers::counts::list_counts,
        handlers::counts::apply_count,

        // --- Movements ---
        handlers::movements::list_movements,
        handlers::movements::chart,
        handlers::movements::daily,
        handlers::movements::productivity,
        handlers::movements::export,

        // --- Imports ---
        handlers::imports::import_stock,
        handlers::imports::import_store_adjustments,
        handlers::imports::import_products,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ChangePasswordPayload,
            models::auth::AuthResponse,

            // --- Products ---
            models::product::Product,
            models::product::RegistrationOutcome,
            handlers::products::CreateProductPayload,
            handlers::products::UpdateProductPayload,

            // --- Stock ---
            models::stock::StockLocation,
            models::stock::StockBalance,
            models::stock::StockBalanceView,
            models::stock::ConsolidatedBalance,
            models::stock::ExpiryBand,
            models::stock::ExpiryPanelEntry,
            handlers::stock::StockEntryPayload,
            handlers::stock::StockExitPayload,
            handlers::stock::StockTransferPayload,

            // --- Movements ---
            models::movement::MovementKind,
            models::movement::StockMovement,
            models::movement::StockOperationResult,
            models::movement::TransferResult,
            models::movement::ChartData,
            models::movement::ChartDataset,
            models::movement::DailyMovement,
            models::movement::UserProductivity,

            // --- Counts ---
            models::count::InventoryCount,
            handlers::counts::RegisterCountPayload,
            handlers::counts::ApplyCountPayload,

            // --- Imports ---
            models::import::ImportSummary,
            models::import::ProductImportSummary,
            handlers::imports::UploadForm,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Administração"),
        (name = "Products", description = "Cadastro de Produtos por EAN"),
        (name = "Stock", description = "Saldos, Entradas, Saídas e Transferências"),
        (name = "Counts", description = "Contagens de Inventário"),
        (name = "Movements", description = "Histórico, Gráficos e Exportação"),
        (name = "Imports", description = "Importação de Planilhas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/auth/login",
            "/api/products/{ean}",
            "/api/stock/exits",
            "/api/counts/apply",
            "/api/movements/export",
            "/api/imports/stock",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "rota ausente: {}", expected);
        }
    }
}
