//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração ou sem banco a aplicação não deve iniciar
    let config = Config::from_env().expect("Falha ao carregar a configuração.");
    let app_state = AppState::new(&config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/", get(handlers::auth::list_users))
        .route("/me", get(handlers::auth::get_me))
        .route("/me/password", put(handlers::auth::change_password))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let product_routes = Router::new()
        .route("/"
               ,post(handlers::products::create_product)
               .get(handlers::products::list_products)
        )
        .route("/{ean}"
               ,get(handlers::products::get_product)
               .put(handlers::products::update_product)
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let stock_routes = Router::new()
        .route("/", get(handlers::stock::list_balances))
        .route("/consolidated", get(handlers::stock::consolidated))
        .route("/expiry-panel", get(handlers::stock::expiry_panel))
        .route("/entries", post(handlers::stock::register_entry))
        .route("/exits", post(handlers::stock::register_exit))
        .route("/transfers", post(handlers::stock::transfer))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let count_routes = Router::new()
        .route("/"
               ,post(handlers::counts::register_count)
               .get(handlers::counts::list_counts)
        )
        .route("/apply", post(handlers::counts::apply_count))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let movement_routes = Router::new()
        .route("/", get(handlers::movements::list_movements))
        .route("/chart", get(handlers::movements::chart))
        .route("/daily", get(handlers::movements::daily))
        .route("/productivity", get(handlers::movements::productivity))
        .route("/export", get(handlers::movements::export))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let import_routes = Router::new()
        .route("/stock", post(handlers::imports::import_stock))
        .route("/store-adjustments", post(handlers::imports::import_store_adjustments))
        .route("/products", post(handlers::imports::import_products))
        .layer(handlers::imports::upload_limit())
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/products", product_routes)
        .nest("/api/stock", stock_routes)
        .nest("/api/counts", count_routes)
        .nest("/api/movements", movement_routes)
        .nest("/api/imports", import_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", config.bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
