//! HTTP gateway
//!
//! ```text
//! public:  /health, /jwks.json, /transfers/keys, /transfers/incoming
//! bearer:  /bank-info, /accounts[/{accountNumber}], /transfers[/internal|/external|/{id}]
//! docs:    /docs, /api-docs/openapi.json
//! ```

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::jwt_auth_middleware;
use crate::config::GatewayConfig;
use state::AppState;

pub use state::BankComponents;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Partner banks and monitors; the incoming claim carries its own signature
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/jwks.json", get(handlers::get_key_set))
        .route("/transfers/keys", get(handlers::get_key_set))
        .route("/transfers/incoming", post(handlers::receive_incoming));

    let user_routes = Router::new()
        .route("/bank-info", get(handlers::bank_info))
        .route(
            "/accounts",
            post(handlers::open_account).get(handlers::list_accounts),
        )
        .route("/accounts/{account_number}", get(handlers::get_account))
        .route(
            "/transfers",
            post(handlers::create_transfer).get(handlers::list_transfers),
        )
        .route(
            "/transfers/internal",
            post(handlers::create_internal_transfer),
        )
        .route(
            "/transfers/external",
            post(handlers::create_external_transfer),
        )
        .route("/transfers/{id}", get(handlers::get_transfer))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .with_state(state)
        // Stateless, so merged after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the process exits.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (port in use?)", addr))?;

    info!(
        addr = %addr,
        bank = %state.bank_name,
        prefix = %state.bank_prefix,
        "Gateway listening"
    );

    let app = create_router(state);
    axum::serve(listener, app)
        .await
        .context("Server error")?;
    Ok(())
}
