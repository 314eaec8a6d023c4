//! Public key discovery for partner banks

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::super::state::AppState;
use crate::central_bank::KEY_SET_TTL_SECONDS;
use crate::transfer::{TransferError, serve_key_set};

/// GET /jwks.json, GET /transfers/keys
///
/// Bare JWKS document, no envelope: partners parse it with stock JWKS clients.
#[utoipa::path(
    get,
    path = "/jwks.json",
    responses(
        (status = 200, description = "JWKS with this bank's RS256 public key", content_type = "application/json")
    ),
    tag = "Bank-to-Bank"
)]
pub async fn get_key_set(State(state): State<Arc<AppState>>) -> Result<Response, TransferError> {
    let jwks = serve_key_set(&state.keys)?;
    let cache_control = format!("public, max-age={}", KEY_SET_TTL_SECONDS);
    Ok(([(header::CACHE_CONTROL, cache_control)], Json(jwks)).into_response())
}
