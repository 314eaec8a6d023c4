//! Customer-facing transfer handlers

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
};
use tracing::info;

use super::super::state::AppState;
use super::super::types::{ApiResult, CreatedResult, ErrorBody, ValidJson, created, ok};
use crate::auth::AuthUser;
use crate::transfer::{Transfer, TransferError, TransferId, TransferRequest};

/// POST /transfers
///
/// Routed by destination prefix.
#[utoipa::path(
    post,
    path = "/transfers",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer completed", content_type = "application/json"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 402, description = "Insufficient funds", body = ErrorBody),
        (status = 404, description = "Account or bank not found", body = ErrorBody),
        (status = 502, description = "Partner bank unreachable", body = ErrorBody),
        (status = 504, description = "Partner outcome unknown; needs reconciliation", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(req): ValidJson<TransferRequest>,
) -> CreatedResult<Transfer> {
    info!(
        user_id = user.user_id,
        from = %req.from_account,
        to = %req.to_account,
        amount = %req.amount,
        "Transfer requested"
    );
    created(state.transfers.submit(&req, user.user_id).await?)
}

/// POST /transfers/internal
#[utoipa::path(
    post,
    path = "/transfers/internal",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Internal transfer completed", content_type = "application/json"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 402, description = "Insufficient funds", body = ErrorBody),
        (status = 404, description = "Account or bank not found", body = ErrorBody),
        (status = 502, description = "Partner bank unreachable", body = ErrorBody),
        (status = 504, description = "Partner outcome unknown; needs reconciliation", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn create_internal_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(req): ValidJson<TransferRequest>,
) -> CreatedResult<Transfer> {
    created(state.transfers.internal(&req, user.user_id).await?)
}

/// POST /transfers/external
#[utoipa::path(
    post,
    path = "/transfers/external",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Partner bank accepted the claim", content_type = "application/json"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 402, description = "Insufficient funds", body = ErrorBody),
        (status = 404, description = "Account or bank not found", body = ErrorBody),
        (status = 502, description = "Partner bank unreachable", body = ErrorBody),
        (status = 504, description = "Partner outcome unknown; needs reconciliation", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn create_external_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(req): ValidJson<TransferRequest>,
) -> CreatedResult<Transfer> {
    created(state.transfers.external(&req, user.user_id).await?)
}

/// GET /transfers
#[utoipa::path(
    get,
    path = "/transfers",
    responses(
        (status = 200, description = "Transfers touching the caller's accounts, newest first", content_type = "application/json")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Transfer>> {
    ok(state.transfers.list_for_user(user.user_id).await?)
}

/// GET /transfers/{id}
#[utoipa::path(
    get,
    path = "/transfers/{id}",
    params(("id" = String, Path, description = "Transfer ID (ULID)")),
    responses(
        (status = 200, description = "Transfer with status history", content_type = "application/json"),
        (status = 404, description = "Not found or caller is not a party", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Transfer> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| TransferError::NotFound(format!("Transfer {}", id)))?;
    ok(state.transfers.get_for_user(transfer_id, user.user_id).await?)
}
