//! Bank-to-bank endpoint. Authenticated by the claim signature, not a bearer token.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::debug;

use super::super::state::AppState;
use super::super::types::{ErrorBody, IncomingClaimRequest};
use crate::transfer::{InboundReceipt, TransferError};

/// POST /transfers/incoming
///
/// Answers a bare `{"receiverName": ...}` on success; partner banks read that field directly.
#[utoipa::path(
    post,
    path = "/transfers/incoming",
    request_body = IncomingClaimRequest,
    responses(
        (status = 200, description = "Claim settled; body is `{receiverName}`", content_type = "application/json"),
        (status = 400, description = "Missing, malformed, unverifiable or invalid claim", body = ErrorBody),
        (status = 404, description = "Destination account not found", body = ErrorBody),
        (status = 409, description = "Claim already in flight or failed", body = ErrorBody),
        (status = 502, description = "Sender key set unavailable", body = ErrorBody)
    ),
    tag = "Bank-to-Bank"
)]
pub async fn receive_incoming(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IncomingClaimRequest>, JsonRejection>,
) -> Result<Json<InboundReceipt>, TransferError> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => {
            debug!(error = %e, "Unreadable incoming claim body");
            IncomingClaimRequest::default()
        }
    };
    let token = req.jwt.unwrap_or_default();
    Ok(Json(state.transfers.receive_claim(&token).await?))
}
