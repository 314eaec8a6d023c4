use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::AuthUser;
use crate::gateway::state::AppState;
use crate::transfer::TransferError;

/// Require `Authorization: Bearer <jwt>` and inject [`AuthUser`].
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, TransferError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(TransferError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(TransferError::Unauthorized)?;

    let user: AuthUser = state.tokens.verify(token.trim()).map_err(|e| {
        debug!(error = %e, "Bearer token rejected");
        TransferError::Unauthorized
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
