use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::types::ErrorBody;
use crate::transfer::TransferError;

impl IntoResponse for TransferError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorBody {
            status: "error".to_string(),
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_error() {
        assert_eq!(
            TransferError::InsufficientFunds.into_response().status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            TransferError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TransferError::AmbiguousOutcome("timeout".into())
                .into_response()
                .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
