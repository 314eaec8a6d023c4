//! Request and response bodies of the HTTP gateway.

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::money::Currency;
use crate::transfer::TransferError;

/// Success envelope: `{"status": "success", "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// Error envelope: `{"status": "error", "code": ..., "message": ...}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub status: String,
    pub code: String,
    pub message: String,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, TransferError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// `201 Created` with the success envelope
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), TransferError>;

pub fn created<T>(data: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

/// JSON body extractor that runs `validator` rules before the handler sees the value.
///
/// Malformed bodies and rule violations both surface as `ValidationError`.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = TransferError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value): Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| TransferError::Validation(format!("Invalid JSON: {}", e.body_text())))?;
        value
            .validate()
            .map_err(|e| TransferError::Validation(e.to_string()))?;
        Ok(ValidJson(value))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub currency: Currency,
    #[validate(length(min = 2, max = 50, message = "Account name must be between 2 and 50 characters"))]
    pub name: String,
}

/// Query filter for `GET /accounts`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountQuery {
    pub currency: Option<Currency>,
}

/// Body of `POST /transfers/incoming`
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct IncomingClaimRequest {
    /// Compact RS256 claim signed by the sending bank
    #[serde(default)]
    pub jwt: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BankInfo {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub timestamp_ms: i64,
    /// `up`, `down`, or `disabled` when running on in-memory storage
    #[schema(value_type = String, example = "up")]
    pub database: &'static str,
}
