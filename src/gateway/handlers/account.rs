//! Account handlers

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use tracing::info;

use super::super::state::AppState;
use super::super::types::{
    AccountQuery, ApiResult, BankInfo, CreatedResult, ErrorBody, OpenAccountRequest, ValidJson,
    created, ok,
};
use crate::account::{Account, OpenAccount};
use crate::auth::AuthUser;

/// Every new account starts with this demonstration balance
pub const OPENING_BALANCE: Decimal = Decimal::ONE_THOUSAND;

/// POST /accounts
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = OpenAccountRequest,
    responses(
        (status = 201, description = "Account opened", content_type = "application/json"),
        (status = 400, description = "Invalid currency or name", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn open_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(req): ValidJson<OpenAccountRequest>,
) -> CreatedResult<Account> {
    let account = state
        .ledger
        .open_account(OpenAccount {
            user_id: user.user_id,
            holder_name: user.name.clone(),
            name: Some(req.name),
            currency: req.currency,
            initial_balance: OPENING_BALANCE,
        })
        .await?;
    info!(
        account = %account.account_number,
        user_id = user.user_id,
        currency = %account.currency,
        "Account opened"
    );
    created(account)
}

/// GET /accounts?currency=EUR
#[utoipa::path(
    get,
    path = "/accounts",
    params(AccountQuery),
    responses(
        (status = 200, description = "Accounts of the caller", content_type = "application/json"),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<AccountQuery>,
) -> ApiResult<Vec<Account>> {
    let mut accounts = state.ledger.list_for_user(user.user_id).await?;
    if let Some(currency) = filter.currency {
        accounts.retain(|a| a.currency == currency);
    }
    ok(accounts)
}

/// GET /accounts/{accountNumber}
///
/// Accounts of other users are reported as missing.
#[utoipa::path(
    get,
    path = "/accounts/{account_number}",
    params(("account_number" = String, Path, description = "Account number")),
    responses(
        (status = 200, description = "Account details", content_type = "application/json"),
        (status = 404, description = "No such account for the caller", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(account_number): Path<String>,
) -> ApiResult<Account> {
    ok(state
        .ledger
        .find_owned(&account_number, user.user_id)
        .await?)
}

/// GET /bank-info
#[utoipa::path(
    get,
    path = "/bank-info",
    responses(
        (status = 200, description = "Bank name and prefix", content_type = "application/json")
    ),
    security(("bearer_auth" = [])),
    tag = "System"
)]
pub async fn bank_info(State(state): State<Arc<AppState>>) -> ApiResult<BankInfo> {
    ok(BankInfo {
        name: state.bank_name.clone(),
        prefix: state.bank_prefix.clone(),
    })
}
