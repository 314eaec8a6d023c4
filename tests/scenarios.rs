//! End-to-end transfer scenarios over in-memory storage.

mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{Router, http::StatusCode, routing::post};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;

use common::*;
use interbank::AppState;
use interbank::central_bank::StaticDirectory;
use interbank::keys::KeyManager;
use interbank::money::Currency;
use interbank::transfer::{
    HttpClaimTransport, Transfer, TransferClaim, TransferRequest, TransferStatus,
};

const LOCAL: &str = "353";
const PARTNER: &str = "512";
const PARTNER_URL: &str = "http://partner.invalid";

fn transport() -> Arc<HttpClaimTransport> {
    Arc::new(HttpClaimTransport::new(Duration::from_secs(2)).unwrap())
}

/// Local bank that knows `512` and trusts the second test keypair for it
fn bank_with_partner() -> Arc<AppState> {
    let directory = StaticDirectory::new()
        .with_bank(directory_entry(PARTNER, PARTNER_URL))
        .with_key_set(
            format!("{}/jwks.json", PARTNER_URL),
            second_bank_keys().export_key_set().unwrap(),
        );
    memory_bank(
        LOCAL,
        first_bank_keys(),
        Arc::new(directory),
        transport(),
        fast_policy(),
    )
}

fn request(from: &str, to: &str, amount: i64, explanation: &str) -> TransferRequest {
    TransferRequest {
        from_account: from.to_string(),
        to_account: to.to_string(),
        amount: Decimal::from(amount),
        currency: None,
        explanation: explanation.to_string(),
    }
}

fn assert_valid_history(transfer: &Transfer) {
    let path: Vec<TransferStatus> = transfer.status_history.iter().map(|e| e.status).collect();
    let valid = [
        vec![TransferStatus::Pending],
        vec![TransferStatus::Pending, TransferStatus::InProgress],
        vec![TransferStatus::Pending, TransferStatus::Failed],
        vec![
            TransferStatus::Pending,
            TransferStatus::InProgress,
            TransferStatus::Completed,
        ],
        vec![
            TransferStatus::Pending,
            TransferStatus::InProgress,
            TransferStatus::Failed,
        ],
    ];
    assert!(valid.contains(&path), "invalid status path {:?}", path);
    assert_eq!(path.last(), Some(&transfer.status));
}

#[tokio::test]
async fn scenario_a_internal_transfer() {
    let bank = bank_with_partner();
    let a1 = open(&bank, 1, Currency::Eur, 1000).await;
    let a2 = open(&bank, 2, Currency::Eur, 0).await;

    let transfer = bank
        .transfers
        .submit(&request(&a1, &a2, 150, "rent"), 1)
        .await
        .unwrap();

    assert_eq!(transfer.status, TransferStatus::Completed);
    assert_eq!(transfer.explanation, "rent");
    assert_eq!(transfer.receiver_name.as_deref(), Some("User 2"));
    assert_valid_history(&transfer);
    assert_eq!(balance(&bank, &a1).await, Decimal::from(850));
    assert_eq!(balance(&bank, &a2).await, Decimal::from(150));
}

#[tokio::test]
async fn scenario_b_insufficient_funds() {
    let bank = bank_with_partner();
    let a1 = open(&bank, 1, Currency::Eur, 100).await;
    let a2 = open(&bank, 2, Currency::Eur, 0).await;

    let err = bank
        .transfers
        .submit(&request(&a1, &a2, 150, "rent"), 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "InsufficientFunds");

    assert_eq!(balance(&bank, &a1).await, Decimal::from(100));
    assert_eq!(balance(&bank, &a2).await, Decimal::ZERO);
    for t in bank.transfers.list_for_user(1).await.unwrap() {
        assert!(t.status.is_terminal());
        assert_eq!(t.status, TransferStatus::Failed);
        assert_valid_history(&t);
    }
}

#[tokio::test]
async fn scenario_c_unknown_bank() {
    let bank = bank_with_partner();
    let a1 = open(&bank, 1, Currency::Eur, 1000).await;

    let err = bank
        .transfers
        .submit(&request(&a1, "999000111222", 100, "gift"), 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UnknownBank");

    let transfers = bank.transfers.list_for_user(1).await.unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].status, TransferStatus::Failed);
    assert!(transfers[0].is_external);
    assert_valid_history(&transfers[0]);
    assert_eq!(balance(&bank, &a1).await, Decimal::from(1000));
}

fn tamper_amount(token: &str, amount: f64) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    let mut payload: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    payload["amount"] = serde_json::json!(amount);
    let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
    format!("{}.{}.{}", parts[0], forged, parts[2])
}

#[tokio::test]
async fn scenario_d_tampered_inbound_claim() {
    let bank = bank_with_partner();
    let dest = open(&bank, 2, Currency::Eur, 0).await;

    let claim = TransferClaim::new(
        "512a7b23c4d5e6f7",
        dest.clone(),
        Currency::Eur,
        Decimal::from(300),
        "Investment return",
        "Alice Johnson",
    );
    let token = second_bank_keys().sign(&claim).unwrap();

    let err = bank
        .transfers
        .receive_claim(&tamper_amount(&token, 3000.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "InvalidSignature");
    assert_eq!(balance(&bank, &dest).await, Decimal::ZERO);
    assert!(bank.transfers.list_for_user(2).await.unwrap().is_empty());

    // The untouched claim still settles
    let receipt = bank.transfers.receive_claim(&token).await.unwrap();
    assert_eq!(receipt.receiver_name, "User 2");
    assert_eq!(balance(&bank, &dest).await, Decimal::from(300));
}

#[tokio::test]
async fn scenario_e_partner_errors_exhaust_retries() {
    let hits: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = hits.clone();
    let partner = Router::new().route(
        "/transfers/incoming",
        post(move || {
            let hits = recorder.clone();
            async move {
                hits.lock().unwrap().push(Instant::now());
                (StatusCode::INTERNAL_SERVER_ERROR, "boom")
            }
        }),
    );
    let (listener, partner_url) = bind().await;
    tokio::spawn(async move {
        axum::serve(listener, partner).await.unwrap();
    });

    let directory = StaticDirectory::new().with_bank(directory_entry(PARTNER, &partner_url));
    let bank = memory_bank(
        LOCAL,
        first_bank_keys(),
        Arc::new(directory),
        transport(),
        fast_policy(),
    );
    let a1 = open(&bank, 1, Currency::Eur, 1000).await;

    let err = bank
        .transfers
        .submit(&request(&a1, "512a7b23c4d5e6f7", 100, "invoice"), 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PartnerUnreachable");
    assert!(err.to_string().contains("3 attempts"), "{}", err);

    let hits = hits.lock().unwrap().clone();
    assert_eq!(hits.len(), 3);
    let first_gap = hits[1] - hits[0];
    let second_gap = hits[2] - hits[1];
    assert!(first_gap >= Duration::from_millis(20));
    assert!(second_gap >= Duration::from_millis(40));

    assert_eq!(balance(&bank, &a1).await, Decimal::from(1000));
    let transfer = bank.transfers.list_for_user(1).await.unwrap().remove(0);
    assert_eq!(transfer.status, TransferStatus::Failed);
    assert_valid_history(&transfer);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_never_overdraw() {
    let bank = bank_with_partner();
    let a1 = open(&bank, 1, Currency::Eur, 100).await;
    let a2 = open(&bank, 2, Currency::Eur, 0).await;

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let bank = bank.clone();
            let req = request(&a1, &a2, 15, &format!("part {}", i));
            tokio::spawn(async move { bank.transfers.submit(&req, 1).await })
        })
        .collect();
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 6);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), "InsufficientFunds");
    }

    // Conservation: nothing created or lost across the pair
    assert_eq!(balance(&bank, &a1).await, Decimal::from(10));
    assert_eq!(balance(&bank, &a2).await, Decimal::from(90));

    let transfers = bank.transfers.list_for_user(1).await.unwrap();
    assert_eq!(transfers.len(), 10);
    for t in &transfers {
        assert!(t.status.is_terminal());
        assert_valid_history(t);
    }
}

#[tokio::test]
async fn cross_currency_internal_transfer() {
    let bank = bank_with_partner();
    let eur = open(&bank, 1, Currency::Eur, 1000).await;
    let usd = open(&bank, 1, Currency::Usd, 0).await;

    let transfer = bank
        .transfers
        .submit(&request(&eur, &usd, 100, "fx"), 1)
        .await
        .unwrap();
    assert_eq!(transfer.currency, Currency::Eur);
    assert_eq!(balance(&bank, &eur).await, Decimal::from(900));
    assert_eq!(balance(&bank, &usd).await, Decimal::new(10900, 2));
}

#[test]
fn key_export_is_stable_across_reloads() {
    let keys = first_bank_keys();
    let first = keys.export_key_set().unwrap();
    assert_eq!(first, keys.export_key_set().unwrap());

    let reloaded = KeyManager::new(keys.key_dir());
    assert_eq!(first, reloaded.export_key_set().unwrap());

    let jwk = &first.keys[0];
    assert_eq!(jwk.kty, "RSA");
    assert_eq!(jwk.kid.as_deref(), Some("1"));
    assert_eq!(jwk.alg.as_deref(), Some("RS256"));
    assert_eq!(jwk.key_use.as_deref(), Some("sig"));
}
