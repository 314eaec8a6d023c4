//! Bank-to-bank transfer claims.
//!
//! A claim is a compact RS256 token whose payload names the accounts,
//! amount and sender. The sending bank signs it with its own key; the
//! receiving bank finds that key through the central bank directory.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::money::{Currency, amount_from_json, amount_serde, check_amount};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferClaim {
    pub account_from: String,
    pub account_to: String,
    pub currency: Currency,
    #[serde(with = "amount_serde")]
    pub amount: Decimal,
    pub explanation: String,
    pub sender_name: String,
    /// RFC 3339 send time; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TransferClaim {
    pub fn new(
        account_from: impl Into<String>,
        account_to: impl Into<String>,
        currency: Currency,
        amount: Decimal,
        explanation: impl Into<String>,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            account_from: account_from.into(),
            account_to: account_to.into(),
            currency,
            amount,
            explanation: explanation.into(),
            sender_name: sender_name.into(),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    /// Build a typed claim from a verified payload, checking every field.
    pub fn from_payload(payload: &Value) -> Result<Self, String> {
        let obj = payload
            .as_object()
            .ok_or_else(|| "payload is not an object".to_string())?;

        let text = |field: &str| -> Result<String, String> {
            match obj.get(field) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(format!("{} must be a string", field)),
                None => Err(format!("missing field: {}", field)),
            }
        };
        let non_empty = |field: &str| -> Result<String, String> {
            let value = text(field)?;
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", field));
            }
            Ok(value)
        };

        let currency = non_empty("currency")?;
        let currency: Currency = currency.parse().map_err(|e| format!("{}", e))?;

        let amount = obj
            .get("amount")
            .ok_or_else(|| "missing field: amount".to_string())
            .and_then(|v| amount_from_json(v).ok_or_else(|| format!("invalid amount: {}", v)))?;
        check_amount(amount)?;

        Ok(Self {
            account_from: non_empty("accountFrom")?,
            account_to: non_empty("accountTo")?,
            currency,
            amount,
            explanation: text("explanation")?,
            sender_name: non_empty("senderName")?,
            timestamp: obj
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// What can be read from a claim before its signature is checked. Only
/// used to locate the destination and the sender's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedClaim {
    pub account_from: String,
    pub account_to: String,
    /// Header `kid`, if any
    pub key_id: Option<String>,
    pub algorithm: jsonwebtoken::Algorithm,
    /// The signature segment; identifies this exact claim for replay checks
    pub claim_id: String,
}

impl UnverifiedClaim {
    pub fn peek(token: &str) -> Result<Self, String> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| e.to_string())?;

        let mut parts = token.split('.');
        let (Some(_), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err("token must have three segments".to_string());
        };
        if signature.is_empty() {
            return Err("token is unsigned".to_string());
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| format!("payload is not base64url: {}", e))?;
        let payload: Value =
            serde_json::from_slice(&bytes).map_err(|e| format!("payload is not JSON: {}", e))?;

        let field = |name: &str| {
            payload
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("missing field: {}", name))
        };

        Ok(Self {
            account_from: field("accountFrom")?,
            account_to: field("accountTo")?,
            key_id: header.kid,
            algorithm: header.alg,
            claim_id: signature.to_string(),
        })
    }
}
