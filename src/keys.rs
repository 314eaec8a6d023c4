//! Bank signing identity.
//!
//! One RSA-2048 keypair per bank instance, persisted as PKCS#1 PEM under the
//! configured key directory. Partner banks learn the public half from our
//! JWKS endpoint and use it to verify the claims we send them.
//!
//! The keypair is created lazily on first use. [`KeyManager`] guards that
//! path with a [`OnceCell`], so concurrent first callers observe exactly one
//! generated key.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::OnceCell;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Key identifier published in our JWKS and stamped on every claim header
pub const KEY_ID: &str = "1";
pub const KEY_BITS: usize = 2048;

const PRIVATE_KEY_FILE: &str = "private.pem";
const PUBLIC_KEY_FILE: &str = "public.pem";

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key generation failed: {0}")]
    Generate(String),

    #[error("Key encoding failed: {0}")]
    Encode(String),

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// One entry of a JSON Web Key Set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    pub n: String,
    pub e: String,
}

impl Jwk {
    fn from_public_key(key: &RsaPublicKey) -> Self {
        Self {
            kty: "RSA".to_string(),
            key_use: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
            kid: Some(KEY_ID.to_string()),
            n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
        }
    }

    pub fn decoding_key(&self) -> Result<DecodingKey, jsonwebtoken::errors::Error> {
        DecodingKey::from_rsa_components(&self.n, &self.e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Key named by `kid`; with no `kid`, the first RSA key.
    pub fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None => self.keys.iter().find(|k| k.kty == "RSA"),
        }
    }
}

struct SigningIdentity {
    encoding_key: EncodingKey,
    jwk: Jwk,
}

pub struct KeyManager {
    key_dir: PathBuf,
    identity: OnceCell<SigningIdentity>,
}

impl KeyManager {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
            identity: OnceCell::new(),
        }
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Load the persisted keypair, generating and persisting one if absent.
    /// Idempotent.
    pub fn ensure_identity(&self) -> Result<(), KeyError> {
        self.identity().map(|_| ())
    }

    fn identity(&self) -> Result<&SigningIdentity, KeyError> {
        self.identity
            .get_or_try_init(|| load_or_generate(&self.key_dir))
    }

    /// Sign `claims` into a compact RS256 token with header `kid = "1"`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, KeyError> {
        let identity = self.identity()?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KEY_ID.to_string());
        Ok(jsonwebtoken::encode(&header, claims, &identity.encoding_key)?)
    }

    /// Our public key as a single-entry JWKS.
    pub fn export_key_set(&self) -> Result<Jwks, KeyError> {
        let identity = self.identity()?;
        Ok(Jwks {
            keys: vec![identity.jwk.clone()],
        })
    }
}

/// Verify an RS256 token against `jwk` and decode its claims.
///
/// Claims are treated as opaque payload: no `exp`/`nbf`/`aud` requirements.
pub fn verify_claim<T: DeserializeOwned>(
    token: &str,
    jwk: &Jwk,
) -> Result<T, jsonwebtoken::errors::Error> {
    let key = jwk.decoding_key()?;
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    Ok(jsonwebtoken::decode::<T>(token, &key, &validation)?.claims)
}

fn load_or_generate(dir: &Path) -> Result<SigningIdentity, KeyError> {
    let private_path = dir.join(PRIVATE_KEY_FILE);

    let private_key = if private_path.exists() {
        let pem = fs::read_to_string(&private_path)?;
        RsaPrivateKey::from_pkcs1_pem(&pem).map_err(|e| KeyError::Encode(e.to_string()))?
    } else {
        info!(dir = %dir.display(), bits = KEY_BITS, "Generating bank signing keypair");
        let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, KEY_BITS)
            .map_err(|e| KeyError::Generate(e.to_string()))?;
        persist(dir, &key)?;
        key
    };

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encode(e.to_string()))?;
    let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())?;
    let jwk = Jwk::from_public_key(&RsaPublicKey::from(&private_key));

    Ok(SigningIdentity { encoding_key, jwk })
}

fn persist(dir: &Path, key: &RsaPrivateKey) -> Result<(), KeyError> {
    fs::create_dir_all(dir)?;

    let private_pem = key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encode(e.to_string()))?;
    let public_pem = RsaPublicKey::from(key)
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encode(e.to_string()))?;

    // Public half first: a crash between the writes leaves no private key,
    // and the next start regenerates both.
    fs::write(dir.join(PUBLIC_KEY_FILE), public_pem.as_bytes())?;
    let tmp = dir.join(format!("{}.tmp", PRIVATE_KEY_FILE));
    fs::write(&tmp, private_pem.as_bytes())?;
    fs::rename(&tmp, dir.join(PRIVATE_KEY_FILE))?;
    Ok(())
}
