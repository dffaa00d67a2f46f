//! Authentication material for broker sessions.
//!
//! Each adapter owns exactly one [`Credential`]. Expiring credentials are
//! replaced wholesale on refresh, never mutated in place, so the credential
//! in use always carries the expiry instant it was generated with. File
//! contents (certificates, keys) are treated as opaque bytes and are never
//! logged or formatted into error messages.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default lifetime of an Azure shared-access-signature token.
pub const DEFAULT_SAS_TTL_SECS: i64 = 3600;

/// Lifetime of a Google device JWT; the bridge drops the session once this
/// window passes regardless of connection health.
pub const JWT_LIFETIME_MINS: i64 = 60;

/// TLS context inputs handed to the session layer as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Certificate-authority bundle (PEM).
    pub ca: Vec<u8>,
    /// Client certificate and private key (PEM pair), for mutual TLS.
    pub client_auth: Option<(Vec<u8>, Vec<u8>)>,
    /// Application-layer protocols the TLS handshake is restricted to.
    pub alpn: Option<Vec<String>>,
}

/// Which authentication scheme a credential carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Certificate pair; no password material and no expiry.
    MutualTls,
    /// Bearer token with an absolute expiry instant.
    SasToken,
    /// Signed assertion with an absolute expiry instant.
    JwtAssertion,
}

/// Opaque authentication material plus expiry metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    MutualTls(TlsMaterial),
    SasToken {
        token: String,
        expires_at: DateTime<Utc>,
    },
    JwtAssertion {
        token: String,
        expires_at: DateTime<Utc>,
    },
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::MutualTls(_) => CredentialKind::MutualTls,
            Credential::SasToken { .. } => CredentialKind::SasToken,
            Credential::JwtAssertion { .. } => CredentialKind::JwtAssertion,
        }
    }

    /// Absolute expiry instant, for the expiring kinds.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Credential::MutualTls(_) => None,
            Credential::SasToken { expires_at, .. }
            | Credential::JwtAssertion { expires_at, .. } => Some(*expires_at),
        }
    }

    /// The password-slot secret, for the kinds that have one.
    pub fn secret(&self) -> Option<&str> {
        match self {
            Credential::MutualTls(_) => None,
            Credential::SasToken { token, .. } | Credential::JwtAssertion { token, .. } => {
                Some(token)
            }
        }
    }
}

/// Errors while reading or computing credential material.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credential file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("shared access key is not valid base64")]
    InvalidSharedKey(#[from] base64::DecodeError),
    #[error("failed to sign device assertion: {0}")]
    AssertionSigning(#[from] jsonwebtoken::errors::Error),
}

/// Read a file-backed secret (certificate, key) as opaque bytes.
pub fn read_secret_file(path: &Path) -> Result<Vec<u8>, CredentialError> {
    std::fs::read(path).map_err(|source| CredentialError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Compute an Azure shared-access-signature token.
///
/// Signs `"{url-encoded-uri}\n{expiry-epoch-seconds}"` with HMAC-SHA256 keyed
/// by the base64-decoded shared key. The returned expiry is the instant the
/// token stops being valid, `ttl` away from now.
pub fn generate_sas_token(
    resource_uri: &str,
    shared_key_base64: &str,
    ttl: Duration,
) -> Result<(String, DateTime<Utc>), CredentialError> {
    let expires_at = Utc::now() + ttl;
    let expiry = expires_at.timestamp();
    let resource = urlencoding::encode(resource_uri);
    let key = BASE64.decode(shared_key_base64.trim())?;

    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key).expect("HMAC can take a key of any size");
    mac.update(format!("{resource}\n{expiry}").as_bytes());
    let signature = urlencoding::encode(&BASE64.encode(mac.finalize().into_bytes())).into_owned();

    Ok((
        format!("SharedAccessSignature sr={resource}&sig={signature}&se={expiry}"),
        expires_at,
    ))
}

#[derive(Serialize)]
struct DeviceClaims {
    iat: i64,
    exp: i64,
    aud: String,
}

/// Sign a Google Cloud IoT device JWT (RS256, audience = project id).
///
/// A fresh call always produces a fresh `iat`/`exp` pair; stale assertions
/// are never re-signed or extended.
pub fn create_device_jwt(
    project_id: &str,
    private_key_pem: &[u8],
) -> Result<(String, DateTime<Utc>), CredentialError> {
    let now = Utc::now();
    let expires_at = now + Duration::minutes(JWT_LIFETIME_MINS);
    let claims = DeviceClaims {
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        aud: project_id.to_string(),
    };

    let key = EncodingKey::from_rsa_pem(private_key_pem)?;
    let token = encode(&Header::new(Algorithm::RS256), &claims, &key)?;
    Ok((token, expires_at))
}
