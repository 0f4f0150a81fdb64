//! Signed admin session tokens.
//!
//! Tokens are compact HS256 JWTs: `base64url(header).base64url(claims).base64url(mac)`.
//! Verification checks structure, then signature, then expiry, then the
//! server-side revocation list.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Why a session token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("malformed session token: {0}")]
    Malformed(String),

    #[error("session token signature does not match")]
    InvalidSignature,

    #[error("session token expired")]
    Expired,

    #[error("session token has been revoked")]
    Revoked,

    #[error("session signing failed: {0}")]
    Signing(String),
}

/// Claims carried by an admin session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Admin identity (email).
    pub sub: String,
    /// Issued at, Unix seconds.
    pub iat: u64,
    /// Expiry, Unix seconds.
    pub exp: u64,
    /// Unique token id, used for revocation.
    pub jti: String,
}

impl SessionClaims {
    pub fn new(subject: impl Into<String>, ttl_secs: u64) -> Self {
        Self::issued_at(subject, unix_now(), ttl_secs)
    }

    pub fn issued_at(subject: impl Into<String>, iat: u64, ttl_secs: u64) -> Self {
        Self {
            sub: subject.into(),
            iat,
            exp: iat.saturating_add(ttl_secs),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.exp
    }
}

/// Issues and verifies admin session credentials.
///
/// The pipeline only depends on this trait, so tests can substitute fake tokens.
pub trait SessionAuthenticator: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError>;

    fn verify(&self, token: &str) -> Result<SessionClaims, AuthError>;

    /// Invalidate a verified session before its expiry.
    fn revoke(&self, claims: &SessionClaims);
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// HMAC-SHA256 token authenticator with an in-memory revocation list.
pub struct HmacSessionAuthenticator {
    secret: Vec<u8>,
    revoked: DashMap<String, u64>,
}

impl HmacSessionAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            revoked: DashMap::new(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify against an explicit clock (Unix seconds).
    pub fn verify_at(&self, token: &str, now: u64) -> Result<SessionClaims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed("token must have 3 parts".into()));
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(AuthError::Malformed(format!("unsupported alg {}", header.alg)));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|e| AuthError::Malformed(format!("signature decode failed: {e}")))?;

        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let claims: SessionClaims = decode_json(claims_b64)?;
        if claims.is_expired_at(now) {
            return Err(AuthError::Expired);
        }
        if self.revoked.contains_key(&claims.jti) {
            return Err(AuthError::Revoked);
        }

        Ok(claims)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }
}

impl SessionAuthenticator for HmacSessionAuthenticator {
    fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        let header = Header {
            alg: "HS256".into(),
            typ: "JWT".into(),
        };
        let header_b64 = encode_json(&header)?;
        let claims_b64 = encode_json(claims)?;

        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{header_b64}.{claims_b64}.{signature}"))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, unix_now())
    }

    fn revoke(&self, claims: &SessionClaims) {
        let now = unix_now();
        // Entries are only needed until the token would have expired anyway.
        self.revoked.retain(|_, exp| *exp > now);
        self.revoked.insert(claims.jti.clone(), claims.exp);
    }
}

impl std::fmt::Debug for HmacSessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSessionAuthenticator")
            .field("secret", &"<redacted>")
            .field("revoked", &self.revoked.len())
            .finish()
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let bytes = serde_json::to_vec(value).map_err(|e| AuthError::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| AuthError::Malformed(format!("base64 decode failed: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Malformed(format!("JSON parse failed: {e}")))
}

pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
