//! Minimal JWT payload inspection.
//!
//! The client never verifies signatures; it only reads `exp` to schedule a
//! refresh when the server does not send `expiresIn`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a compact JWT, if it has one.
pub(crate) fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    // Some issuers keep the padding; the no-pad engine rejects it
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}
