// shipping_desk/src/services/payment_signature.rs

//! Verification of payment-provider webhook signatures.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=...]`. The signed
//! message is `"<t>.<raw body>"`, keyed with the endpoint secret.

use crate::errors::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, AppError> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("invalid webhook secret: {}", e)))?;
  mac.update(timestamp.to_string().as_bytes());
  mac.update(b".");
  mac.update(payload);
  Ok(mac)
}

/// Checks `header` against `payload`. Any mismatch, malformed header or stale
/// timestamp is an `AppError::Auth`.
pub fn verify_signature(
  payload: &[u8],
  header: &str,
  secret: &str,
  tolerance_secs: i64,
  now_unix: i64,
) -> Result<(), AppError> {
  let mut timestamp: Option<i64> = None;
  let mut candidates: Vec<Vec<u8>> = Vec::new();
  for part in header.split(',') {
    match part.trim().split_once('=') {
      Some(("t", value)) => timestamp = value.parse().ok(),
      Some(("v1", value)) => {
        if let Ok(bytes) = hex::decode(value) {
          candidates.push(bytes);
        }
      }
      _ => {}
    }
  }

  let timestamp = timestamp.ok_or_else(|| AppError::Auth("signature header has no timestamp".to_string()))?;
  if candidates.is_empty() {
    return Err(AppError::Auth("signature header has no v1 signature".to_string()));
  }
  // Extreme timestamps overflow the subtraction; treat them as out of tolerance.
  match now_unix.checked_sub(timestamp).map(i64::unsigned_abs) {
    Some(age) if age <= tolerance_secs.max(0).unsigned_abs() => {}
    _ => return Err(AppError::Auth("signature timestamp outside tolerance".to_string())),
  }

  for candidate in &candidates {
    // verify_slice consumes the mac, so each candidate gets a fresh one.
    if mac_for(secret, timestamp, payload)?.verify_slice(candidate).is_ok() {
      return Ok(());
    }
  }
  Err(AppError::Auth("signature mismatch".to_string()))
}

/// Produces a header value for `payload`; the counterpart of [`verify_signature`].
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AppError> {
  let signature = hex::encode(mac_for(secret, timestamp, payload)?.finalize().into_bytes());
  Ok(format!("t={},v1={}", timestamp, signature))
}
