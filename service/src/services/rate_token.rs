// shipping_desk/src/services/rate_token.rs

//! Opaque rate tokens handed to callers with each quote.
//!
//! A token is URL-safe base64 (no padding) of a small JSON document naming the
//! originating provider, the provider rate id when there is one, the service
//! and the shipment it was quoted for. Providers without server-side rate ids
//! are purchased from the embedded shipment.

use crate::errors::AppError;
use crate::models::{ProviderId, QuotedRate, ShipmentSpec};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTokenPayload {
  pub provider: ProviderId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rate_id: Option<String>,
  pub service_code: String,
  pub carrier_id: String,
  pub carrier: String,
  pub shipment: ShipmentSpec,
}

impl RateTokenPayload {
  pub fn for_quote(provider: ProviderId, quote: &QuotedRate, shipment: &ShipmentSpec) -> Self {
    Self {
      provider,
      rate_id: quote.rate_id.clone(),
      service_code: quote.service_code.clone(),
      carrier_id: quote.carrier_id.clone(),
      carrier: quote.carrier.clone(),
      shipment: shipment.clone(),
    }
  }
}

pub fn encode(payload: &RateTokenPayload) -> Result<String, AppError> {
  let json = serde_json::to_vec(payload).map_err(|e| AppError::Internal(format!("rate token encoding failed: {}", e)))?;
  Ok(URL_SAFE_NO_PAD.encode(json))
}

pub fn decode(token: &str) -> Result<RateTokenPayload, AppError> {
  let bytes = URL_SAFE_NO_PAD
    .decode(token.trim())
    .map_err(|_| AppError::Validation("rateToken is malformed".to_string()))?;
  let payload: RateTokenPayload =
    serde_json::from_slice(&bytes).map_err(|_| AppError::Validation("rateToken is malformed".to_string()))?;
  if payload.service_code.trim().is_empty() {
    return Err(AppError::Validation("rateToken has no service code".to_string()));
  }
  Ok(payload)
}
