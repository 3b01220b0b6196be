// shipping_desk/src/models/rate.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The shipping-rate providers this service can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
  /// REST multi-carrier aggregator.
  ShipEngine,
  /// A single carrier's own rating/shipping API.
  CarrierDirect,
}

impl ProviderId {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProviderId::ShipEngine => "ship_engine",
      ProviderId::CarrierDirect => "carrier_direct",
    }
  }
}

impl fmt::Display for ProviderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ProviderId {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "ship_engine" | "shipengine" => Ok(ProviderId::ShipEngine),
      "carrier_direct" | "carrier" => Ok(ProviderId::CarrierDirect),
      other => Err(format!("unknown shipping provider '{}'", other)),
    }
  }
}

/// A rate as a provider client reports it, before it is tokenized.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotedRate {
  /// Provider-side rate id, for providers that can purchase by id.
  pub rate_id: Option<String>,
  pub carrier_id: String,
  pub carrier: String,
  pub service_code: String,
  pub service_name: String,
  pub amount_cents: i64,
  pub currency: String,
  pub estimated_days: Option<u32>,
}

impl QuotedRate {
  /// Non-empty carrier and service, non-negative price, three-letter currency.
  pub fn is_well_formed(&self) -> bool {
    !self.carrier.trim().is_empty()
      && !self.service_code.trim().is_empty()
      && self.amount_cents >= 0
      && is_currency_code(&self.currency)
  }
}

pub fn is_currency_code(code: &str) -> bool {
  code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Converts a provider decimal amount to minor units.
pub fn to_cents(amount: f64) -> i64 {
  (amount * 100.0).round() as i64
}

/// Provider-agnostic quote returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
  pub provider: ProviderId,
  pub carrier: String,
  pub carrier_id: String,
  pub service_code: String,
  pub service_name: String,
  /// Decimal price for display; `amount_cents` is authoritative.
  pub price: f64,
  pub amount_cents: i64,
  pub currency: String,
  pub estimated_days: Option<u32>,
  /// Opaque token accepted by the purchase endpoint.
  pub rate_token: String,
}

/// What a provider hands back after selling a label.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasedLabel {
  pub provider: ProviderId,
  pub label_id: Option<String>,
  pub rate_id: Option<String>,
  pub service_code: String,
  pub carrier_id: String,
  pub carrier: String,
  pub tracking_number: String,
  pub label_url: String,
  pub amount_cents: i64,
  pub currency: String,
}
