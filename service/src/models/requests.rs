// shipping_desk/src/models/requests.rs

//! Request bodies. Every part is optional at the serde level so that a
//! missing part is reported as a validation error, not a parse error.

use crate::models::{Address, Parcel, ProviderId};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateQuoteRequest {
  pub ship_from: Option<Address>,
  pub ship_to: Option<Address>,
  pub parcel: Option<Parcel>,
  /// Restrict quoting to one provider; all configured providers otherwise.
  pub provider: Option<ProviderId>,
}

/// Either `{orderId, rateToken}` or `{orderId, shipFrom, shipTo, parcel}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PurchaseRequest {
  pub order_id: Option<Uuid>,
  pub rate_token: Option<String>,
  pub ship_from: Option<Address>,
  pub ship_to: Option<Address>,
  pub parcel: Option<Parcel>,
  pub provider: Option<ProviderId>,
  pub service_code: Option<String>,
  pub user_id: Option<Uuid>,
}
