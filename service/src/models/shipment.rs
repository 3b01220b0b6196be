// shipping_desk/src/models/shipment.rs

use crate::models::{Parcel, ProviderId, PurchasedLabel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A purchased label as stored in the `shipments` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub provider: String,
  pub rate_id: Option<String>,
  pub service_code: String,
  pub length_in: Option<f64>,
  pub width_in: Option<f64>,
  pub height_in: Option<f64>,
  pub weight_oz: f64,
  pub label_url: Option<String>,
  pub tracking_number: Option<String>,
  pub carrier_id: String,
  pub amount_cents: i64,
  pub currency: String,
  pub created_at: DateTime<Utc>,
  pub user_id: Option<Uuid>,
  pub storage_path: Option<String>,
  pub provider_label_id: Option<String>,
}

impl Shipment {
  /// A shipment is active while it still references a label.
  pub fn is_active(&self) -> bool {
    self.label_url.is_some()
  }

  /// Whether the retention sweeper still has something to reclaim.
  pub fn holds_label_artifacts(&self) -> bool {
    self.label_url.is_some() || self.storage_path.is_some()
  }
}

/// Row to insert for a freshly purchased label.
#[derive(Debug, Clone)]
pub struct NewShipment {
  pub order_id: Uuid,
  pub provider: ProviderId,
  pub rate_id: Option<String>,
  pub service_code: String,
  pub parcel: Parcel,
  pub label_url: String,
  pub tracking_number: String,
  pub carrier_id: String,
  pub amount_cents: i64,
  pub currency: String,
  pub user_id: Option<Uuid>,
  pub storage_path: Option<String>,
  pub provider_label_id: Option<String>,
}

impl NewShipment {
  pub fn from_purchase(
    order_id: Uuid,
    parcel: &Parcel,
    label: &PurchasedLabel,
    storage_path: Option<String>,
    user_id: Option<Uuid>,
  ) -> Self {
    Self {
      order_id,
      provider: label.provider,
      rate_id: label.rate_id.clone(),
      service_code: label.service_code.clone(),
      parcel: parcel.clone(),
      label_url: label.label_url.clone(),
      tracking_number: label.tracking_number.clone(),
      carrier_id: label.carrier_id.clone(),
      amount_cents: label.amount_cents,
      currency: label.currency.clone(),
      user_id,
      storage_path,
      provider_label_id: label.label_id.clone(),
    }
  }
}

/// Everything needed to find a sold label at the provider when the local
/// write failed after the purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelReceipt {
  pub order_id: Uuid,
  pub provider: ProviderId,
  pub label_id: Option<String>,
  pub label_url: String,
  pub tracking_number: String,
  pub amount_cents: i64,
  pub currency: String,
}

impl LabelReceipt {
  pub fn for_label(order_id: Uuid, label: &PurchasedLabel) -> Self {
    Self {
      order_id,
      provider: label.provider,
      label_id: label.label_id.clone(),
      label_url: label.label_url.clone(),
      tracking_number: label.tracking_number.clone(),
      amount_cents: label.amount_cents,
      currency: label.currency.clone(),
    }
  }
}
