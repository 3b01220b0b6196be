// shipping_desk/src/services/ledger.rs

use crate::db::{RecordOutcome, ShipmentRepository, StoreError};
use crate::models::{NewShipment, Shipment};
use crate::services::label_storage::LabelStorage;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub deleted: usize,
  pub errors: Vec<String>,
}

/// The durable record of purchased labels, keyed by order.
#[derive(Clone)]
pub struct ShipmentLedger {
  shipments: Arc<dyn ShipmentRepository>,
  storage: Option<Arc<dyn LabelStorage>>,
}

impl ShipmentLedger {
  pub fn new(shipments: Arc<dyn ShipmentRepository>, storage: Option<Arc<dyn LabelStorage>>) -> Self {
    Self { shipments, storage }
  }

  /// Records a purchase. Re-recording the same order and tracking number
  /// returns the row written the first time.
  #[instrument(skip(self, details), fields(tracking_number = %details.tracking_number))]
  pub async fn record_purchase(&self, order_id: Uuid, details: NewShipment) -> Result<Shipment, StoreError> {
    let details = NewShipment { order_id, ..details };
    match self.shipments.record_shipment(details).await? {
      RecordOutcome::Inserted(row) => {
        info!(shipment_id = %row.id, "Shipment recorded.");
        Ok(row)
      }
      RecordOutcome::Existing(row) => {
        debug!(shipment_id = %row.id, "Shipment already recorded; returning existing row.");
        Ok(row)
      }
    }
  }

  pub async fn find_active_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
    self.shipments.find_active_shipment(order_id).await
  }

  /// Purges labels older than `retention`, measured from now. A retention
  /// reaching past the earliest representable instant purges nothing.
  pub async fn expire_old(&self, retention: Duration) -> Result<SweepReport, StoreError> {
    let cutoff = Utc::now()
      .checked_sub_signed(retention)
      .unwrap_or(DateTime::<Utc>::MIN_UTC);
    self.expire_created_before(cutoff).await
  }

  /// Deletes the stored file (if any) and clears the label fields of every
  /// shipment created at or before `cutoff`. Per-item failures are collected and the
  /// sweep moves on; a row whose file could not be deleted keeps its fields so
  /// the next sweep retries it.
  #[instrument(skip(self))]
  pub async fn expire_created_before(&self, cutoff: DateTime<Utc>) -> Result<SweepReport, StoreError> {
    let candidates = self.shipments.expirable_shipments(cutoff).await?;
    let mut report = SweepReport::default();

    for shipment in candidates {
      if let Some(path) = shipment.storage_path.as_deref() {
        let Some(storage) = self.storage.as_ref() else {
          report
            .errors
            .push(format!("shipment {}: label storage is not configured", shipment.id));
          continue;
        };
        if let Err(e) = storage.delete(path).await {
          warn!(shipment_id = %shipment.id, error = %e, "Could not delete label file.");
          report.errors.push(format!("shipment {}: {}", shipment.id, e));
          continue;
        }
      }

      match self.shipments.clear_label(shipment.id).await {
        Ok(true) => report.deleted += 1,
        Ok(false) => debug!(shipment_id = %shipment.id, "Label already cleared."),
        Err(e) => {
          warn!(shipment_id = %shipment.id, error = %e, "Could not clear label reference.");
          report.errors.push(format!("shipment {}: {}", shipment.id, e));
        }
      }
    }

    info!(deleted = report.deleted, errors = report.errors.len(), "Label retention sweep finished.");
    Ok(report)
  }
}
