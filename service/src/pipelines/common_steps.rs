// shipping_desk/src/pipelines/common_steps.rs

//! Helpers shared by the rate and purchase pipelines.

use crate::errors::AppError;
use crate::models::{Address, Parcel, ProviderId, ShipmentSpec};
use crate::services::providers::{ProviderSet, ShippingProvider};
use std::sync::Arc;

/// Validates and normalizes the three parts of a shipment. Every problem is
/// reported at once, prefixed with the part it belongs to.
pub fn build_shipment_spec(
  ship_from: Option<&Address>,
  ship_to: Option<&Address>,
  parcel: Option<&Parcel>,
) -> Result<ShipmentSpec, AppError> {
  let mut problems = Vec::new();

  let mut address = |label: &str, raw: Option<&Address>| -> Option<Address> {
    match raw {
      None => {
        problems.push(format!("{} is required", label));
        None
      }
      Some(raw) => {
        let normalized = raw.normalized();
        problems.extend(normalized.problems().into_iter().map(|p| format!("{}.{}", label, p)));
        Some(normalized)
      }
    }
  };
  let ship_from = address("shipFrom", ship_from);
  let ship_to = address("shipTo", ship_to);

  match parcel {
    None => problems.push("parcel is required".to_string()),
    Some(p) => problems.extend(p.problems().into_iter().map(|msg| format!("parcel.{}", msg))),
  }

  match (ship_from, ship_to, parcel) {
    (Some(ship_from), Some(ship_to), Some(parcel)) if problems.is_empty() => Ok(ShipmentSpec {
      ship_from,
      ship_to,
      parcel: parcel.clone(),
    }),
    _ => Err(AppError::Validation(problems.join("; "))),
  }
}

/// Looks up an enabled provider by id.
pub fn require_provider(providers: &ProviderSet, id: ProviderId) -> Result<Arc<dyn ShippingProvider>, AppError> {
  providers
    .get(id)
    .ok_or_else(|| AppError::Validation(format!("shipping provider '{}' is not enabled", id)))
}
