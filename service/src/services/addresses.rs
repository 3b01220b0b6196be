// shipping_desk/src/services/addresses.rs

use crate::db::OrderRepository;
use crate::errors::AppError;
use crate::models::{Address, SellerProfile};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

/// Origin and destination for an order's parcel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAddresses {
  pub ship_from: Address,
  pub ship_to: Address,
  #[serde(skip)]
  pub seller: SellerProfile,
}

/// Looks up the seller's origin and the buyer's destination for `order_id`.
/// A label covers one seller's parcel, so multi-seller orders are refused.
#[instrument(skip(orders))]
pub async fn resolve_shipping_addresses(orders: &dyn OrderRepository, order_id: Uuid) -> Result<ResolvedAddresses, AppError> {
  let order = orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

  let mut sellers = orders.sellers_for_order(order_id).await?;
  let seller = match sellers.len() {
    0 => return Err(AppError::Validation(format!("order {} has no seller to ship from", order_id))),
    1 => sellers.remove(0),
    n => {
      return Err(AppError::Validation(format!(
        "order {} has items from {} sellers; labels are purchased per seller",
        order_id, n
      )))
    }
  };

  Ok(ResolvedAddresses {
    ship_from: seller.origin_address(),
    ship_to: order.shipping_address(),
    seller,
  })
}
