// shipping_desk/src/models/order_item.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable line item. `seller_id` is copied from the product when the item
/// is written and always matches it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub seller_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub created_at: DateTime<Utc>,
}

/// Input for creating a line item; the seller is never supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
}
