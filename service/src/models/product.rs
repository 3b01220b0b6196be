// shipping_desk/src/models/product.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// The slice of a product the shipping core reads.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub seller_id: Option<Uuid>,
  pub name: String,
  pub price_cents: i64,
}
