// shipping_desk/src/models/order.rs

use crate::models::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  fn rank(self) -> Option<u8> {
    match self {
      OrderStatus::Pending => Some(0),
      OrderStatus::Paid => Some(1),
      OrderStatus::Processing => Some(2),
      OrderStatus::Shipped => Some(3),
      OrderStatus::Delivered => Some(4),
      OrderStatus::Cancelled => None,
    }
  }

  /// Transitions only move forward. Any non-terminal state may be cancelled;
  /// delivered and cancelled orders are final.
  pub fn can_advance_to(self, next: OrderStatus) -> bool {
    match (self.rank(), next.rank()) {
      (Some(current), Some(target)) => target > current,
      (Some(_), None) => self != OrderStatus::Delivered,
      (None, _) => false,
    }
  }

  /// Orders become eligible for label purchase once paid.
  pub fn is_shippable(self) -> bool {
    matches!(self, OrderStatus::Paid | OrderStatus::Processing)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub status: OrderStatus,
  pub total_amount_cents: i64,
  pub currency: String,
  pub ship_to_name: String,
  pub ship_to_line1: String,
  pub ship_to_line2: Option<String>,
  pub ship_to_city: String,
  pub ship_to_state: String,
  pub ship_to_postal_code: String,
  pub ship_to_country: String,
  pub ship_to_phone: Option<String>,
  pub payment_intent_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// The buyer's destination address as captured at checkout.
  pub fn shipping_address(&self) -> Address {
    Address {
      name: self.ship_to_name.clone(),
      company: None,
      address_line1: self.ship_to_line1.clone(),
      address_line2: self.ship_to_line2.clone().unwrap_or_default(),
      city: self.ship_to_city.clone(),
      state: self.ship_to_state.clone(),
      postal_code: self.ship_to_postal_code.clone(),
      country: self.ship_to_country.clone(),
      phone: self.ship_to_phone.clone().unwrap_or_default(),
    }
    .normalized()
  }
}
