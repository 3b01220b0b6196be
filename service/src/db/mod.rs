// shipping_desk/src/db/mod.rs

//! Typed repository seams over the relational store.
//!
//! The shipping core needs a handful of operations and nothing else; the
//! Postgres implementation lives in `postgres`, an in-memory one (tests,
//! local runs) in `memory`.

pub mod memory;
pub mod postgres;

use crate::models::{NewOrderItem, NewShipment, Order, OrderItem, OrderStatus, SellerProfile, Shipment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  /// A uniqueness rule rejected the write.
  #[error("{0}")]
  Conflict(String),

  /// The write referenced a row that is missing or incomplete.
  #[error("{0}")]
  InvalidReference(String),

  #[error("store unavailable: {0}")]
  Unavailable(String),
}

/// Result of the `pending → paid` transition.
#[derive(Debug, Clone)]
pub enum MarkPaidOutcome {
  /// The order moved to `paid` in this call.
  Marked(Order),
  /// The order was already paid with the same payment intent (event replay).
  AlreadyPaid(Order),
  /// The order is in a state that must not become `paid` again.
  NotPending(Order),
}

#[derive(Debug, Clone)]
pub enum RecordOutcome {
  Inserted(Shipment),
  /// The same `(order, tracking number)` was recorded before; nothing was written.
  Existing(Shipment),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

  /// Atomically moves a pending order to `paid` and stores the payment intent.
  /// `None` when the order does not exist.
  async fn mark_paid(&self, order_id: Uuid, payment_intent_id: &str) -> Result<Option<MarkPaidOutcome>, StoreError>;

  /// Moves the order from `from` to `to`. Returns `false` when the order was
  /// no longer in `from` or the transition would go backwards.
  async fn advance_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool, StoreError>;

  /// Distinct sellers with items on the order.
  async fn sellers_for_order(&self, order_id: Uuid) -> Result<Vec<SellerProfile>, StoreError>;

  /// Creates a line item, copying the seller from the product. Fails with
  /// `InvalidReference` when the product is missing or has no seller.
  async fn insert_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError>;
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
  /// Idempotent on `(order_id, tracking_number)`. Fails with `Conflict` when
  /// the order already holds a different active label.
  async fn record_shipment(&self, shipment: NewShipment) -> Result<RecordOutcome, StoreError>;

  async fn find_active_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError>;

  /// Shipments created at or before `cutoff` that still hold a label URL or stored file.
  async fn expirable_shipments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Shipment>, StoreError>;

  /// Nulls label URL, tracking number and storage path. `false` if already cleared.
  async fn clear_label(&self, shipment_id: Uuid) -> Result<bool, StoreError>;
}
