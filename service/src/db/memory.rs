// shipping_desk/src/db/memory.rs

use super::{MarkPaidOutcome, OrderRepository, RecordOutcome, ShipmentRepository, StoreError};
use crate::models::{NewOrderItem, NewShipment, Order, OrderItem, OrderStatus, Product, SellerProfile, Shipment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  orders: HashMap<Uuid, Order>,
  products: HashMap<Uuid, Product>,
  sellers: HashMap<Uuid, SellerProfile>,
  items: Vec<OrderItem>,
  shipments: Vec<Shipment>,
}

/// In-process store with the same uniqueness rules as the Postgres schema.
/// Used by the test suite and for local runs with `DATABASE_URL=memory`.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
  fail_shipment_writes: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_order(&self, order: Order) {
    self.tables.lock().orders.insert(order.id, order);
  }

  pub fn insert_product(&self, product: Product) {
    self.tables.lock().products.insert(product.id, product);
  }

  pub fn insert_seller(&self, seller: SellerProfile) {
    self.tables.lock().sellers.insert(seller.seller_id, seller);
  }

  pub fn order(&self, order_id: Uuid) -> Option<Order> {
    self.tables.lock().orders.get(&order_id).cloned()
  }

  pub fn shipments(&self) -> Vec<Shipment> {
    self.tables.lock().shipments.clone()
  }

  pub fn order_items(&self, order_id: Uuid) -> Vec<OrderItem> {
    self.tables.lock().items.iter().filter(|i| i.order_id == order_id).cloned().collect()
  }

  /// Rewrites a shipment's creation time so retention can be exercised.
  pub fn backdate_shipment(&self, shipment_id: Uuid, created_at: DateTime<Utc>) {
    if let Some(s) = self.tables.lock().shipments.iter_mut().find(|s| s.id == shipment_id) {
      s.created_at = created_at;
    }
  }

  /// Makes every subsequent `record_shipment` fail as if the database were down.
  pub fn fail_shipment_writes(&self, fail: bool) {
    self.fail_shipment_writes.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl OrderRepository for MemoryStore {
  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.order(order_id))
  }

  async fn mark_paid(&self, order_id: Uuid, payment_intent_id: &str) -> Result<Option<MarkPaidOutcome>, StoreError> {
    let mut tables = self.tables.lock();
    let Some(order) = tables.orders.get_mut(&order_id) else {
      return Ok(None);
    };
    let outcome = match order.status {
      OrderStatus::Pending => {
        order.status = OrderStatus::Paid;
        order.payment_intent_id = Some(payment_intent_id.to_string());
        order.updated_at = Utc::now();
        MarkPaidOutcome::Marked(order.clone())
      }
      OrderStatus::Paid if order.payment_intent_id.as_deref() == Some(payment_intent_id) => {
        MarkPaidOutcome::AlreadyPaid(order.clone())
      }
      _ => MarkPaidOutcome::NotPending(order.clone()),
    };
    Ok(Some(outcome))
  }

  async fn advance_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool, StoreError> {
    if !from.can_advance_to(to) {
      return Ok(false);
    }
    let mut tables = self.tables.lock();
    match tables.orders.get_mut(&order_id) {
      Some(order) if order.status == from => {
        order.status = to;
        order.updated_at = Utc::now();
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn sellers_for_order(&self, order_id: Uuid) -> Result<Vec<SellerProfile>, StoreError> {
    let tables = self.tables.lock();
    let mut seller_ids: Vec<Uuid> = tables
      .items
      .iter()
      .filter(|i| i.order_id == order_id)
      .map(|i| i.seller_id)
      .collect();
    seller_ids.sort();
    seller_ids.dedup();
    Ok(seller_ids.iter().filter_map(|id| tables.sellers.get(id).cloned()).collect())
  }

  async fn insert_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError> {
    if item.quantity <= 0 {
      return Err(StoreError::InvalidReference("quantity must be positive".to_string()));
    }
    let mut tables = self.tables.lock();
    let seller_id = tables
      .products
      .get(&item.product_id)
      .and_then(|p| p.seller_id)
      .ok_or_else(|| {
        StoreError::InvalidReference(format!("product {} does not exist or has no seller", item.product_id))
      })?;
    let row = OrderItem {
      id: Uuid::new_v4(),
      order_id: item.order_id,
      product_id: item.product_id,
      seller_id,
      quantity: item.quantity,
      unit_price_cents: item.unit_price_cents,
      created_at: Utc::now(),
    };
    tables.items.push(row.clone());
    Ok(row)
  }
}

#[async_trait]
impl ShipmentRepository for MemoryStore {
  async fn record_shipment(&self, shipment: NewShipment) -> Result<RecordOutcome, StoreError> {
    if self.fail_shipment_writes.load(Ordering::SeqCst) {
      return Err(StoreError::Unavailable("shipment writes are disabled".to_string()));
    }
    let mut tables = self.tables.lock();
    if let Some(existing) = tables
      .shipments
      .iter()
      .find(|s| s.order_id == shipment.order_id && s.tracking_number.as_deref() == Some(shipment.tracking_number.as_str()))
    {
      return Ok(RecordOutcome::Existing(existing.clone()));
    }
    if tables.shipments.iter().any(|s| s.order_id == shipment.order_id && s.is_active()) {
      return Err(StoreError::Conflict(format!(
        "order {} already has an active shipping label",
        shipment.order_id
      )));
    }
    let row = Shipment {
      id: Uuid::new_v4(),
      order_id: shipment.order_id,
      provider: shipment.provider.to_string(),
      rate_id: shipment.rate_id,
      service_code: shipment.service_code,
      length_in: shipment.parcel.length_in,
      width_in: shipment.parcel.width_in,
      height_in: shipment.parcel.height_in,
      weight_oz: shipment.parcel.weight_oz,
      label_url: Some(shipment.label_url),
      tracking_number: Some(shipment.tracking_number),
      carrier_id: shipment.carrier_id,
      amount_cents: shipment.amount_cents,
      currency: shipment.currency,
      created_at: Utc::now(),
      user_id: shipment.user_id,
      storage_path: shipment.storage_path,
      provider_label_id: shipment.provider_label_id,
    };
    tables.shipments.push(row.clone());
    Ok(RecordOutcome::Inserted(row))
  }

  async fn find_active_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
    let tables = self.tables.lock();
    Ok(
      tables
        .shipments
        .iter()
        .filter(|s| s.order_id == order_id && s.is_active())
        .max_by_key(|s| s.created_at)
        .cloned(),
    )
  }

  async fn expirable_shipments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Shipment>, StoreError> {
    let tables = self.tables.lock();
    let mut rows: Vec<Shipment> = tables
      .shipments
      .iter()
      .filter(|s| s.created_at <= cutoff && s.holds_label_artifacts())
      .cloned()
      .collect();
    rows.sort_by_key(|s| s.created_at);
    Ok(rows)
  }

  async fn clear_label(&self, shipment_id: Uuid) -> Result<bool, StoreError> {
    let mut tables = self.tables.lock();
    match tables.shipments.iter_mut().find(|s| s.id == shipment_id) {
      Some(s) if s.holds_label_artifacts() => {
        s.label_url = None;
        s.tracking_number = None;
        s.storage_path = None;
        Ok(true)
      }
      _ => Ok(false),
    }
  }
}
