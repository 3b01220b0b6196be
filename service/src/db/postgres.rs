// shipping_desk/src/db/postgres.rs

use super::{MarkPaidOutcome, OrderRepository, RecordOutcome, ShipmentRepository, StoreError};
use crate::models::{NewOrderItem, NewShipment, Order, OrderItem, OrderStatus, SellerProfile, Shipment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, buyer_id, status, total_amount_cents, currency, ship_to_name, ship_to_line1, \
   ship_to_line2, ship_to_city, ship_to_state, ship_to_postal_code, ship_to_country, ship_to_phone, \
   payment_intent_id, created_at, updated_at";

const SHIPMENT_COLUMNS: &str = "id, order_id, provider, rate_id, service_code, length_in, width_in, height_in, \
   weight_oz, label_url, tracking_number, carrier_id, amount_cents, currency, created_at, user_id, storage_path, \
   provider_label_id";

/// Repository implementation over the Postgres schema in `schema.sql`.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
    Ok(Self::new(PgPool::connect(database_url).await?))
  }
}

#[async_trait]
impl OrderRepository for PgStore {
  #[instrument(name = "PgStore::get_order", skip(self))]
  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, Order>(&sql).bind(order_id).fetch_optional(&self.pool).await?)
  }

  #[instrument(name = "PgStore::mark_paid", skip(self))]
  async fn mark_paid(&self, order_id: Uuid, payment_intent_id: &str) -> Result<Option<MarkPaidOutcome>, StoreError> {
    // Single conditional update: only a pending order can become paid.
    let sql = format!(
      "UPDATE orders SET status = 'paid', payment_intent_id = $2, updated_at = now() \
       WHERE id = $1 AND status = 'pending' RETURNING {}",
      ORDER_COLUMNS
    );
    if let Some(order) = sqlx::query_as::<_, Order>(&sql)
      .bind(order_id)
      .bind(payment_intent_id)
      .fetch_optional(&self.pool)
      .await?
    {
      return Ok(Some(MarkPaidOutcome::Marked(order)));
    }

    let existing = self.get_order(order_id).await?;
    Ok(existing.map(|order| {
      if order.status == OrderStatus::Paid && order.payment_intent_id.as_deref() == Some(payment_intent_id) {
        MarkPaidOutcome::AlreadyPaid(order)
      } else {
        MarkPaidOutcome::NotPending(order)
      }
    }))
  }

  #[instrument(name = "PgStore::advance_status", skip(self))]
  async fn advance_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool, StoreError> {
    if !from.can_advance_to(to) {
      warn!(?from, ?to, "Refusing backwards order status transition.");
      return Ok(false);
    }
    let result = sqlx::query("UPDATE orders SET status = $3, updated_at = now() WHERE id = $1 AND status = $2")
      .bind(order_id)
      .bind(from)
      .bind(to)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  #[instrument(name = "PgStore::sellers_for_order", skip(self))]
  async fn sellers_for_order(&self, order_id: Uuid) -> Result<Vec<SellerProfile>, StoreError> {
    let sellers = sqlx::query_as::<_, SellerProfile>(
      "SELECT DISTINCT s.seller_id, s.email, s.display_name, s.origin_name, s.origin_company, s.origin_line1, \
         s.origin_line2, s.origin_city, s.origin_state, s.origin_postal_code, s.origin_country, s.origin_phone \
       FROM order_items oi JOIN seller_profiles s ON s.seller_id = oi.seller_id \
       WHERE oi.order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(sellers)
  }

  #[instrument(name = "PgStore::insert_order_item", skip(self), fields(order_id = %item.order_id, product_id = %item.product_id))]
  async fn insert_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError> {
    if item.quantity <= 0 {
      return Err(StoreError::InvalidReference("quantity must be positive".to_string()));
    }
    // The seller comes from the product row in the same statement; a product
    // without a seller inserts nothing.
    let inserted = sqlx::query_as::<_, OrderItem>(
      "INSERT INTO order_items (id, order_id, product_id, seller_id, quantity, unit_price_cents) \
       SELECT $1, $2, p.id, p.seller_id, $4, $5 FROM products p WHERE p.id = $3 AND p.seller_id IS NOT NULL \
       RETURNING id, order_id, product_id, seller_id, quantity, unit_price_cents, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .fetch_optional(&self.pool)
    .await?;

    inserted.ok_or_else(|| {
      StoreError::InvalidReference(format!("product {} does not exist or has no seller", item.product_id))
    })
  }
}

#[async_trait]
impl ShipmentRepository for PgStore {
  #[instrument(name = "PgStore::record_shipment", skip(self, shipment), fields(order_id = %shipment.order_id, tracking_number = %shipment.tracking_number))]
  async fn record_shipment(&self, shipment: NewShipment) -> Result<RecordOutcome, StoreError> {
    // Both unique indexes (order+tracking, one active label per order) resolve
    // to "nothing inserted"; the follow-up read tells them apart.
    let sql = format!(
      "INSERT INTO shipments (id, order_id, provider, rate_id, service_code, length_in, width_in, height_in, \
         weight_oz, label_url, tracking_number, carrier_id, amount_cents, currency, user_id, storage_path, \
         provider_label_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
       ON CONFLICT DO NOTHING RETURNING {}",
      SHIPMENT_COLUMNS
    );
    let inserted = sqlx::query_as::<_, Shipment>(&sql)
      .bind(Uuid::new_v4())
      .bind(shipment.order_id)
      .bind(shipment.provider.as_str())
      .bind(&shipment.rate_id)
      .bind(&shipment.service_code)
      .bind(shipment.parcel.length_in)
      .bind(shipment.parcel.width_in)
      .bind(shipment.parcel.height_in)
      .bind(shipment.parcel.weight_oz)
      .bind(&shipment.label_url)
      .bind(&shipment.tracking_number)
      .bind(&shipment.carrier_id)
      .bind(shipment.amount_cents)
      .bind(&shipment.currency)
      .bind(shipment.user_id)
      .bind(&shipment.storage_path)
      .bind(&shipment.provider_label_id)
      .fetch_optional(&self.pool)
      .await?;

    if let Some(row) = inserted {
      return Ok(RecordOutcome::Inserted(row));
    }

    let sql = format!(
      "SELECT {} FROM shipments WHERE order_id = $1 AND tracking_number = $2",
      SHIPMENT_COLUMNS
    );
    match sqlx::query_as::<_, Shipment>(&sql)
      .bind(shipment.order_id)
      .bind(&shipment.tracking_number)
      .fetch_optional(&self.pool)
      .await?
    {
      Some(existing) => {
        debug!(shipment_id = %existing.id, "Tracking number already recorded for order.");
        Ok(RecordOutcome::Existing(existing))
      }
      None => Err(StoreError::Conflict(format!(
        "order {} already has an active shipping label",
        shipment.order_id
      ))),
    }
  }

  #[instrument(name = "PgStore::find_active_shipment", skip(self))]
  async fn find_active_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
    let sql = format!(
      "SELECT {} FROM shipments WHERE order_id = $1 AND label_url IS NOT NULL ORDER BY created_at DESC LIMIT 1",
      SHIPMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Shipment>(&sql).bind(order_id).fetch_optional(&self.pool).await?)
  }

  #[instrument(name = "PgStore::expirable_shipments", skip(self))]
  async fn expirable_shipments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Shipment>, StoreError> {
    let sql = format!(
      "SELECT {} FROM shipments \
       WHERE created_at <= $1 AND (label_url IS NOT NULL OR storage_path IS NOT NULL) \
       ORDER BY created_at",
      SHIPMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Shipment>(&sql).bind(cutoff).fetch_all(&self.pool).await?)
  }

  #[instrument(name = "PgStore::clear_label", skip(self))]
  async fn clear_label(&self, shipment_id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(
      "UPDATE shipments SET label_url = NULL, tracking_number = NULL, storage_path = NULL \
       WHERE id = $1 AND (label_url IS NOT NULL OR storage_path IS NOT NULL)",
    )
    .bind(shipment_id)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() == 1)
  }
}
