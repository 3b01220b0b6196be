// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use shipping_desk::config::AppConfig;
use shipping_desk::db::{MemoryStore, OrderRepository};
use shipping_desk::errors::AppError;
use shipping_desk::models::{
  Address, NewOrderItem, Order, OrderStatus, Parcel, Product, ProviderId, PurchasedLabel, QuotedRate, SellerProfile,
  ShipmentSpec,
};
use shipping_desk::services::label_storage::{LabelStorage, MemoryLabelStorage};
use shipping_desk::services::notifier::{Mailer, OutgoingEmail};
use shipping_desk::services::providers::{ProviderFailure, ProviderSet, ShippingProvider};
use shipping_desk::state::{AppState, Collaborators};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

pub const SWEEP_SECRET: &str = "sweep-secret-for-tests";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Address and parcel fixtures ---

pub fn origin() -> Address {
  Address {
    name: "Maple Crafts".to_string(),
    company: Some("Maple Crafts LLC".to_string()),
    address_line1: "12 Workshop Lane".to_string(),
    address_line2: String::new(),
    city: "Austin".to_string(),
    state: "TX".to_string(),
    postal_code: "78701".to_string(),
    country: "US".to_string(),
    phone: "512-555-0101".to_string(),
  }
}

pub fn destination() -> Address {
  Address {
    name: "Jamie Rivera".to_string(),
    company: None,
    address_line1: "400 Pine St".to_string(),
    address_line2: "Apt 3".to_string(),
    city: "Seattle".to_string(),
    state: "WA".to_string(),
    postal_code: "98101".to_string(),
    country: "US".to_string(),
    phone: String::new(),
  }
}

pub fn parcel(weight_oz: f64) -> Parcel {
  Parcel {
    weight_oz,
    length_in: Some(10.0),
    width_in: Some(8.0),
    height_in: Some(4.0),
  }
}

pub fn spec() -> ShipmentSpec {
  ShipmentSpec {
    ship_from: origin(),
    ship_to: destination(),
    parcel: parcel(16.0),
  }
}

pub fn quote(rate_id: Option<&str>, carrier: &str, service_code: &str, amount_cents: i64, days: Option<u32>) -> QuotedRate {
  QuotedRate {
    rate_id: rate_id.map(String::from),
    carrier_id: format!("{}-account", carrier.to_lowercase()),
    carrier: carrier.to_string(),
    service_code: service_code.to_string(),
    service_name: format!("{} {}", carrier, service_code),
    amount_cents,
    currency: "USD".to_string(),
    estimated_days: days,
  }
}

// --- Fake provider ---

/// Scripted provider that counts every call.
pub struct FakeProvider {
  id: ProviderId,
  supports_ids: bool,
  quotes: Mutex<Vec<QuotedRate>>,
  pub quote_calls: AtomicUsize,
  pub purchase_rate_calls: AtomicUsize,
  pub purchase_shipment_calls: AtomicUsize,
  fail_quotes: AtomicBool,
  fail_purchases: AtomicBool,
  expire_rates: AtomicBool,
  purchased_services: Mutex<Vec<String>>,
}

impl FakeProvider {
  pub fn new(id: ProviderId, supports_ids: bool, quotes: Vec<QuotedRate>) -> Self {
    Self {
      id,
      supports_ids,
      quotes: Mutex::new(quotes),
      quote_calls: AtomicUsize::new(0),
      purchase_rate_calls: AtomicUsize::new(0),
      purchase_shipment_calls: AtomicUsize::new(0),
      fail_quotes: AtomicBool::new(false),
      fail_purchases: AtomicBool::new(false),
      expire_rates: AtomicBool::new(false),
      purchased_services: Mutex::new(Vec::new()),
    }
  }

  /// Aggregator-style: rate ids, two good rates and one malformed rate.
  pub fn aggregator() -> Self {
    Self::new(
      ProviderId::ShipEngine,
      true,
      vec![
        quote(Some("se-rate-priority"), "USPS", "usps_priority_mail", 1250, Some(2)),
        quote(Some("se-rate-ground"), "UPS", "ups_ground", 980, Some(5)),
        quote(Some("se-rate-broken"), "", "mystery", 500, Some(3)),
      ],
    )
  }

  /// Carrier-direct style: no rate ids.
  pub fn carrier() -> Self {
    Self::new(
      ProviderId::CarrierDirect,
      false,
      vec![quote(None, "FastShip", "EXPRESS", 1500, Some(1)), quote(None, "FastShip", "GROUND", 980, Some(4))],
    )
  }

  pub fn total_calls(&self) -> usize {
    self.quote_calls.load(Ordering::SeqCst)
      + self.purchase_rate_calls.load(Ordering::SeqCst)
      + self.purchase_shipment_calls.load(Ordering::SeqCst)
  }

  pub fn purchase_calls(&self) -> usize {
    self.purchase_rate_calls.load(Ordering::SeqCst) + self.purchase_shipment_calls.load(Ordering::SeqCst)
  }

  pub fn fail_quotes(&self, fail: bool) {
    self.fail_quotes.store(fail, Ordering::SeqCst);
  }

  pub fn fail_purchases(&self, fail: bool) {
    self.fail_purchases.store(fail, Ordering::SeqCst);
  }

  pub fn expire_rates(&self, expire: bool) {
    self.expire_rates.store(expire, Ordering::SeqCst);
  }

  pub fn purchased_services(&self) -> Vec<String> {
    self.purchased_services.lock().clone()
  }

  fn label(&self, rate_id: Option<&str>, service_code: &str) -> PurchasedLabel {
    let n = self.purchase_calls();
    self.purchased_services.lock().push(service_code.to_string());
    PurchasedLabel {
      provider: self.id,
      label_id: Some(format!("lbl-{}-{}", self.id, n)),
      rate_id: rate_id.map(String::from),
      service_code: service_code.to_string(),
      carrier_id: "carrier-account".to_string(),
      carrier: "USPS".to_string(),
      tracking_number: format!("TRK{}{}", self.id.as_str().len(), n),
      label_url: format!("https://labels.example.com/{}/{}.pdf", self.id, n),
      amount_cents: 1250,
      currency: "USD".to_string(),
    }
  }
}

#[async_trait]
impl ShippingProvider for FakeProvider {
  fn id(&self) -> ProviderId {
    self.id
  }

  fn supports_rate_ids(&self) -> bool {
    self.supports_ids
  }

  async fn quote_rates(&self, _spec: &ShipmentSpec) -> Result<Vec<QuotedRate>, ProviderFailure> {
    self.quote_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_quotes.load(Ordering::SeqCst) {
      return Err(ProviderFailure::new(self.id, "upstream unavailable"));
    }
    Ok(self.quotes.lock().clone())
  }

  async fn purchase_rate(&self, rate_id: &str) -> Result<PurchasedLabel, ProviderFailure> {
    self.purchase_rate_calls.fetch_add(1, Ordering::SeqCst);
    if self.expire_rates.load(Ordering::SeqCst) {
      return Err(ProviderFailure::new(self.id, "rate has expired").expired());
    }
    if self.fail_purchases.load(Ordering::SeqCst) {
      return Err(ProviderFailure::new(self.id, "purchase declined"));
    }
    let service = self
      .quotes
      .lock()
      .iter()
      .find(|q| q.rate_id.as_deref() == Some(rate_id))
      .map(|q| q.service_code.clone())
      .unwrap_or_else(|| "unknown".to_string());
    Ok(self.label(Some(rate_id), &service))
  }

  async fn purchase_shipment(&self, _spec: &ShipmentSpec, service_code: &str) -> Result<PurchasedLabel, ProviderFailure> {
    self.purchase_shipment_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_purchases.load(Ordering::SeqCst) {
      return Err(ProviderFailure::new(self.id, "purchase declined"));
    }
    Ok(self.label(None, service_code))
  }
}

// --- Mailers ---

#[derive(Default)]
pub struct RecordingMailer {
  pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
    self.sent.lock().push(email.clone());
    Ok(())
  }
}

#[derive(Default)]
pub struct FailingMailer {
  pub attempts: AtomicUsize,
}

#[async_trait]
impl Mailer for FailingMailer {
  async fn send(&self, _email: &OutgoingEmail) -> Result<(), AppError> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    Err(AppError::Internal("smtp relay refused the message".to_string()))
  }
}

// --- Wired application ---

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub storage: Arc<MemoryLabelStorage>,
  pub aggregator: Arc<FakeProvider>,
  pub carrier: Arc<FakeProvider>,
}

impl TestApp {
  pub fn provider_calls(&self) -> usize {
    self.aggregator.total_calls() + self.carrier.total_calls()
  }
}

pub fn test_config() -> AppConfig {
  AppConfig {
    sweep_secret: Some(SWEEP_SECRET.to_string()),
    payment_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    default_provider: Some(ProviderId::ShipEngine),
    ..AppConfig::default()
  }
}

pub fn test_app_with_mailer(mailer: Arc<dyn Mailer>) -> TestApp {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let storage = Arc::new(MemoryLabelStorage::new());
  let aggregator = Arc::new(FakeProvider::aggregator());
  let carrier = Arc::new(FakeProvider::carrier());

  let aggregator_dyn: Arc<dyn ShippingProvider> = aggregator.clone();
  let carrier_dyn: Arc<dyn ShippingProvider> = carrier.clone();
  let providers = ProviderSet::new()
    .with(aggregator_dyn)
    .with(carrier_dyn)
    .with_default(Some(ProviderId::ShipEngine));

  let label_storage: Arc<dyn LabelStorage> = storage.clone();
  let state = AppState::new(
    test_config(),
    Collaborators {
      orders: store.clone(),
      shipments: store.clone(),
      providers,
      label_storage: Some(label_storage),
      mailer,
    },
  );
  TestApp {
    state,
    store,
    storage,
    aggregator,
    carrier,
  }
}

pub fn test_app() -> TestApp {
  test_app_with_mailer(Arc::new(RecordingMailer::default()))
}

// --- Seeding ---

pub fn seller_profile(email: &str) -> SellerProfile {
  let o = origin();
  SellerProfile {
    seller_id: Uuid::new_v4(),
    email: email.to_string(),
    display_name: "Maple Crafts".to_string(),
    origin_name: o.name,
    origin_company: o.company,
    origin_line1: o.address_line1,
    origin_line2: None,
    origin_city: o.city,
    origin_state: o.state,
    origin_postal_code: o.postal_code,
    origin_country: o.country,
    origin_phone: Some(o.phone),
  }
}

pub fn order_with_status(status: OrderStatus) -> Order {
  let d = destination();
  Order {
    id: Uuid::new_v4(),
    buyer_id: Uuid::new_v4(),
    status,
    total_amount_cents: 4599,
    currency: "USD".to_string(),
    ship_to_name: d.name,
    ship_to_line1: d.address_line1,
    ship_to_line2: Some(d.address_line2),
    ship_to_city: d.city,
    ship_to_state: d.state,
    ship_to_postal_code: d.postal_code,
    ship_to_country: d.country,
    ship_to_phone: None,
    payment_intent_id: if status == OrderStatus::Pending {
      None
    } else {
      Some("pi_seeded".to_string())
    },
    created_at: Utc::now(),
    updated_at: Utc::now(),
  }
}

/// Inserts a seller, one of their products and an order holding that product.
/// Returns `(order_id, seller)`.
pub async fn seed_order(store: &MemoryStore, status: OrderStatus) -> (Uuid, SellerProfile) {
  let seller = seller_profile("seller@maplecrafts.example");
  store.insert_seller(seller.clone());

  let product = Product {
    id: Uuid::new_v4(),
    seller_id: Some(seller.seller_id),
    name: "Walnut cutting board".to_string(),
    price_cents: 4599,
  };
  store.insert_product(product.clone());

  let order = order_with_status(status);
  let order_id = order.id;
  store.insert_order(order);
  store
    .insert_order_item(NewOrderItem {
      order_id,
      product_id: product.id,
      quantity: 1,
      unit_price_cents: product.price_cents,
    })
    .await
    .expect("seed order item");
  (order_id, seller)
}
