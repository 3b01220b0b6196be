// shipping_desk/src/services/providers/mod.rs

//! Shipping-rate provider clients behind one capability trait.

pub mod carrier_direct;
pub mod shipengine;

use crate::models::{ProviderId, PurchasedLabel, QuotedRate, ShipmentSpec};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use carrier_direct::{CarrierDirectClient, CarrierDirectConfig};
pub use shipengine::{ShipEngineClient, ShipEngineConfig};

/// A provider call that did not produce a usable answer.
#[derive(Debug, Clone, Error)]
#[error("{provider}: {message}")]
pub struct ProviderFailure {
  pub provider: ProviderId,
  pub message: String,
  /// Provider error code, when it sent one.
  pub code: Option<String>,
  /// The referenced rate can no longer be purchased.
  pub rate_expired: bool,
}

impl ProviderFailure {
  pub fn new(provider: ProviderId, message: impl Into<String>) -> Self {
    Self {
      provider,
      message: message.into(),
      code: None,
      rate_expired: false,
    }
  }

  pub fn with_code(mut self, code: Option<String>) -> Self {
    self.code = code;
    self
  }

  pub fn expired(mut self) -> Self {
    self.rate_expired = true;
    self
  }

  /// Transport-level failure (connect, timeout, body decode).
  pub fn transport(provider: ProviderId, err: reqwest::Error) -> Self {
    let message = if err.is_timeout() {
      "request timed out".to_string()
    } else if err.is_decode() {
      format!("unreadable response: {}", err)
    } else {
      format!("request failed: {}", err)
    };
    Self::new(provider, message)
  }
}

/// One upstream shipping-rate API.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
  fn id(&self) -> ProviderId;

  /// Whether quotes carry server-side rate ids that can be purchased directly.
  fn supports_rate_ids(&self) -> bool;

  async fn quote_rates(&self, spec: &ShipmentSpec) -> Result<Vec<QuotedRate>, ProviderFailure>;

  async fn purchase_rate(&self, rate_id: &str) -> Result<PurchasedLabel, ProviderFailure>;

  async fn purchase_shipment(&self, spec: &ShipmentSpec, service_code: &str) -> Result<PurchasedLabel, ProviderFailure>;
}

/// The providers enabled by configuration, in registration order.
#[derive(Clone, Default)]
pub struct ProviderSet {
  providers: Vec<Arc<dyn ShippingProvider>>,
  default: Option<ProviderId>,
}

impl ProviderSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, provider: Arc<dyn ShippingProvider>) -> Self {
    self.providers.retain(|p| p.id() != provider.id());
    self.providers.push(provider);
    self
  }

  pub fn with_default(mut self, default: Option<ProviderId>) -> Self {
    self.default = default;
    self
  }

  pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ShippingProvider>> {
    self.providers.iter().find(|p| p.id() == id).cloned()
  }

  pub fn ids(&self) -> Vec<ProviderId> {
    self.providers.iter().map(|p| p.id()).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.providers.is_empty()
  }

  /// The configured default if it is enabled, else the first provider.
  pub fn default_provider(&self) -> Option<Arc<dyn ShippingProvider>> {
    self.default.and_then(|id| self.get(id)).or_else(|| self.providers.first().cloned())
  }
}

/// Builds the outbound client used by providers, label storage and the mailer: rustls, bounded per call.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
  reqwest::Client::builder()
    .timeout(timeout)
    .user_agent(concat!("shipping_desk/", env!("CARGO_PKG_VERSION")))
    .build()
}
