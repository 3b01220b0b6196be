// shipping_desk/src/lib.rs

//! Shipping-label acquisition for a marketplace: rate quotes across providers,
//! label purchase, the shipment ledger, the payment gate and label retention.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;

use crate::config::{AppConfig, LogFormat};
use crate::db::{MemoryStore, OrderRepository, PgStore, ShipmentRepository};
use crate::errors::{AppError, Result};
use crate::services::label_storage::{HttpLabelStorage, LabelStorage};
use crate::services::notifier::{BrevoMailer, LogMailer, Mailer};
use crate::services::providers::{CarrierDirectClient, ProviderSet, ShipEngineClient};
use crate::state::{AppState, Collaborators};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  let installed = match format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Pretty => builder.try_init(),
  };
  if let Err(e) = installed {
    eprintln!("tracing subscriber already installed: {}", e);
  }
}

/// Builds the enabled provider clients. Fails when none is configured.
pub fn build_providers(config: &AppConfig) -> Result<ProviderSet> {
  let mut providers = ProviderSet::new().with_default(config.default_provider);
  if let Some(cfg) = &config.shipengine {
    let client = ShipEngineClient::new(cfg.clone())
      .map_err(|e| AppError::Config(format!("ShipEngine client: {}", e)))?;
    providers = providers.with(Arc::new(client));
  }
  if let Some(cfg) = &config.carrier_direct {
    let client = CarrierDirectClient::new(cfg.clone())
      .map_err(|e| AppError::Config(format!("carrier client: {}", e)))?;
    providers = providers.with(Arc::new(client));
  }
  if providers.is_empty() {
    return Err(AppError::Config(
      "no shipping provider configured; set SHIPENGINE_API_KEY or the CARRIER_* variables".to_string(),
    ));
  }
  tracing::info!(providers = ?providers.ids(), "Shipping providers enabled.");
  Ok(providers)
}

/// Connects every collaborator named by `config` and returns the wired state.
pub async fn build_state(config: AppConfig) -> Result<AppState> {
  let (orders, shipments): (Arc<dyn OrderRepository>, Arc<dyn ShipmentRepository>) = if config.uses_memory_store() {
    tracing::warn!("DATABASE_URL=memory: using the in-memory store; nothing is persisted.");
    let store = Arc::new(MemoryStore::new());
    let orders: Arc<dyn OrderRepository> = store.clone();
    let shipments: Arc<dyn ShipmentRepository> = store;
    (orders, shipments)
  } else {
    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    tracing::info!("Successfully connected to the database.");
    let orders: Arc<dyn OrderRepository> = store.clone();
    let shipments: Arc<dyn ShipmentRepository> = store;
    (orders, shipments)
  };

  let providers = build_providers(&config)?;

  let label_storage: Option<Arc<dyn LabelStorage>> = match &config.storage {
    Some(cfg) => {
      let storage = HttpLabelStorage::new(cfg.clone()).map_err(|e| AppError::Config(format!("label storage client: {}", e)))?;
      let storage: Arc<dyn LabelStorage> = Arc::new(storage);
      Some(storage)
    }
    None => {
      tracing::warn!("Label storage not configured; labels stay at the provider URL.");
      None
    }
  };

  let mailer: Arc<dyn Mailer> = match &config.brevo {
    Some(cfg) => Arc::new(BrevoMailer::new(cfg.clone()).map_err(|e| AppError::Config(format!("email client: {}", e)))?),
    None => {
      tracing::warn!("BREVO_API_KEY not set; seller emails are only logged.");
      Arc::new(LogMailer)
    }
  };

  Ok(AppState::new(
    config,
    Collaborators {
      orders,
      shipments,
      providers,
      label_storage,
      mailer,
    },
  ))
}
