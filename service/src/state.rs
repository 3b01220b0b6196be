// shipping_desk/src/state.rs

use crate::config::AppConfig;
use crate::db::{OrderRepository, ShipmentRepository};
use crate::errors::AppError;
use crate::pipelines;
use crate::services::label_storage::LabelStorage;
use crate::services::ledger::ShipmentLedger;
use crate::services::notifier::Mailer;
use crate::services::providers::ProviderSet;
use labelflow::Registry;
use std::sync::Arc;

/// The external collaborators a running service is wired to.
pub struct Collaborators {
  pub orders: Arc<dyn OrderRepository>,
  pub shipments: Arc<dyn ShipmentRepository>,
  pub providers: ProviderSet,
  pub label_storage: Option<Arc<dyn LabelStorage>>,
  pub mailer: Arc<dyn Mailer>,
}

#[derive(Clone)]
pub struct AppState {
  pub registry: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub orders: Arc<dyn OrderRepository>,
  pub ledger: ShipmentLedger,
  pub providers: ProviderSet,
  pub label_storage: Option<Arc<dyn LabelStorage>>,
  pub mailer: Arc<dyn Mailer>,
}

impl AppState {
  /// Wires the collaborators together and registers every workflow pipeline.
  pub fn new(config: AppConfig, parts: Collaborators) -> Self {
    let registry = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&registry);
    Self {
      registry,
      config: Arc::new(config),
      orders: parts.orders,
      ledger: ShipmentLedger::new(parts.shipments, parts.label_storage.clone()),
      providers: parts.providers,
      label_storage: parts.label_storage,
      mailer: parts.mailer,
    }
  }
}
