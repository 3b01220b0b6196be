// shipping_desk/src/pipelines/mod.rs

//! The workflow pipelines and their registration.

use crate::errors::AppError;
use labelflow::Registry;

pub mod common_steps;
pub mod contexts;

pub mod label_sweep_pipeline;
pub mod payment_webhook_pipeline;
pub mod purchase_label_pipeline;
pub mod quote_rates_pipeline;

/// Registers every pipeline with `registry`. Called once at startup.
pub fn register_all_pipelines(registry: &Registry<AppError>) {
  tracing::info!("Registering workflow pipelines...");

  quote_rates_pipeline::register_quote_rates_pipeline(registry);
  purchase_label_pipeline::register_purchase_label_pipeline(registry);
  payment_webhook_pipeline::register_payment_webhook_pipeline(registry);
  label_sweep_pipeline::register_label_sweep_pipeline(registry);

  tracing::info!("All workflow pipelines registered.");
}
