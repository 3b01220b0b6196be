// shipping_desk/src/pipelines/label_sweep_pipeline.rs

use crate::config::MAX_RETENTION_DAYS;
use crate::errors::AppError;
use crate::pipelines::contexts::LabelSweepCtxData;
use chrono::Duration;
use labelflow::{ContextData, Pipeline, PipelineControl, Registry, StepDef};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

pub fn register_label_sweep_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<LabelSweepCtxData, AppError>::new(vec![
    StepDef::required("authorize_sweep"),
    StepDef::required("expire_old_labels"),
  ]);

  p.on("authorize_sweep", authorize_sweep);
  p.on("expire_old_labels", expire_old_labels);

  registry.register(p);
}

/// Digests have a fixed length, so comparing them leaks nothing about the secret.
fn tokens_match(presented: &str, expected: &str) -> bool {
  Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

#[instrument(name = "label_sweep::authorize_sweep", skip_all)]
async fn authorize_sweep(ctx: ContextData<LabelSweepCtxData>) -> Result<PipelineControl, AppError> {
  let guard = ctx.read();
  let Some(expected) = guard.app_state.config.sweep_secret.as_deref() else {
    warn!("Sweep requested but SWEEP_SECRET is not configured.");
    return Err(AppError::Auth("label sweep is not enabled".to_string()));
  };
  match guard.bearer_token.as_deref() {
    Some(token) if tokens_match(token, expected) => Ok(PipelineControl::Continue),
    _ => {
      warn!("Rejected label sweep with a missing or wrong token.");
      Err(AppError::Auth("invalid sweep token".to_string()))
    }
  }
}

#[instrument(name = "label_sweep::expire_old_labels", skip_all)]
async fn expire_old_labels(ctx: ContextData<LabelSweepCtxData>) -> Result<PipelineControl, AppError> {
  let (ledger, days) = {
    let guard = ctx.read();
    let days = guard
      .retention_days
      .unwrap_or(guard.app_state.config.label_retention_days);
    (guard.app_state.ledger.clone(), days)
  };
  if !(1..=MAX_RETENTION_DAYS).contains(&days) {
    return Err(AppError::Validation(format!(
      "retention_days must be between 1 and {}",
      MAX_RETENTION_DAYS
    )));
  }

  info!(retention_days = days, "Sweeping expired labels.");
  let report = ledger.expire_old(Duration::days(days)).await?;
  ctx.write().report = Some(report);
  Ok(PipelineControl::Continue)
}
