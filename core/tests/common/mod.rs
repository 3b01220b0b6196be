// tests/common/mod.rs
#![allow(dead_code)]

use labelflow::{ContextData, FlowError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

// --- Context mirroring a tiny label workflow ---
#[derive(Clone, Debug, Default)]
pub struct LabelRunCtx {
  pub attempts: i32,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub tracking_number: Option<String>,
  pub notified: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("labelflow error: {0}")]
  Flow(String), // Debug-formatted FlowError, kept as a String for Eq

  #[error("step failed: {0}")]
  Step(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

/// Records `step_name` in the trail and honours `stop_at`.
pub fn recording_handler(step_name: &'static str) -> Handler<LabelRunCtx, TestError> {
  Box::new(move |ctx: ContextData<LabelRunCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.attempts += 1;
      guard.trail.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, attempts = guard.attempts, "recorded");
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> Handler<LabelRunCtx, TestError> {
  Box::new(move |ctx: ContextData<LabelRunCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = step_name, "failing with: '{}'", message);
      Err(TestError::Step(message.to_string()))
    })
  })
}

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
