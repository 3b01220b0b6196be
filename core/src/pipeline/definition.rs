// labelflow/src/pipeline/definition.rs

//! `Pipeline<TData, Err>` and its structural operations.

use crate::core::handler::Handler;
use crate::core::step::StepDef;
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;

/// An ordered list of named steps over the context type `TData`, whose
/// handlers fail with `Err`.
///
/// `Err` must be constructible from `FlowError` so that engine-level failures
/// (a required step without handlers) surface in the caller's error type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(steps: Vec<StepDef<TData>>) -> Self {
    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  /// Panics when `step_name` is unknown. A typo in a step name is a wiring
  /// bug found at startup, not a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.has_step(step_name) {
      panic!("labelflow setup error: step '{}' not found in pipeline definition.", step_name);
    }
  }

  fn position_of(&self, step_name: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  fn check_new_name(&self, step_name: &str) -> FlowResult<()> {
    if self.has_step(step_name) {
      return Err(FlowError::ConfigurationError {
        step_name: step_name.to_string(),
        message: "a step with this name already exists".to_string(),
      });
    }
    Ok(())
  }

  pub fn insert_before_step(&mut self, existing_step_name: &str, step: StepDef<TData>) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    self.check_new_name(&step.name)?;
    self.steps.insert(idx, step);
    Ok(())
  }

  pub fn insert_after_step(&mut self, existing_step_name: &str, step: StepDef<TData>) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    self.check_new_name(&step.name)?;
    self.steps.insert(idx + 1, step);
    Ok(())
  }

  /// Removes a step and every handler registered for it. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }
}
