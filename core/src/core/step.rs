// labelflow/src/core/step.rs

//! Step definitions.

use super::ContextData;
use std::sync::Arc;

/// Evaluated before a step runs; `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// Definition of a pipeline step.
///
/// - `optional`: the step may have no handlers registered and is then skipped.
/// - `best_effort`: a handler error is logged and the run moves on to the next
///   step instead of failing. Used for side channels (label archiving, seller
///   notification) that must never undo the main outcome.
#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub best_effort: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> StepDef<T> {
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      best_effort: false,
      skip_if: None,
    }
  }

  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      optional: true,
      ..Self::required(name)
    }
  }

  pub fn best_effort(name: impl Into<String>) -> Self {
    Self {
      best_effort: true,
      ..Self::required(name)
    }
  }

  pub fn skip_if(mut self, condition: impl Fn(ContextData<T>) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(condition));
    self
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("best_effort", &self.best_effort)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
