// labelflow/src/lib.rs

//! Labelflow: a small asynchronous step-pipeline engine.
//!
//! Every workflow in the shipping service (rate quoting, label purchase,
//! payment gating, retention sweeps) is a `Pipeline<TData, Err>`:
//!  - Named steps with before/on/after hooks.
//!  - Asynchronous handlers for provider and database I/O.
//!  - Early stopping via `PipelineControl::Stop`.
//!  - Optional steps (may have no handlers) and best-effort steps (handler
//!    failures are logged, the run continues).
//!  - Skip conditions evaluated against the shared context.
//!  - A type-keyed `Registry` that dispatches a context to its pipeline.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;

/*
    Typical use:
    1. Define a context struct `MyCtx` holding the request and the slots the
       steps fill in.
    2. Build `Pipeline::<MyCtx, MyError>::new(vec![StepDef::required("a"), ...])`.
    3. Register handlers with `.on("a", |ctx| Box::pin(async move { ... }))`.
    4. Register the pipeline in a `Registry<MyError>` at startup.
    5. Per request: `registry.run(ContextData::new(my_ctx)).await`.
*/
