// labelflow/src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every step handler.
pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>;

/// A pipeline step handler.
///
/// Each handler receives its own clone of the run's `ContextData<TData>` and
/// resolves to a `PipelineControl` or the pipeline's error type.
///
/// Lock guards taken from the context must be dropped before the handler
/// awaits anything; `ContextData` wraps a blocking `parking_lot` lock.
pub type Handler<TData, Err> = Box<dyn Fn(ContextData<TData>) -> HandlerFuture<Err> + Send + Sync>;
