// shipping_desk/src/pipelines/payment_webhook_pipeline.rs

use crate::db::MarkPaidOutcome;
use crate::errors::AppError;
use crate::pipelines::contexts::{PaymentEvent, PaymentWebhookCtxData};
use crate::services::payment_signature::verify_signature;
use labelflow::{ContextData, Pipeline, PipelineControl, Registry, StepDef};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// The only event type that gates shipping.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

pub fn register_payment_webhook_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<PaymentWebhookCtxData, AppError>::new(vec![
    StepDef::required("verify_signature"),
    StepDef::required("parse_event"),
    StepDef::required("mark_order_paid"),
  ]);

  p.on("verify_signature", verify_webhook_signature);
  p.on("parse_event", parse_event);
  p.on("mark_order_paid", mark_order_paid);

  registry.register(p);
}

#[instrument(name = "payment_webhook::verify_signature", skip_all)]
async fn verify_webhook_signature(ctx: ContextData<PaymentWebhookCtxData>) -> Result<PipelineControl, AppError> {
  let guard = ctx.read();
  let secret = guard
    .app_state
    .config
    .payment_webhook_secret
    .as_deref()
    .ok_or_else(|| AppError::Config("PAYMENT_WEBHOOK_SECRET is not configured".to_string()))?;
  let header = guard
    .signature_header
    .as_deref()
    .ok_or_else(|| AppError::Auth("missing payment signature header".to_string()))?;

  if let Err(e) = verify_signature(
    &guard.raw_body,
    header,
    secret,
    guard.app_state.config.webhook_tolerance_secs,
    guard.received_at,
  ) {
    warn!(error = %e, "Rejected payment webhook.");
    return Err(e);
  }
  Ok(PipelineControl::Continue)
}

/// Extracts the event type and, for completed checkouts, the order and
/// payment intent. Other event types end the run without touching anything.
#[instrument(name = "payment_webhook::parse_event", skip_all)]
async fn parse_event(ctx: ContextData<PaymentWebhookCtxData>) -> Result<PipelineControl, AppError> {
  let body: JsonValue = {
    let guard = ctx.read();
    serde_json::from_slice(&guard.raw_body)
      .map_err(|e| AppError::Validation(format!("payment event is not valid JSON: {}", e)))?
  };

  let event_type = body
    .get("type")
    .and_then(JsonValue::as_str)
    .ok_or_else(|| AppError::Validation("payment event has no type".to_string()))?
    .to_string();
  ctx.write().event_type = Some(event_type.clone());

  if event_type != CHECKOUT_COMPLETED {
    info!(%event_type, "Ignoring payment event type.");
    return Ok(PipelineControl::Stop);
  }

  let object = body.pointer("/data/object");
  let order_id = object
    .and_then(|o| o.pointer("/metadata/order_id"))
    .and_then(JsonValue::as_str)
    .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    .ok_or_else(|| AppError::NotFound("payment event does not reference a known order".to_string()))?;
  let payment_intent_id = object
    .and_then(|o| o.get("payment_intent"))
    .and_then(JsonValue::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| AppError::Validation("payment event has no payment intent".to_string()))?
    .to_string();

  debug!(%order_id, %payment_intent_id, "Parsed checkout completion.");
  ctx.write().event = Some(PaymentEvent {
    event_type,
    order_id,
    payment_intent_id,
  });
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment_webhook::mark_order_paid", skip_all)]
async fn mark_order_paid(ctx: ContextData<PaymentWebhookCtxData>) -> Result<PipelineControl, AppError> {
  let (orders, event) = {
    let guard = ctx.read();
    (guard.app_state.orders.clone(), guard.event.clone())
  };
  let event = event.ok_or_else(|| AppError::Internal("payment event missing after parsing".to_string()))?;

  let outcome = orders
    .mark_paid(event.order_id, &event.payment_intent_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("order {} not found", event.order_id)))?;

  let handled = match outcome {
    MarkPaidOutcome::Marked(order) => {
      info!(order_id = %order.id, payment_intent_id = %event.payment_intent_id, "Order marked paid.");
      true
    }
    MarkPaidOutcome::AlreadyPaid(order) => {
      info!(order_id = %order.id, "Replayed payment event; order already paid.");
      true
    }
    MarkPaidOutcome::NotPending(order) => {
      warn!(order_id = %order.id, status = ?order.status, "Payment event for an order past pending; left unchanged.");
      false
    }
  };
  ctx.write().handled = handled;
  Ok(PipelineControl::Continue)
}
