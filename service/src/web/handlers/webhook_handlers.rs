// shipping_desk/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::PaymentWebhookCtxData;
use crate::services::payment_signature::SIGNATURE_HEADER;
use crate::state::AppState;
use labelflow::{ContextData, PipelineResult};

/// Receives payment-provider events. The body is taken raw; the signature
/// covers the exact bytes.
#[instrument(name = "handler::payment_webhook", skip_all, fields(payload_bytes = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|value| value.to_str().ok())
    .map(String::from);

  let ctx = ContextData::new(PaymentWebhookCtxData::new(
    app_state.get_ref().clone(),
    body.to_vec(),
    signature_header,
    Utc::now().timestamp(),
  ));
  let result = app_state.registry.run(ctx.clone()).await?;

  let guard = ctx.read();
  let handled = matches!(result, PipelineResult::Completed) && guard.handled;
  info!(event_type = ?guard.event_type, handled, "Payment webhook acknowledged.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "received": true, "handled": handled })))
}
