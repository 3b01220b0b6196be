// shipping_desk/src/web/handlers/label_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::PurchaseRequest;
use crate::pipelines::contexts::PurchaseLabelCtxData;
use crate::state::AppState;
use labelflow::ContextData;

#[instrument(name = "handler::purchase_label", skip_all, fields(order_id = ?payload.order_id))]
pub async fn purchase_label_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PurchaseRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(PurchaseLabelCtxData::new(app_state.get_ref().clone(), payload.into_inner()));
  app_state.registry.run(ctx.clone()).await?;

  let guard = ctx.read();
  let (Some(shipment), Some(label)) = (guard.shipment.as_ref(), guard.label.as_ref()) else {
    return Err(AppError::Internal("purchase finished without a recorded shipment".to_string()));
  };
  info!(shipment_id = %shipment.id, "Label purchase complete.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "shipmentId": shipment.id,
    "labelUrl": label.label_url,
    "trackingNumber": label.tracking_number,
    "carrier": label.carrier,
    "amount": label.amount_cents as f64 / 100.0,
    "amountCents": label.amount_cents,
    "currency": label.currency,
  })))
}
