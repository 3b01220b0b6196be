// shipping_desk/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::addresses::resolve_shipping_addresses;
use crate::state::AppState;

#[instrument(name = "handler::get_order_shipment", skip(app_state))]
pub async fn get_order_shipment_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = order_id.into_inner();
  let shipment = app_state
    .ledger
    .find_active_by_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("order {} has no active shipment", order_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "shipment": shipment })))
}

#[instrument(name = "handler::get_shipping_addresses", skip(app_state))]
pub async fn get_shipping_addresses_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let resolved = resolve_shipping_addresses(app_state.orders.as_ref(), order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "shipFrom": resolved.ship_from,
    "shipTo": resolved.ship_to,
  })))
}
