// shipping_desk/src/web/handlers/rate_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::RateQuoteRequest;
use crate::pipelines::contexts::QuoteRatesCtxData;
use crate::state::AppState;
use labelflow::ContextData;

#[instrument(name = "handler::quote_rates", skip_all)]
pub async fn quote_rates_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RateQuoteRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(QuoteRatesCtxData::new(app_state.get_ref().clone(), payload.into_inner()));
  app_state.registry.run(ctx.clone()).await?;

  let rates = std::mem::take(&mut ctx.write().rates);
  info!(count = rates.len(), "Returning rates.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "rates": rates })))
}
