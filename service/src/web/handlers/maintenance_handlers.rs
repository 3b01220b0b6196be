// shipping_desk/src/web/handlers/maintenance_handlers.rs

use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::pipelines::contexts::LabelSweepCtxData;
use crate::state::AppState;
use labelflow::ContextData;

#[derive(Debug, Default, Deserialize)]
pub struct SweepQuery {
  pub retention_days: Option<i64>,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  req
    .headers()
    .get(AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(|token| token.trim().to_string())
}

/// Purges label artifacts past the retention window. Called by an external scheduler.
#[instrument(name = "handler::sweep_labels", skip_all, fields(retention_days = ?query.retention_days))]
pub async fn sweep_labels_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  query: web::Query<SweepQuery>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(LabelSweepCtxData::new(
    app_state.get_ref().clone(),
    bearer_token(&req),
    query.retention_days,
  ));
  app_state.registry.run(ctx.clone()).await?;

  let report = ctx.write().report.take().unwrap_or_default();
  let mut body = json!({ "success": true, "deleted": report.deleted });
  if !report.errors.is_empty() {
    body["errors"] = json!(report.errors);
  }
  Ok(HttpResponse::Ok().json(body))
}
