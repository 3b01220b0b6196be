// shipping_desk/src/web/routes.rs

use actix_web::{error, web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{label_handlers, maintenance_handlers, order_handlers, rate_handlers, webhook_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed JSON bodies, path ids and query strings get the same envelope as
/// every other validation failure.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .limit(256 * 1024)
    .error_handler(|err, _req| error::Error::from(AppError::Validation(format!("invalid request body: {}", err))))
}

fn path_config() -> web::PathConfig {
  web::PathConfig::default()
    .error_handler(|err, _req| error::Error::from(AppError::Validation(format!("invalid path parameter: {}", err))))
}

fn query_config() -> web::QueryConfig {
  web::QueryConfig::default()
    .error_handler(|err, _req| error::Error::from(AppError::Validation(format!("invalid query string: {}", err))))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config())
      .app_data(path_config())
      .app_data(query_config())
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/shipping")
          .route("/rates", web::post().to(rate_handlers::quote_rates_handler))
          .route("/labels", web::post().to(label_handlers::purchase_label_handler)),
      )
      .service(
        web::scope("/orders")
          .route("/{order_id}/shipment", web::get().to(order_handlers::get_order_shipment_handler))
          .route(
            "/{order_id}/shipping-addresses",
            web::get().to(order_handlers::get_shipping_addresses_handler),
          ),
      )
      .service(web::scope("/webhooks").route("/payments", web::post().to(webhook_handlers::payment_webhook_handler)))
      .service(
        web::scope("/maintenance").route("/labels/sweep", web::post().to(maintenance_handlers::sweep_labels_handler)),
      ),
  );
}
