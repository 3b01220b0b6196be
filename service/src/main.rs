// shipping_desk/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use shipping_desk::config::AppConfig;
use shipping_desk::web::configure_app_routes;
use shipping_desk::{build_state, init_tracing};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Configuration error: {}", e);
      std::process::exit(1);
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!("Starting shipping service...");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = match build_state(app_config).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise the service.");
      std::process::exit(1);
    }
  };

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
