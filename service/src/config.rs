// shipping_desk/src/config.rs

use crate::errors::{AppError, Result};
use crate::models::ProviderId;
use crate::services::label_storage::HttpLabelStorageConfig;
use crate::services::notifier::BrevoConfig;
use crate::services::providers::{CarrierDirectConfig, ShipEngineConfig};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// `DATABASE_URL` value that selects the in-memory store.
pub const MEMORY_DATABASE: &str = "memory";

/// Upper bound for label retention, in days (about a century).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

const DEFAULT_SHIPENGINE_URL: &str = "https://api.shipengine.com";
const DEFAULT_BREVO_URL: &str = "https://api.brevo.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub http_timeout: Duration,
  pub label_retention_days: i64,
  /// Bearer token for the sweep endpoint. The endpoint refuses every call when unset.
  pub sweep_secret: Option<String>,
  pub payment_webhook_secret: Option<String>,
  pub webhook_tolerance_secs: i64,
  pub shipengine: Option<ShipEngineConfig>,
  pub carrier_direct: Option<CarrierDirectConfig>,
  pub storage: Option<HttpLabelStorageConfig>,
  /// `None` falls back to logging emails.
  pub brevo: Option<BrevoConfig>,
  pub default_provider: Option<ProviderId>,
  pub log_format: LogFormat,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: MEMORY_DATABASE.to_string(),
      http_timeout: Duration::from_secs(20),
      label_retention_days: 90,
      sweep_secret: None,
      payment_webhook_secret: None,
      webhook_tolerance_secs: 300,
      shipengine: None,
      carrier_direct: None,
      storage: None,
      brevo: None,
      default_provider: None,
      log_format: LogFormat::Pretty,
    }
  }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
  }
}

impl AppConfig {
  /// Loads `.env` (if present) and reads the process environment.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    let config = Self::from_lookup(|name| env::var(name).ok())?;
    tracing::info!("Application configuration loaded successfully.");
    Ok(config)
  }

  /// Builds the config from any key lookup. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let defaults = Self::default();

    let database_url = get("DATABASE_URL")
      .ok_or_else(|| AppError::Config("Missing environment variable 'DATABASE_URL'".to_string()))?;
    let server_port = parse_var("SERVER_PORT", get("SERVER_PORT"), defaults.server_port)?;
    let timeout_secs = parse_var("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 20u64)?;
    if timeout_secs == 0 {
      return Err(AppError::Config("HTTP_TIMEOUT_SECS must be at least 1".to_string()));
    }
    let http_timeout = Duration::from_secs(timeout_secs);
    let label_retention_days = parse_var("LABEL_RETENTION_DAYS", get("LABEL_RETENTION_DAYS"), defaults.label_retention_days)?;
    if !(1..=MAX_RETENTION_DAYS).contains(&label_retention_days) {
      return Err(AppError::Config(format!(
        "LABEL_RETENTION_DAYS must be between 1 and {}",
        MAX_RETENTION_DAYS
      )));
    }
    let webhook_tolerance_secs =
      parse_var("WEBHOOK_TOLERANCE_SECS", get("WEBHOOK_TOLERANCE_SECS"), defaults.webhook_tolerance_secs)?;

    let shipengine = get("SHIPENGINE_API_KEY").map(|api_key| ShipEngineConfig {
      api_key,
      base_url: get("SHIPENGINE_BASE_URL").unwrap_or_else(|| DEFAULT_SHIPENGINE_URL.to_string()),
      carrier_ids: get("SHIPENGINE_CARRIER_IDS")
        .map(|ids| ids.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default(),
      timeout: http_timeout,
    });

    let carrier_direct = match (get("CARRIER_API_TOKEN"), get("CARRIER_ACCOUNT_NUMBER"), get("CARRIER_BASE_URL")) {
      (Some(api_token), Some(account_number), Some(base_url)) => Some(CarrierDirectConfig {
        api_token,
        account_number,
        base_url,
        timeout: http_timeout,
      }),
      (None, None, None) => None,
      _ => {
        return Err(AppError::Config(
          "CARRIER_API_TOKEN, CARRIER_ACCOUNT_NUMBER and CARRIER_BASE_URL must be set together".to_string(),
        ))
      }
    };

    let storage = match (get("STORAGE_BASE_URL"), get("STORAGE_BUCKET"), get("STORAGE_SERVICE_KEY")) {
      (Some(base_url), Some(bucket), Some(service_key)) => Some(HttpLabelStorageConfig {
        base_url,
        bucket,
        service_key,
        timeout: http_timeout,
      }),
      (None, None, None) => None,
      _ => {
        return Err(AppError::Config(
          "STORAGE_BASE_URL, STORAGE_BUCKET and STORAGE_SERVICE_KEY must be set together".to_string(),
        ))
      }
    };

    let brevo = get("BREVO_API_KEY").map(|api_key| BrevoConfig {
      api_key,
      base_url: get("BREVO_BASE_URL").unwrap_or_else(|| DEFAULT_BREVO_URL.to_string()),
      sender_email: get("NOTIFY_SENDER_EMAIL").unwrap_or_else(|| "noreply@example.com".to_string()),
      sender_name: get("NOTIFY_SENDER_NAME").unwrap_or_else(|| "Marketplace Shipping".to_string()),
      timeout: http_timeout,
    });

    let default_provider = get("DEFAULT_PROVIDER")
      .map(|raw| raw.parse::<ProviderId>().map_err(AppError::Config))
      .transpose()?;

    let log_format = match get("LOG_FORMAT").map(|f| f.to_ascii_lowercase()).as_deref() {
      None | Some("pretty") | Some("text") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT: {}", other))),
    };

    Ok(Self {
      server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
      server_port,
      database_url,
      http_timeout,
      label_retention_days,
      sweep_secret: get("SWEEP_SECRET"),
      payment_webhook_secret: get("PAYMENT_WEBHOOK_SECRET"),
      webhook_tolerance_secs,
      shipengine,
      carrier_direct,
      storage,
      brevo,
      default_provider,
      log_format,
    })
  }

  pub fn uses_memory_store(&self) -> bool {
    self.database_url == MEMORY_DATABASE
  }
}
