// shipping_desk/src/services/providers/shipengine.rs

use super::{http_client, ProviderFailure, ShippingProvider};
use crate::models::rate::to_cents;
use crate::models::{Address, Parcel, ProviderId, PurchasedLabel, QuotedRate, ShipmentSpec};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PROVIDER: ProviderId = ProviderId::ShipEngine;

#[derive(Debug, Clone)]
pub struct ShipEngineConfig {
  pub api_key: String,
  pub base_url: String,
  /// Carrier accounts to quote against.
  pub carrier_ids: Vec<String>,
  pub timeout: Duration,
}

/// Client for a ShipEngine-style multi-carrier REST aggregator. Quotes carry
/// server-side rate ids, so a chosen rate is bought by id.
pub struct ShipEngineClient {
  client: reqwest::Client,
  config: ShipEngineConfig,
}

impl ShipEngineClient {
  pub fn new(config: ShipEngineConfig) -> reqwest::Result<Self> {
    Ok(Self {
      client: http_client(config.timeout)?,
      config,
    })
  }

  async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderFailure>
  where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
  {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
    debug!(%url, "Calling ShipEngine.");
    let response = self
      .client
      .post(&url)
      .header("API-Key", &self.config.api_key)
      .json(body)
      .send()
      .await
      .map_err(|e| ProviderFailure::transport(PROVIDER, e))?;

    let status = response.status();
    let text = response.text().await.map_err(|e| ProviderFailure::transport(PROVIDER, e))?;
    if !status.is_success() {
      return Err(error_from_body(status, &text));
    }
    serde_json::from_str(&text).map_err(|e| ProviderFailure::new(PROVIDER, format!("unreadable response: {}", e)))
  }
}

fn error_from_body(status: StatusCode, body: &str) -> ProviderFailure {
  let first = serde_json::from_str::<ErrorEnvelope>(body)
    .ok()
    .and_then(|envelope| envelope.errors.into_iter().next());
  let code = first.as_ref().and_then(|e| e.error_code.clone());
  let message = first
    .map(|e| e.message)
    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

  let failure = ProviderFailure::new(PROVIDER, message).with_code(code.clone());
  if status == StatusCode::GONE || code.as_deref() == Some("rate_expired") {
    failure.expired()
  } else {
    failure
  }
}

#[async_trait]
impl ShippingProvider for ShipEngineClient {
  fn id(&self) -> ProviderId {
    PROVIDER
  }

  fn supports_rate_ids(&self) -> bool {
    true
  }

  #[instrument(name = "ShipEngine::quote_rates", skip_all)]
  async fn quote_rates(&self, spec: &ShipmentSpec) -> Result<Vec<QuotedRate>, ProviderFailure> {
    let body = RatesRequest {
      rate_options: RateOptions {
        carrier_ids: &self.config.carrier_ids,
      },
      shipment: WireShipment::new(spec, None),
    };
    let response: RatesResponse = self.post("/v1/rates", &body).await?;
    let RateResponse { rates, errors } = response.rate_response;

    if rates.is_empty() {
      if let Some(err) = errors.into_iter().next() {
        return Err(ProviderFailure::new(PROVIDER, err.message).with_code(err.error_code));
      }
    } else if !errors.is_empty() {
      warn!(error_count = errors.len(), "ShipEngine returned rates alongside carrier errors.");
    }

    Ok(rates.into_iter().map(WireRate::into_quote).collect())
  }

  #[instrument(name = "ShipEngine::purchase_rate", skip(self))]
  async fn purchase_rate(&self, rate_id: &str) -> Result<PurchasedLabel, ProviderFailure> {
    let path = format!("/v1/labels/rates/{}", rate_id);
    let label: WireLabel = self.post(&path, &LabelOptions::default()).await?;
    label.into_purchased(Some(rate_id.to_string()))
  }

  #[instrument(name = "ShipEngine::purchase_shipment", skip(self, spec))]
  async fn purchase_shipment(&self, spec: &ShipmentSpec, service_code: &str) -> Result<PurchasedLabel, ProviderFailure> {
    let body = LabelRequest {
      shipment: WireShipment::new(spec, Some(service_code)),
      options: LabelOptions::default(),
    };
    let label: WireLabel = self.post("/v1/labels", &body).await?;
    label.into_purchased(None)
  }
}

#[derive(Serialize)]
struct WireAddress<'a> {
  name: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  company_name: Option<&'a str>,
  phone: &'a str,
  address_line1: &'a str,
  address_line2: &'a str,
  city_locality: &'a str,
  state_province: &'a str,
  postal_code: &'a str,
  country_code: &'a str,
  address_residential_indicator: &'static str,
}

impl<'a> From<&'a Address> for WireAddress<'a> {
  fn from(a: &'a Address) -> Self {
    Self {
      name: &a.name,
      company_name: a.company.as_deref(),
      phone: &a.phone,
      address_line1: &a.address_line1,
      address_line2: &a.address_line2,
      city_locality: &a.city,
      state_province: &a.state,
      postal_code: &a.postal_code,
      country_code: &a.country,
      address_residential_indicator: "unknown",
    }
  }
}

#[derive(Serialize)]
struct WireWeight {
  value: f64,
  unit: &'static str,
}

#[derive(Serialize)]
struct WireDimensions {
  unit: &'static str,
  length: f64,
  width: f64,
  height: f64,
}

#[derive(Serialize)]
struct WirePackage {
  weight: WireWeight,
  #[serde(skip_serializing_if = "Option::is_none")]
  dimensions: Option<WireDimensions>,
}

impl From<&Parcel> for WirePackage {
  fn from(p: &Parcel) -> Self {
    Self {
      weight: WireWeight {
        value: p.weight_oz,
        unit: "ounce",
      },
      dimensions: p.dimensions().map(|(length, width, height)| WireDimensions {
        unit: "inch",
        length,
        width,
        height,
      }),
    }
  }
}

#[derive(Serialize)]
struct WireShipment<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  service_code: Option<&'a str>,
  ship_from: WireAddress<'a>,
  ship_to: WireAddress<'a>,
  packages: Vec<WirePackage>,
}

impl<'a> WireShipment<'a> {
  fn new(spec: &'a ShipmentSpec, service_code: Option<&'a str>) -> Self {
    Self {
      service_code,
      ship_from: (&spec.ship_from).into(),
      ship_to: (&spec.ship_to).into(),
      packages: vec![(&spec.parcel).into()],
    }
  }
}

#[derive(Serialize)]
struct RateOptions<'a> {
  carrier_ids: &'a [String],
}

#[derive(Serialize)]
struct RatesRequest<'a> {
  rate_options: RateOptions<'a>,
  shipment: WireShipment<'a>,
}

#[derive(Serialize)]
struct LabelOptions {
  label_format: &'static str,
  label_layout: &'static str,
}

impl Default for LabelOptions {
  fn default() -> Self {
    Self {
      label_format: "pdf",
      label_layout: "4x6",
    }
  }
}

#[derive(Serialize)]
struct LabelRequest<'a> {
  shipment: WireShipment<'a>,
  #[serde(flatten)]
  options: LabelOptions,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
  #[serde(default)]
  errors: Vec<WireError>,
}

#[derive(Deserialize)]
struct WireError {
  #[serde(default)]
  error_code: Option<String>,
  message: String,
}

#[derive(Deserialize)]
struct WireMoney {
  amount: f64,
  currency: String,
}

#[derive(Deserialize)]
struct RatesResponse {
  rate_response: RateResponse,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RateResponse {
  rates: Vec<WireRate>,
  errors: Vec<WireError>,
}

#[derive(Deserialize)]
struct WireRate {
  rate_id: String,
  carrier_id: String,
  #[serde(default)]
  carrier_friendly_name: Option<String>,
  #[serde(default)]
  carrier_code: Option<String>,
  service_code: String,
  #[serde(default)]
  service_type: Option<String>,
  shipping_amount: WireMoney,
  #[serde(default)]
  other_amount: Option<WireMoney>,
  #[serde(default)]
  delivery_days: Option<u32>,
}

impl WireRate {
  fn into_quote(self) -> QuotedRate {
    let extra = self.other_amount.map(|m| m.amount).unwrap_or(0.0);
    let carrier = self
      .carrier_friendly_name
      .or(self.carrier_code)
      .unwrap_or_default();
    QuotedRate {
      rate_id: Some(self.rate_id),
      carrier_id: self.carrier_id,
      carrier,
      service_name: self.service_type.unwrap_or_else(|| self.service_code.clone()),
      service_code: self.service_code,
      amount_cents: to_cents(self.shipping_amount.amount + extra),
      currency: self.shipping_amount.currency.to_ascii_uppercase(),
      estimated_days: self.delivery_days,
    }
  }
}

#[derive(Deserialize)]
struct WireDownload {
  #[serde(default)]
  pdf: Option<String>,
  #[serde(default)]
  href: Option<String>,
}

#[derive(Deserialize)]
struct WireLabel {
  label_id: String,
  #[serde(default)]
  tracking_number: Option<String>,
  carrier_id: String,
  #[serde(default)]
  carrier_code: Option<String>,
  service_code: String,
  shipment_cost: WireMoney,
  label_download: WireDownload,
}

impl WireLabel {
  fn into_purchased(self, rate_id: Option<String>) -> Result<PurchasedLabel, ProviderFailure> {
    let tracking_number = self
      .tracking_number
      .filter(|t| !t.trim().is_empty())
      .ok_or_else(|| ProviderFailure::new(PROVIDER, format!("label {} has no tracking number", self.label_id)))?;
    let label_url = self
      .label_download
      .pdf
      .or(self.label_download.href)
      .ok_or_else(|| ProviderFailure::new(PROVIDER, format!("label {} has no download link", self.label_id)))?;
    Ok(PurchasedLabel {
      provider: PROVIDER,
      label_id: Some(self.label_id),
      rate_id,
      service_code: self.service_code,
      carrier: self.carrier_code.unwrap_or_else(|| self.carrier_id.clone()),
      carrier_id: self.carrier_id,
      tracking_number,
      label_url,
      amount_cents: to_cents(self.shipment_cost.amount),
      currency: self.shipment_cost.currency.to_ascii_uppercase(),
    })
  }
}
