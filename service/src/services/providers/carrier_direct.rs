// shipping_desk/src/services/providers/carrier_direct.rs

use super::{http_client, ProviderFailure, ShippingProvider};
use crate::models::rate::to_cents;
use crate::models::{Address, Parcel, ProviderId, PurchasedLabel, QuotedRate, ShipmentSpec};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: ProviderId = ProviderId::CarrierDirect;
const DEFAULT_CARRIER_NAME: &str = "Carrier Direct";

#[derive(Debug, Clone)]
pub struct CarrierDirectConfig {
  pub api_token: String,
  pub account_number: String,
  pub base_url: String,
  pub timeout: Duration,
}

/// Client for a single carrier's own rating and shipping API. It has no
/// server-side rate ids; a purchase always sends the full shipment.
pub struct CarrierDirectClient {
  client: reqwest::Client,
  config: CarrierDirectConfig,
}

impl CarrierDirectClient {
  pub fn new(config: CarrierDirectConfig) -> reqwest::Result<Self> {
    Ok(Self {
      client: http_client(config.timeout)?,
      config,
    })
  }

  async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderFailure>
  where
    B: Serialize,
    R: DeserializeOwned,
  {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
    debug!(%url, "Calling carrier API.");
    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.config.api_token)
      .json(body)
      .send()
      .await
      .map_err(|e| ProviderFailure::transport(PROVIDER, e))?;

    let status = response.status();
    let text = response.text().await.map_err(|e| ProviderFailure::transport(PROVIDER, e))?;
    if !status.is_success() {
      let first = serde_json::from_str::<ErrorEnvelope>(&text)
        .ok()
        .and_then(|envelope| envelope.response.errors.into_iter().next());
      return Err(match first {
        Some(err) => ProviderFailure::new(PROVIDER, err.message).with_code(err.code),
        None => ProviderFailure::new(PROVIDER, format!("HTTP {}", status.as_u16())),
      });
    }
    serde_json::from_str(&text).map_err(|e| ProviderFailure::new(PROVIDER, format!("unreadable response: {}", e)))
  }
}

#[async_trait]
impl ShippingProvider for CarrierDirectClient {
  fn id(&self) -> ProviderId {
    PROVIDER
  }

  fn supports_rate_ids(&self) -> bool {
    false
  }

  #[instrument(name = "CarrierDirect::quote_rates", skip_all)]
  async fn quote_rates(&self, spec: &ShipmentSpec) -> Result<Vec<QuotedRate>, ProviderFailure> {
    let body = QuoteRequest {
      account_number: &self.config.account_number,
      ship_from: (&spec.ship_from).into(),
      ship_to: (&spec.ship_to).into(),
      package: (&spec.parcel).into(),
    };
    let response: QuoteResponse = self.post("/rating/v1/quotes", &body).await?;

    response
      .quotes
      .into_iter()
      .map(|quote| -> Result<QuotedRate, ProviderFailure> {
        let charge = quote.total_charge.parse()?;
        Ok(QuotedRate {
          rate_id: None,
          carrier_id: self.config.account_number.clone(),
          carrier: quote.carrier.unwrap_or_else(|| DEFAULT_CARRIER_NAME.to_string()),
          service_name: quote.service_name.unwrap_or_else(|| quote.service_code.clone()),
          service_code: quote.service_code,
          amount_cents: charge.0,
          currency: charge.1,
          estimated_days: quote.transit_days,
        })
      })
      .collect()
  }

  async fn purchase_rate(&self, rate_id: &str) -> Result<PurchasedLabel, ProviderFailure> {
    Err(ProviderFailure::new(
      PROVIDER,
      format!("purchase by rate id is not supported (got '{}')", rate_id),
    ))
  }

  #[instrument(name = "CarrierDirect::purchase_shipment", skip(self, spec))]
  async fn purchase_shipment(&self, spec: &ShipmentSpec, service_code: &str) -> Result<PurchasedLabel, ProviderFailure> {
    let body = LabelRequest {
      account_number: &self.config.account_number,
      service_code,
      ship_from: (&spec.ship_from).into(),
      ship_to: (&spec.ship_to).into(),
      package: (&spec.parcel).into(),
    };
    let label: LabelResponse = self.post("/shipments/v1/labels", &body).await?;
    let (amount_cents, currency) = label.total_charge.parse()?;
    if label.tracking_number.trim().is_empty() {
      return Err(ProviderFailure::new(PROVIDER, "label response has no tracking number"));
    }

    Ok(PurchasedLabel {
      provider: PROVIDER,
      label_id: Some(label.shipment_id),
      rate_id: None,
      service_code: label.service_code.unwrap_or_else(|| service_code.to_string()),
      carrier_id: self.config.account_number.clone(),
      carrier: label.carrier.unwrap_or_else(|| DEFAULT_CARRIER_NAME.to_string()),
      tracking_number: label.tracking_number,
      label_url: label.label_url,
      amount_cents,
      currency,
    })
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAddress<'a> {
  name: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  company: Option<&'a str>,
  phone: &'a str,
  address_lines: [&'a str; 2],
  city: &'a str,
  state_province_code: &'a str,
  postal_code: &'a str,
  country_code: &'a str,
}

impl<'a> From<&'a Address> for WireAddress<'a> {
  fn from(a: &'a Address) -> Self {
    Self {
      name: &a.name,
      company: a.company.as_deref(),
      phone: &a.phone,
      address_lines: [a.address_line1.as_str(), a.address_line2.as_str()],
      city: &a.city,
      state_province_code: &a.state,
      postal_code: &a.postal_code,
      country_code: &a.country,
    }
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePackage {
  weight_oz: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  dimensions_in: Option<[f64; 3]>,
}

impl From<&Parcel> for WirePackage {
  fn from(p: &Parcel) -> Self {
    Self {
      weight_oz: p.weight_oz,
      dimensions_in: p.dimensions().map(|(l, w, h)| [l, w, h]),
    }
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
  account_number: &'a str,
  ship_from: WireAddress<'a>,
  ship_to: WireAddress<'a>,
  package: WirePackage,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LabelRequest<'a> {
  account_number: &'a str,
  service_code: &'a str,
  ship_from: WireAddress<'a>,
  ship_to: WireAddress<'a>,
  package: WirePackage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Charge {
  /// Decimal amount as a string, e.g. `"12.40"`.
  monetary_value: String,
  currency_code: String,
}

impl Charge {
  fn parse(&self) -> Result<(i64, String), ProviderFailure> {
    let amount: f64 = self
      .monetary_value
      .trim()
      .parse()
      .map_err(|_| ProviderFailure::new(PROVIDER, format!("invalid charge '{}'", self.monetary_value)))?;
    Ok((to_cents(amount), self.currency_code.trim().to_ascii_uppercase()))
  }
}

#[derive(Deserialize)]
struct QuoteResponse {
  #[serde(default)]
  quotes: Vec<WireQuote>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuote {
  service_code: String,
  #[serde(default)]
  service_name: Option<String>,
  #[serde(default)]
  carrier: Option<String>,
  total_charge: Charge,
  #[serde(default)]
  transit_days: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelResponse {
  shipment_id: String,
  tracking_number: String,
  label_url: String,
  #[serde(default)]
  service_code: Option<String>,
  #[serde(default)]
  carrier: Option<String>,
  total_charge: Charge,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
  response: ErrorList,
}

#[derive(Deserialize)]
struct ErrorList {
  #[serde(default)]
  errors: Vec<WireError>,
}

#[derive(Deserialize)]
struct WireError {
  #[serde(default)]
  code: Option<String>,
  message: String,
}
