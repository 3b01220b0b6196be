// shipping_desk/src/services/notifier.rs

//! Seller notifications. Sending is fire-and-forget: a failure is logged and
//! never reaches the purchase that triggered it.

use crate::errors::AppError;
use crate::services::providers::http_client;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
  pub to: String,
  pub to_name: Option<String>,
  pub subject: String,
  pub html_body: String,
  pub text_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;
}

/// What the seller is told about a freshly purchased label.
#[derive(Debug, Clone)]
pub struct LabelCreatedSummary {
  pub order_id: Uuid,
  pub seller_name: Option<String>,
  pub carrier: String,
  pub service_code: String,
  pub tracking_number: String,
  pub label_url: String,
  pub amount_cents: i64,
  pub currency: String,
}

fn format_amount(cents: i64, currency: &str) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  format!("{}{}.{:02} {}", sign, cents.abs() / 100, cents.abs() % 100, currency)
}

impl LabelCreatedSummary {
  fn to_email(&self, seller_email: &str) -> OutgoingEmail {
    let greeting = self.seller_name.as_deref().unwrap_or("there");
    let price = format_amount(self.amount_cents, &self.currency);
    let subject = format!("Shipping label ready for order {}", self.order_id);
    let text_body = format!(
      "Hi {},\n\nA shipping label was purchased for order {}.\nCarrier: {} ({})\nTracking number: {}\nCost: {}\nLabel: {}\n",
      greeting, self.order_id, self.carrier, self.service_code, self.tracking_number, price, self.label_url
    );
    let html_body = format!(
      "<p>Hi {},</p><p>A shipping label was purchased for order <strong>{}</strong>.</p>\
       <ul><li>Carrier: {} ({})</li><li>Tracking number: {}</li><li>Cost: {}</li></ul>\
       <p><a href=\"{}\">Download the label</a></p>",
      greeting, self.order_id, self.carrier, self.service_code, self.tracking_number, price, self.label_url
    );
    OutgoingEmail {
      to: seller_email.to_string(),
      to_name: self.seller_name.clone(),
      subject,
      html_body,
      text_body,
    }
  }
}

#[instrument(skip(mailer, summary), fields(order_id = %summary.order_id))]
pub async fn notify_seller_label_created(
  mailer: &dyn Mailer,
  seller_email: &str,
  summary: &LabelCreatedSummary,
) -> Result<(), AppError> {
  if seller_email.trim().is_empty() {
    return Err(AppError::Validation("seller has no contact email".to_string()));
  }
  mailer.send(&summary.to_email(seller_email)).await
}

/// Spawns the notification on the runtime and returns immediately. The task
/// logs its own outcome; the handle is only for callers that want to wait.
pub fn dispatch_label_created(
  mailer: Arc<dyn Mailer>,
  seller_email: String,
  summary: LabelCreatedSummary,
) -> JoinHandle<Result<(), AppError>> {
  let span = tracing::info_span!("label_created_notification", order_id = %summary.order_id);
  tokio::spawn(
    async move {
      let result = notify_seller_label_created(mailer.as_ref(), &seller_email, &summary).await;
      match &result {
        Ok(()) => info!("Seller notified of new label."),
        Err(e) => warn!(error = %e, "Seller notification failed; label purchase is unaffected."),
      }
      result
    }
    .instrument(span),
  )
}

#[derive(Debug, Clone)]
pub struct BrevoConfig {
  pub api_key: String,
  pub base_url: String,
  pub sender_email: String,
  pub sender_name: String,
  pub timeout: Duration,
}

/// Transactional email through the Brevo REST API.
pub struct BrevoMailer {
  client: reqwest::Client,
  config: BrevoConfig,
}

impl BrevoMailer {
  pub fn new(config: BrevoConfig) -> reqwest::Result<Self> {
    let client = http_client(config.timeout)?;
    Ok(Self { client, config })
  }
}

#[derive(Serialize)]
struct Contact<'a> {
  email: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
  sender: Contact<'a>,
  to: [Contact<'a>; 1],
  subject: &'a str,
  html_content: &'a str,
  text_content: &'a str,
}

#[async_trait]
impl Mailer for BrevoMailer {
  #[instrument(name = "BrevoMailer::send", skip_all)]
  async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
    let body = SendRequest {
      sender: Contact {
        email: &self.config.sender_email,
        name: Some(self.config.sender_name.as_str()),
      },
      to: [Contact {
        email: &email.to,
        name: email.to_name.as_deref(),
      }],
      subject: &email.subject,
      html_content: &email.html_body,
      text_content: &email.text_body,
    };
    let url = format!("{}/v3/smtp/email", self.config.base_url.trim_end_matches('/'));
    let response = self
      .client
      .post(url)
      .header("api-key", &self.config.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::Internal(format!("email request failed: {}", e)))?;
    if !response.status().is_success() {
      return Err(AppError::Internal(format!(
        "email API returned HTTP {}",
        response.status().as_u16()
      )));
    }
    Ok(())
  }
}

/// Writes the message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
    info!(to = %email.to, subject = %email.subject, "Email (log only): {}", email.text_body);
    Ok(())
  }
}
