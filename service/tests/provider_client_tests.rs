// tests/provider_client_tests.rs

mod common;

use common::*;
use serde_json::Value;
use shipping_desk::errors::AppError;
use shipping_desk::services::label_storage::{HttpLabelStorage, HttpLabelStorageConfig, LabelStorage};
use shipping_desk::services::notifier::{notify_seller_label_created, BrevoConfig, BrevoMailer, LabelCreatedSummary};
use shipping_desk::services::providers::carrier_direct::{CarrierDirectClient, CarrierDirectConfig};
use shipping_desk::services::providers::shipengine::{ShipEngineClient, ShipEngineConfig};
use shipping_desk::services::providers::ShippingProvider;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};
use uuid::Uuid;

/// What the canned server saw for one request.
#[derive(Debug, Clone)]
struct Seen {
  method: String,
  url: String,
  headers: Vec<(String, String)>,
  body: String,
}

impl Seen {
  fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  fn json(&self) -> Value {
    serde_json::from_str(&self.body).expect("request body is JSON")
  }
}

struct CannedServer {
  base_url: String,
  handle: thread::JoinHandle<Vec<Seen>>,
}

impl CannedServer {
  fn seen(self) -> Vec<Seen> {
    self.handle.join().expect("server thread")
  }
}

/// Answers one request per `(status, body)` pair, in order, then stops.
fn spawn_canned(responses: Vec<(u16, &'static str)>) -> CannedServer {
  let server = Server::http("127.0.0.1:0").expect("server");
  let base_url = format!("http://{}", server.server_addr());
  let handle = thread::spawn(move || {
    let mut seen = Vec::new();
    for (status, body) in responses {
      let mut req = server.recv().expect("request");
      let mut text = String::new();
      req.as_reader().read_to_string(&mut text).expect("read body");
      seen.push(Seen {
        method: req.method().to_string(),
        url: req.url().to_string(),
        headers: req
          .headers()
          .iter()
          .map(|h| (h.field.to_string(), h.value.to_string()))
          .collect(),
        body: text,
      });
      let resp = Response::from_string(body)
        .with_status_code(status)
        .with_header(Header::from_bytes("Content-Type", "application/json").expect("header"));
      req.respond(resp).expect("respond");
    }
    seen
  });
  CannedServer { base_url, handle }
}

fn shipengine(base_url: &str) -> ShipEngineClient {
  ShipEngineClient::new(ShipEngineConfig {
    api_key: "TEST_se_key".to_string(),
    base_url: base_url.to_string(),
    carrier_ids: vec!["se-111".to_string(), "se-222".to_string()],
    timeout: Duration::from_secs(5),
  })
  .expect("client")
}

fn carrier_direct(base_url: &str) -> CarrierDirectClient {
  CarrierDirectClient::new(CarrierDirectConfig {
    api_token: "carrier-token".to_string(),
    account_number: "A1B2C3".to_string(),
    base_url: base_url.to_string(),
    timeout: Duration::from_secs(5),
  })
  .expect("client")
}

const SHIPENGINE_RATES: &str = r#"{
  "rate_response": {
    "rates": [
      {
        "rate_id": "se-rate-1",
        "carrier_id": "se-111",
        "carrier_friendly_name": "USPS",
        "service_code": "usps_priority_mail",
        "service_type": "USPS Priority Mail",
        "shipping_amount": { "currency": "usd", "amount": 9.5 },
        "other_amount": { "currency": "usd", "amount": 0.25 },
        "delivery_days": 2
      }
    ],
    "errors": []
  }
}"#;

const SHIPENGINE_LABEL: &str = r#"{
  "label_id": "se-label-9",
  "tracking_number": "9400111899223197428490",
  "carrier_id": "se-111",
  "carrier_code": "stamps_com",
  "service_code": "usps_priority_mail",
  "shipment_cost": { "currency": "usd", "amount": 9.75 },
  "label_download": { "pdf": "https://api.example.com/labels/se-label-9.pdf" }
}"#;

#[tokio::test]
async fn shipengine_quotes_are_normalized() {
  let server = spawn_canned(vec![(200, SHIPENGINE_RATES)]);
  let client = shipengine(&server.base_url);

  let rates = client.quote_rates(&spec()).await.expect("quotes");
  let seen = server.seen();

  assert_eq!(rates.len(), 1);
  let rate = &rates[0];
  assert_eq!(rate.rate_id.as_deref(), Some("se-rate-1"));
  assert_eq!(rate.carrier, "USPS");
  assert_eq!(rate.amount_cents, 975);
  assert_eq!(rate.currency, "USD");
  assert_eq!(rate.estimated_days, Some(2));

  assert_eq!(seen[0].method, "POST");
  assert_eq!(seen[0].url, "/v1/rates");
  assert_eq!(seen[0].header("API-Key"), Some("TEST_se_key"));
  let body = seen[0].json();
  assert_eq!(body["rate_options"]["carrier_ids"][1], "se-222");
  assert_eq!(body["shipment"]["ship_to"]["city_locality"], "Seattle");
  assert_eq!(body["shipment"]["ship_to"]["address_line2"], "Apt 3");
  assert_eq!(body["shipment"]["packages"][0]["weight"]["unit"], "ounce");
}

#[tokio::test]
async fn shipengine_buys_a_rate_by_id() {
  let server = spawn_canned(vec![(200, SHIPENGINE_LABEL)]);
  let client = shipengine(&server.base_url);

  let label = client.purchase_rate("se-rate-1").await.expect("label");
  let seen = server.seen();

  assert_eq!(seen[0].url, "/v1/labels/rates/se-rate-1");
  assert_eq!(label.tracking_number, "9400111899223197428490");
  assert_eq!(label.label_url, "https://api.example.com/labels/se-label-9.pdf");
  assert_eq!(label.label_id.as_deref(), Some("se-label-9"));
  assert_eq!(label.rate_id.as_deref(), Some("se-rate-1"));
  assert_eq!(label.amount_cents, 975);
}

#[tokio::test]
async fn shipengine_gone_marks_the_rate_expired() {
  let server = spawn_canned(vec![(
    410,
    r#"{"errors":[{"error_code":"rate_expired","message":"Rate se-rate-1 has expired"}]}"#,
  )]);
  let client = shipengine(&server.base_url);

  let failure = client.purchase_rate("se-rate-1").await.err().expect("must fail");
  server.seen();
  assert!(failure.rate_expired);
  assert_eq!(failure.code.as_deref(), Some("rate_expired"));
  assert!(failure.message.contains("expired"));
}

#[tokio::test]
async fn shipengine_rejection_carries_the_provider_message() {
  let server = spawn_canned(vec![(
    400,
    r#"{"errors":[{"error_code":"invalid_address","message":"ship_to postal code is invalid"}]}"#,
  )]);
  let client = shipengine(&server.base_url);

  let failure = client
    .purchase_shipment(&spec(), "usps_priority_mail")
    .await
    .err()
    .expect("must fail");
  let seen = server.seen();
  assert!(!failure.rate_expired);
  assert_eq!(failure.message, "ship_to postal code is invalid");
  assert_eq!(seen[0].url, "/v1/labels");
  assert_eq!(seen[0].json()["shipment"]["service_code"], "usps_priority_mail");
}

#[tokio::test]
async fn shipengine_label_without_tracking_is_a_failure() {
  let server = spawn_canned(vec![(
    200,
    r#"{
      "label_id": "se-label-10",
      "tracking_number": "",
      "carrier_id": "se-111",
      "service_code": "usps_priority_mail",
      "shipment_cost": { "currency": "usd", "amount": 9.75 },
      "label_download": { "pdf": "https://api.example.com/labels/se-label-10.pdf" }
    }"#,
  )]);
  let client = shipengine(&server.base_url);
  let failure = client.purchase_rate("se-rate-1").await.err().expect("must fail");
  server.seen();
  assert!(failure.message.contains("tracking"));
}

#[tokio::test]
async fn carrier_direct_parses_string_charges() {
  let server = spawn_canned(vec![(
    200,
    r#"{"quotes":[
      {"serviceCode":"03","serviceName":"Ground","totalCharge":{"monetaryValue":"12.40","currencyCode":"usd"},"transitDays":4},
      {"serviceCode":"01","carrier":"FastShip","totalCharge":{"monetaryValue":"31.05","currencyCode":"USD"}}
    ]}"#,
  )]);
  let client = carrier_direct(&server.base_url);

  let rates = client.quote_rates(&spec()).await.expect("quotes");
  let seen = server.seen();

  assert_eq!(rates.len(), 2);
  assert_eq!(rates[0].amount_cents, 1240);
  assert_eq!(rates[0].currency, "USD");
  assert_eq!(rates[0].carrier, "Carrier Direct");
  assert_eq!(rates[0].carrier_id, "A1B2C3");
  assert!(rates[0].rate_id.is_none());
  assert_eq!(rates[1].carrier, "FastShip");
  assert_eq!(rates[1].service_name, "01");
  assert_eq!(rates[1].amount_cents, 3105);

  assert_eq!(seen[0].url, "/rating/v1/quotes");
  assert_eq!(seen[0].header("Authorization"), Some("Bearer carrier-token"));
  let body = seen[0].json();
  assert_eq!(body["accountNumber"], "A1B2C3");
  assert_eq!(body["shipFrom"]["addressLines"][0], "12 Workshop Lane");
  assert_eq!(body["package"]["weightOz"], 16.0);
}

#[tokio::test]
async fn carrier_direct_bad_charge_is_a_failure() {
  let server = spawn_canned(vec![(
    200,
    r#"{"quotes":[{"serviceCode":"03","totalCharge":{"monetaryValue":"twelve","currencyCode":"USD"}}]}"#,
  )]);
  let client = carrier_direct(&server.base_url);
  let failure = client.quote_rates(&spec()).await.err().expect("must fail");
  server.seen();
  assert!(failure.message.contains("twelve"));
}

#[tokio::test]
async fn carrier_direct_buys_the_full_shipment() {
  let server = spawn_canned(vec![(
    200,
    r#"{"shipmentId":"cd-77","trackingNumber":"1Z999AA10123456784","labelUrl":"https://carrier.example.com/l/cd-77.pdf","totalCharge":{"monetaryValue":"12.40","currencyCode":"USD"}}"#,
  )]);
  let client = carrier_direct(&server.base_url);

  let label = client.purchase_shipment(&spec(), "03").await.expect("label");
  let seen = server.seen();

  assert_eq!(label.tracking_number, "1Z999AA10123456784");
  assert_eq!(label.service_code, "03");
  assert_eq!(label.amount_cents, 1240);
  assert_eq!(seen[0].url, "/shipments/v1/labels");
  assert_eq!(seen[0].json()["serviceCode"], "03");
}

#[tokio::test]
async fn carrier_direct_cannot_buy_by_rate_id() {
  let client = carrier_direct("http://127.0.0.1:9");
  assert!(!client.supports_rate_ids());
  let failure = client.purchase_rate("anything").await.err().expect("must fail");
  assert!(!failure.rate_expired);
}

#[tokio::test]
async fn carrier_direct_error_envelope_is_surfaced() {
  let server = spawn_canned(vec![(
    422,
    r#"{"response":{"errors":[{"code":"120802","message":"Address Validation Error on ShipTo address"}]}}"#,
  )]);
  let client = carrier_direct(&server.base_url);
  let failure = client.purchase_shipment(&spec(), "03").await.err().expect("must fail");
  server.seen();
  assert_eq!(failure.code.as_deref(), Some("120802"));
  assert!(failure.message.starts_with("Address Validation Error"));
}

fn http_storage(base_url: &str) -> HttpLabelStorage {
  HttpLabelStorage::new(HttpLabelStorageConfig {
    base_url: base_url.to_string(),
    bucket: "labels".to_string(),
    service_key: "service-role-key".to_string(),
    timeout: Duration::from_secs(5),
  })
  .expect("storage client")
}

#[tokio::test]
async fn storage_archive_downloads_then_uploads() {
  let server = spawn_canned(vec![(200, "%PDF-1.4 fake"), (200, r#"{"Key":"labels/x.pdf"}"#)]);
  let storage = http_storage(&server.base_url);
  let source = format!("{}/source/label.pdf", server.base_url);

  let stored = storage.archive(&source, "labels/order-1/TRK1.pdf").await.expect("archive");
  let seen = server.seen();

  assert_eq!(stored, "labels/order-1/TRK1.pdf");
  assert_eq!(seen[0].method, "GET");
  assert_eq!(seen[0].url, "/source/label.pdf");
  assert_eq!(seen[1].method, "POST");
  assert_eq!(seen[1].url, "/storage/v1/object/labels/labels/order-1/TRK1.pdf");
  assert_eq!(seen[1].header("Authorization"), Some("Bearer service-role-key"));
  assert_eq!(seen[1].body, "%PDF-1.4 fake");
  for request in &seen {
    let agent = request.header("User-Agent").unwrap_or_default();
    assert!(agent.starts_with("shipping_desk/"), "unexpected user agent: {}", agent);
  }
}

#[tokio::test]
async fn storage_delete_treats_missing_object_as_done() {
  let server = spawn_canned(vec![(404, r#"{"error":"not_found"}"#), (500, r#"{"error":"boom"}"#)]);
  let storage = http_storage(&server.base_url);

  storage.delete("labels/order-1/TRK1.pdf").await.expect("404 is fine");
  let err = storage.delete("labels/order-1/TRK1.pdf").await.err().expect("500 fails");
  let seen = server.seen();

  assert!(err.to_string().contains("500"));
  assert!(seen.iter().all(|s| s.method == "DELETE"));
}

fn brevo(base_url: &str) -> BrevoMailer {
  BrevoMailer::new(BrevoConfig {
    api_key: "xkeysib-test".to_string(),
    base_url: base_url.to_string(),
    sender_email: "shipping@market.example".to_string(),
    sender_name: "Market Shipping".to_string(),
    timeout: Duration::from_secs(5),
  })
  .expect("mailer")
}

fn summary(order_id: Uuid) -> LabelCreatedSummary {
  LabelCreatedSummary {
    order_id,
    seller_name: Some("Maple Crafts".to_string()),
    carrier: "USPS".to_string(),
    service_code: "usps_priority_mail".to_string(),
    tracking_number: "9400111899223197428490".to_string(),
    label_url: "https://labels.example.com/l.pdf".to_string(),
    amount_cents: 1250,
    currency: "USD".to_string(),
  }
}

#[tokio::test]
async fn label_created_email_goes_through_brevo() {
  let server = spawn_canned(vec![(201, r#"{"messageId":"<abc@smtp-relay>"}"#)]);
  let mailer = brevo(&server.base_url);
  let order_id = Uuid::new_v4();

  notify_seller_label_created(&mailer, "seller@maplecrafts.example", &summary(order_id))
    .await
    .expect("sent");
  let seen = server.seen();

  assert_eq!(seen[0].url, "/v3/smtp/email");
  assert_eq!(seen[0].header("api-key"), Some("xkeysib-test"));
  assert!(seen[0].header("User-Agent").map_or(false, |ua| ua.starts_with("shipping_desk/")));
  let body = seen[0].json();
  assert_eq!(body["sender"]["email"], "shipping@market.example");
  assert_eq!(body["to"][0]["email"], "seller@maplecrafts.example");
  assert!(body["subject"].as_str().map_or(false, |s| s.contains(&order_id.to_string())));
  let text = body["textContent"].as_str().expect("text body");
  assert!(text.contains("9400111899223197428490"));
  assert!(text.contains("12.50 USD"));
}

#[tokio::test]
async fn brevo_rejection_and_missing_address_are_errors() {
  let server = spawn_canned(vec![(401, r#"{"code":"unauthorized","message":"Key not found"}"#)]);
  let mailer = brevo(&server.base_url);

  let err = notify_seller_label_created(&mailer, "seller@maplecrafts.example", &summary(Uuid::new_v4()))
    .await
    .err()
    .expect("rejected");
  server.seen();
  assert!(err.to_string().contains("401"));

  let err = notify_seller_label_created(&mailer, "  ", &summary(Uuid::new_v4()))
    .await
    .err()
    .expect("no address");
  assert!(matches!(err, AppError::Validation(_)));
}
