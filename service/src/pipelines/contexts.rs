// shipping_desk/src/pipelines/contexts.rs

//! Per-run data for each workflow pipeline. Handlers receive these wrapped in
//! `labelflow::ContextData`.

use crate::errors::AppError;
use crate::models::{
  Order, Parcel, ProviderId, PurchaseRequest, PurchasedLabel, Rate, RateQuoteRequest, Shipment, ShipmentSpec,
};
use crate::services::ledger::SweepReport;
use crate::services::rate_token::RateTokenPayload;
use crate::state::AppState;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct QuoteRatesCtxData {
  pub app_state: AppState,
  pub request: RateQuoteRequest,
  pub spec: Option<ShipmentSpec>,
  pub targets: Vec<ProviderId>,
  pub rates: Vec<Rate>,
}

impl QuoteRatesCtxData {
  pub fn new(app_state: AppState, request: RateQuoteRequest) -> Self {
    Self {
      app_state,
      request,
      spec: None,
      targets: Vec::new(),
      rates: Vec::new(),
    }
  }
}

/// How the label is going to be bought.
#[derive(Debug, Clone)]
pub enum PurchasePlan {
  /// A rate chosen from an earlier quote.
  Token(RateTokenPayload),
  /// A full shipment; without a service code the cheapest fresh quote is bought.
  Shipment {
    spec: ShipmentSpec,
    provider: Option<ProviderId>,
    service_code: Option<String>,
  },
}

impl PurchasePlan {
  pub fn parcel(&self) -> &Parcel {
    match self {
      PurchasePlan::Token(token) => &token.shipment.parcel,
      PurchasePlan::Shipment { spec, .. } => &spec.parcel,
    }
  }
}

pub struct PurchaseLabelCtxData {
  pub app_state: AppState,
  pub request: PurchaseRequest,
  pub order_id: Option<Uuid>,
  pub plan: Option<PurchasePlan>,
  pub order: Option<Order>,
  pub label: Option<PurchasedLabel>,
  pub storage_path: Option<String>,
  pub shipment: Option<Shipment>,
  /// One detached send per seller on the order.
  pub notifications: Vec<JoinHandle<Result<(), AppError>>>,
}

impl PurchaseLabelCtxData {
  pub fn new(app_state: AppState, request: PurchaseRequest) -> Self {
    Self {
      app_state,
      request,
      order_id: None,
      plan: None,
      order: None,
      label: None,
      storage_path: None,
      shipment: None,
      notifications: Vec::new(),
    }
  }
}

/// The fields of a payment event this service acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
  pub event_type: String,
  pub order_id: Uuid,
  pub payment_intent_id: String,
}

pub struct PaymentWebhookCtxData {
  pub app_state: AppState,
  pub raw_body: Vec<u8>,
  pub signature_header: Option<String>,
  /// Unix seconds the request was received at.
  pub received_at: i64,
  pub event_type: Option<String>,
  pub event: Option<PaymentEvent>,
  /// Whether the event changed (or had already changed) an order.
  pub handled: bool,
}

impl PaymentWebhookCtxData {
  pub fn new(app_state: AppState, raw_body: Vec<u8>, signature_header: Option<String>, received_at: i64) -> Self {
    Self {
      app_state,
      raw_body,
      signature_header,
      received_at,
      event_type: None,
      event: None,
      handled: false,
    }
  }
}

pub struct LabelSweepCtxData {
  pub app_state: AppState,
  pub bearer_token: Option<String>,
  pub retention_days: Option<i64>,
  pub report: Option<SweepReport>,
}

impl LabelSweepCtxData {
  pub fn new(app_state: AppState, bearer_token: Option<String>, retention_days: Option<i64>) -> Self {
    Self {
      app_state,
      bearer_token,
      retention_days,
      report: None,
    }
  }
}
