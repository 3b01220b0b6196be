// shipping_desk/src/pipelines/purchase_label_pipeline.rs

use crate::errors::AppError;
use crate::models::{LabelReceipt, NewShipment, OrderStatus, PurchasedLabel, ShipmentSpec};
use crate::pipelines::common_steps::{build_shipment_spec, require_provider};
use crate::pipelines::contexts::{PurchaseLabelCtxData, PurchasePlan};
use crate::services::label_storage::label_path;
use crate::services::notifier::{dispatch_label_created, LabelCreatedSummary};
use crate::services::providers::{ProviderFailure, ShippingProvider};
use crate::services::rate_token;
use labelflow::{ContextData, Pipeline, PipelineControl, Registry, StepDef};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub fn register_purchase_label_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<PurchaseLabelCtxData, AppError>::new(vec![
    StepDef::required("validate_purchase_request"),
    StepDef::required("load_order_and_check_eligibility"),
    StepDef::required("guard_active_label"),
    StepDef::required("purchase_from_provider"),
    StepDef::best_effort("archive_label_file").skip_if(|ctx: ContextData<PurchaseLabelCtxData>| {
      ctx.read().app_state.label_storage.is_none()
    }),
    StepDef::required("record_shipment"),
    StepDef::best_effort("advance_order_status"),
    StepDef::best_effort("notify_seller"),
  ]);

  p.on("validate_purchase_request", validate_purchase_request);
  p.on("load_order_and_check_eligibility", load_order_and_check_eligibility);
  p.on("guard_active_label", guard_active_label);
  p.on("purchase_from_provider", purchase_from_provider);
  p.on("archive_label_file", archive_label_file);
  p.on("record_shipment", record_shipment);
  p.on("advance_order_status", advance_order_status);
  p.on("notify_seller", notify_seller);

  registry.register(p);
}

#[instrument(name = "purchase_label::validate_purchase_request", skip_all)]
async fn validate_purchase_request(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (order_id, plan) = {
    let guard = ctx.read();
    let request = &guard.request;
    let order_id = request
      .order_id
      .ok_or_else(|| AppError::Validation("orderId is required".to_string()))?;

    let token = request.rate_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let plan = match token {
      Some(token) => {
        // Tokens are caller-supplied; the embedded shipment gets the same checks as a raw one.
        let mut payload = rate_token::decode(token)?;
        let shipment = build_shipment_spec(
          Some(&payload.shipment.ship_from),
          Some(&payload.shipment.ship_to),
          Some(&payload.shipment.parcel),
        )?;
        payload.shipment = shipment;
        PurchasePlan::Token(payload)
      }
      None => PurchasePlan::Shipment {
        spec: build_shipment_spec(request.ship_from.as_ref(), request.ship_to.as_ref(), request.parcel.as_ref())?,
        provider: request.provider,
        service_code: request
          .service_code
          .as_deref()
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(String::from),
      },
    };
    (order_id, plan)
  };

  let mut guard = ctx.write();
  guard.order_id = Some(order_id);
  guard.plan = Some(plan);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "purchase_label::load_order", skip_all)]
async fn load_order_and_check_eligibility(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (orders, order_id) = {
    let guard = ctx.read();
    (guard.app_state.orders.clone(), guard.order_id)
  };
  let order_id = order_id.ok_or_else(|| AppError::Internal("order id missing after validation".to_string()))?;

  let order = orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
  if !order.status.is_shippable() {
    warn!(%order_id, status = ?order.status, "Order is not eligible for a label.");
    return Err(AppError::Validation(format!(
      "order {} is not paid; labels can only be bought for paid orders",
      order_id
    )));
  }

  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "purchase_label::guard_active_label", skip_all)]
async fn guard_active_label(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (ledger, order_id) = {
    let guard = ctx.read();
    (guard.app_state.ledger.clone(), guard.order_id)
  };
  let order_id = order_id.ok_or_else(|| AppError::Internal("order id missing after validation".to_string()))?;

  if let Some(active) = ledger.find_active_by_order(order_id).await? {
    warn!(%order_id, shipment_id = %active.id, "Order already holds an active label.");
    return Err(AppError::Conflict(format!(
      "order {} already has an active shipping label (tracking {})",
      order_id,
      active.tracking_number.as_deref().unwrap_or("unknown")
    )));
  }
  Ok(PipelineControl::Continue)
}

/// Buys by rate id when the provider supports it; an expired rate falls back
/// once to buying the full shipment with the same service.
async fn buy(
  provider: &Arc<dyn ShippingProvider>,
  rate_id: Option<&str>,
  spec: &ShipmentSpec,
  service_code: &str,
) -> Result<PurchasedLabel, ProviderFailure> {
  match rate_id.filter(|_| provider.supports_rate_ids()) {
    Some(rate_id) => match provider.purchase_rate(rate_id).await {
      Err(failure) if failure.rate_expired => {
        warn!(provider = %provider.id(), rate_id, "Rate expired; purchasing the shipment directly.");
        provider.purchase_shipment(spec, service_code).await
      }
      other => other,
    },
    None => provider.purchase_shipment(spec, service_code).await,
  }
}

#[instrument(name = "purchase_label::purchase_from_provider", skip_all)]
async fn purchase_from_provider(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (providers, plan, order_id) = {
    let guard = ctx.read();
    (guard.app_state.providers.clone(), guard.plan.clone(), guard.order_id)
  };
  let plan = plan.ok_or_else(|| AppError::Internal("purchase plan missing after validation".to_string()))?;

  let label = match plan {
    PurchasePlan::Token(token) => {
      let provider = require_provider(&providers, token.provider)?;
      buy(&provider, token.rate_id.as_deref(), &token.shipment, &token.service_code).await?
    }
    PurchasePlan::Shipment {
      spec,
      provider,
      service_code,
    } => {
      let provider = match provider {
        Some(id) => require_provider(&providers, id)?,
        None => providers
          .default_provider()
          .ok_or_else(|| AppError::Config("no shipping provider is enabled".to_string()))?,
      };
      match service_code {
        Some(service_code) => provider.purchase_shipment(&spec, &service_code).await?,
        None => {
          let cheapest = provider
            .quote_rates(&spec)
            .await?
            .into_iter()
            .filter(|q| q.is_well_formed())
            .min_by_key(|q| q.amount_cents)
            .ok_or_else(|| AppError::Provider {
              provider: provider.id().to_string(),
              message: "no rates available for this shipment".to_string(),
            })?;
          info!(service = %cheapest.service_code, amount_cents = cheapest.amount_cents, "Buying cheapest quoted rate.");
          buy(&provider, cheapest.rate_id.as_deref(), &spec, &cheapest.service_code).await?
        }
      }
    }
  };

  info!(
    order_id = ?order_id,
    provider = %label.provider,
    tracking_number = %label.tracking_number,
    amount_cents = label.amount_cents,
    "Label purchased."
  );
  ctx.write().label = Some(label);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "purchase_label::archive_label_file", skip_all)]
async fn archive_label_file(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (storage, order_id, label) = {
    let guard = ctx.read();
    (guard.app_state.label_storage.clone(), guard.order_id, guard.label.clone())
  };
  let (Some(storage), Some(order_id), Some(label)) = (storage, order_id, label) else {
    return Ok(PipelineControl::Continue);
  };

  let path = storage
    .archive(&label.label_url, &label_path(order_id, &label.tracking_number))
    .await?;
  ctx.write().storage_path = Some(path);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "purchase_label::record_shipment", skip_all)]
async fn record_shipment(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (ledger, order_id, label, parcel, storage_path, user_id) = {
    let guard = ctx.read();
    (
      guard.app_state.ledger.clone(),
      guard.order_id,
      guard.label.clone(),
      guard.plan.as_ref().map(|p| p.parcel().clone()),
      guard.storage_path.clone(),
      guard.request.user_id,
    )
  };
  let (Some(order_id), Some(label), Some(parcel)) = (order_id, label, parcel) else {
    return Err(AppError::Internal("purchase result missing before recording".to_string()));
  };

  let details = NewShipment::from_purchase(order_id, &parcel, &label, storage_path, user_id);
  match ledger.record_purchase(order_id, details).await {
    Ok(shipment) => {
      ctx.write().shipment = Some(shipment);
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      // The provider has charged for this label; the receipt is the only trace of it.
      error!(
        %order_id,
        provider = %label.provider,
        label_id = ?label.label_id,
        tracking_number = %label.tracking_number,
        label_url = %label.label_url,
        error = %e,
        "Label purchased but not recorded; manual reconciliation required."
      );
      Err(AppError::Persistence {
        message: e.to_string(),
        receipt: Some(Box::new(LabelReceipt::for_label(order_id, &label))),
      })
    }
  }
}

#[instrument(name = "purchase_label::advance_order_status", skip_all)]
async fn advance_order_status(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (orders, order) = {
    let guard = ctx.read();
    (guard.app_state.orders.clone(), guard.order.clone())
  };
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  if order.status != OrderStatus::Paid {
    return Ok(PipelineControl::Continue);
  }

  if orders.advance_status(order.id, OrderStatus::Paid, OrderStatus::Processing).await? {
    info!(order_id = %order.id, "Order moved to processing.");
  } else {
    warn!(order_id = %order.id, "Order changed state concurrently; status left as is.");
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "purchase_label::notify_seller", skip_all)]
async fn notify_seller(ctx: ContextData<PurchaseLabelCtxData>) -> Result<PipelineControl, AppError> {
  let (orders, mailer, order_id, label) = {
    let guard = ctx.read();
    (
      guard.app_state.orders.clone(),
      guard.app_state.mailer.clone(),
      guard.order_id,
      guard.label.clone(),
    )
  };
  let (Some(order_id), Some(label)) = (order_id, label) else {
    return Ok(PipelineControl::Continue);
  };

  let sellers = orders.sellers_for_order(order_id).await?;
  if sellers.is_empty() {
    warn!(%order_id, "No seller found to notify.");
    return Ok(PipelineControl::Continue);
  }

  let handles = sellers
    .into_iter()
    .map(|seller| {
      let summary = LabelCreatedSummary {
        order_id,
        seller_name: Some(seller.display_name.clone()),
        carrier: label.carrier.clone(),
        service_code: label.service_code.clone(),
        tracking_number: label.tracking_number.clone(),
        label_url: label.label_url.clone(),
        amount_cents: label.amount_cents,
        currency: label.currency.clone(),
      };
      dispatch_label_created(mailer.clone(), seller.email, summary)
    })
    .collect::<Vec<_>>();
  ctx.write().notifications = handles;
  Ok(PipelineControl::Continue)
}
