// shipping_desk/src/pipelines/quote_rates_pipeline.rs

use crate::errors::AppError;
use crate::models::{ProviderId, QuotedRate, Rate};
use crate::pipelines::common_steps::{build_shipment_spec, require_provider};
use crate::pipelines::contexts::QuoteRatesCtxData;
use crate::services::rate_token::{self, RateTokenPayload};
use futures_util::future::join_all;
use labelflow::{ContextData, Pipeline, PipelineControl, Registry, StepDef};
use tracing::{debug, info, instrument, warn};

pub fn register_quote_rates_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<QuoteRatesCtxData, AppError>::new(vec![
    StepDef::required("validate_rate_request"),
    StepDef::required("select_providers"),
    StepDef::required("fetch_provider_quotes"),
  ]);

  p.on("validate_rate_request", validate_rate_request);
  p.on("select_providers", select_providers);
  p.on("fetch_provider_quotes", fetch_provider_quotes);

  registry.register(p);
}

#[instrument(name = "quote_rates::validate_rate_request", skip_all)]
async fn validate_rate_request(ctx: ContextData<QuoteRatesCtxData>) -> Result<PipelineControl, AppError> {
  let spec = {
    let guard = ctx.read();
    build_shipment_spec(
      guard.request.ship_from.as_ref(),
      guard.request.ship_to.as_ref(),
      guard.request.parcel.as_ref(),
    )
  };
  match spec {
    Ok(spec) => {
      ctx.write().spec = Some(spec);
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      warn!(error = %e, "Rejected rate request.");
      Err(e)
    }
  }
}

#[instrument(name = "quote_rates::select_providers", skip_all)]
async fn select_providers(ctx: ContextData<QuoteRatesCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx.write();
  let targets = match guard.request.provider {
    Some(id) => vec![require_provider(&guard.app_state.providers, id)?.id()],
    None => guard.app_state.providers.ids(),
  };
  if targets.is_empty() {
    return Err(AppError::Config("no shipping provider is enabled".to_string()));
  }
  debug!(?targets, "Providers selected for quoting.");
  guard.targets = targets;
  Ok(PipelineControl::Continue)
}

/// Drops rates a caller could not act on, logging each one.
fn usable(provider: ProviderId, quote: &QuotedRate) -> bool {
  let ok = quote.is_well_formed();
  if !ok {
    warn!(%provider, carrier = %quote.carrier, service = %quote.service_code, "Dropping malformed rate.");
  }
  ok
}

#[instrument(name = "quote_rates::fetch_provider_quotes", skip_all)]
async fn fetch_provider_quotes(ctx: ContextData<QuoteRatesCtxData>) -> Result<PipelineControl, AppError> {
  let (providers, spec) = {
    let guard = ctx.read();
    let spec = guard
      .spec
      .clone()
      .ok_or_else(|| AppError::Internal("shipment spec missing before quoting".to_string()))?;
    let providers = guard
      .targets
      .iter()
      .filter_map(|id| guard.app_state.providers.get(*id))
      .collect::<Vec<_>>();
    (providers, spec)
  };

  // One attempt per provider, all in flight at once.
  let answers = join_all(providers.iter().map(|provider| {
    let spec = &spec;
    async move { (provider.id(), provider.quote_rates(spec).await) }
  }))
  .await;

  let mut rates = Vec::new();
  for (provider, answer) in answers {
    let quotes = answer.map_err(|failure| {
      warn!(%provider, error = %failure, "Provider quote failed.");
      AppError::from(failure)
    })?;
    debug!(%provider, count = quotes.len(), "Provider answered.");
    for quote in quotes.into_iter().filter(|q| usable(provider, q)) {
      let token = rate_token::encode(&RateTokenPayload::for_quote(provider, &quote, &spec))?;
      rates.push(Rate {
        provider,
        carrier: quote.carrier,
        carrier_id: quote.carrier_id,
        service_code: quote.service_code,
        service_name: quote.service_name,
        price: quote.amount_cents as f64 / 100.0,
        amount_cents: quote.amount_cents,
        currency: quote.currency,
        estimated_days: quote.estimated_days,
        rate_token: token,
      });
    }
  }

  rates.sort_by_key(|r| (r.amount_cents, r.estimated_days.unwrap_or(u32::MAX)));
  info!(count = rates.len(), "Rates collected.");
  ctx.write().rates = rates;
  Ok(PipelineControl::Continue)
}
