// tests/payment_webhook_tests.rs

mod common;

use chrono::Utc;
use common::*;
use labelflow::{ContextData, PipelineResult};
use serde_json::json;
use shipping_desk::errors::AppError;
use shipping_desk::models::OrderStatus;
use shipping_desk::pipelines::contexts::PaymentWebhookCtxData;
use shipping_desk::services::payment_signature::sign_payload;
use uuid::Uuid;

fn checkout_event(order_id: &str, payment_intent: &str) -> Vec<u8> {
  serde_json::to_vec(&json!({
    "id": "evt_test_1",
    "type": "checkout.session.completed",
    "data": {
      "object": {
        "id": "cs_test_1",
        "payment_intent": payment_intent,
        "metadata": { "order_id": order_id }
      }
    }
  }))
  .expect("serialize event")
}

fn signed(body: &[u8], timestamp: i64) -> String {
  sign_payload(body, WEBHOOK_SECRET, timestamp).expect("sign payload")
}

async fn deliver(
  app: &TestApp,
  body: Vec<u8>,
  header: Option<String>,
) -> Result<(PipelineResult, PaymentWebhookCtxData), AppError> {
  let ctx = ContextData::new(PaymentWebhookCtxData::new(
    app.state.clone(),
    body,
    header,
    Utc::now().timestamp(),
  ));
  let result = app.state.registry.run(ctx.clone()).await?;
  Ok((result, ctx.try_into_inner().ok().expect("context still shared after run")))
}

#[tokio::test]
async fn signed_checkout_completion_marks_order_paid() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let (other_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "pi_live_123");
  let header = signed(&body, Utc::now().timestamp());

  let (result, ctx) = deliver(&app, body, Some(header)).await.expect("webhook accepted");
  assert_eq!(result, PipelineResult::Completed);
  assert!(ctx.handled);

  let order = app.store.order(order_id).expect("order exists");
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(order.payment_intent_id.as_deref(), Some("pi_live_123"));

  let other = app.store.order(other_id).expect("other order exists");
  assert_eq!(other.status, OrderStatus::Pending);
  assert!(other.payment_intent_id.is_none());
}

#[tokio::test]
async fn wrong_signature_is_rejected_and_order_unchanged() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "pi_live_123");
  let header = sign_payload(&body, "whsec_someone_else", Utc::now().timestamp()).expect("sign");

  let err = deliver(&app, body, Some(header)).await.err().expect("must be rejected");
  assert!(matches!(err, AppError::Auth(_)));
  assert_eq!(app.store.order(order_id).map(|o| o.status), Some(OrderStatus::Pending));
}

#[tokio::test]
async fn tampered_body_is_rejected() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "pi_live_123");
  let header = signed(&body, Utc::now().timestamp());
  let tampered = checkout_event(&order_id.to_string(), "pi_attacker");

  let err = deliver(&app, tampered, Some(header)).await.err().expect("must be rejected");
  assert!(matches!(err, AppError::Auth(_)));
  assert_eq!(app.store.order(order_id).map(|o| o.status), Some(OrderStatus::Pending));
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "pi_live_123");
  let header = signed(&body, Utc::now().timestamp() - 3_600);

  let err = deliver(&app, body, Some(header)).await.err().expect("must be rejected");
  assert!(matches!(err, AppError::Auth(_)));
  assert_eq!(app.store.order(order_id).map(|o| o.status), Some(OrderStatus::Pending));
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "pi_live_123");

  let err = deliver(&app, body, None).await.err().expect("must be rejected");
  assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn other_event_types_are_acknowledged_without_changes() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = serde_json::to_vec(&json!({
    "type": "payment_intent.created",
    "data": { "object": { "metadata": { "order_id": order_id.to_string() } } }
  }))
  .expect("serialize");
  let header = signed(&body, Utc::now().timestamp());

  let (result, ctx) = deliver(&app, body, Some(header)).await.expect("acknowledged");
  assert_eq!(result, PipelineResult::Stopped);
  assert!(!ctx.handled);
  assert_eq!(ctx.event_type.as_deref(), Some("payment_intent.created"));
  assert_eq!(app.store.order(order_id).map(|o| o.status), Some(OrderStatus::Pending));
}

#[tokio::test]
async fn replayed_event_is_a_no_op() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "pi_live_123");

  deliver(&app, body.clone(), Some(signed(&body, Utc::now().timestamp())))
    .await
    .expect("first delivery");
  let first_update = app.store.order(order_id).map(|o| o.updated_at);

  let (_, ctx) = deliver(&app, body.clone(), Some(signed(&body, Utc::now().timestamp())))
    .await
    .expect("replay accepted");
  assert!(ctx.handled);
  let order = app.store.order(order_id).expect("order exists");
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(Some(order.updated_at), first_update);
}

#[tokio::test]
async fn event_for_unknown_order_is_a_reference_error() {
  let app = test_app();
  let body = checkout_event(&Uuid::new_v4().to_string(), "pi_live_123");
  let header = signed(&body, Utc::now().timestamp());

  let err = deliver(&app, body, Some(header)).await.err().expect("must fail");
  assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn event_without_order_reference_is_a_reference_error() {
  let app = test_app();
  let body = checkout_event("not-a-uuid", "pi_live_123");
  let header = signed(&body, Utc::now().timestamp());

  let err = deliver(&app, body, Some(header)).await.err().expect("must fail");
  assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn event_without_payment_intent_is_invalid() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Pending).await;
  let body = checkout_event(&order_id.to_string(), "");
  let header = signed(&body, Utc::now().timestamp());

  let err = deliver(&app, body, Some(header)).await.err().expect("must fail");
  assert!(matches!(err, AppError::Validation(_)));
  assert_eq!(app.store.order(order_id).map(|o| o.status), Some(OrderStatus::Pending));
}

#[tokio::test]
async fn order_past_pending_is_left_alone() {
  let app = test_app();
  let (order_id, _) = seed_order(&app.store, OrderStatus::Processing).await;
  let body = checkout_event(&order_id.to_string(), "pi_other");
  let header = signed(&body, Utc::now().timestamp());

  let (result, ctx) = deliver(&app, body, Some(header)).await.expect("acknowledged");
  assert_eq!(result, PipelineResult::Completed);
  assert!(!ctx.handled);
  let order = app.store.order(order_id).expect("order exists");
  assert_eq!(order.status, OrderStatus::Processing);
  assert_eq!(order.payment_intent_id.as_deref(), Some("pi_seeded"));
}
