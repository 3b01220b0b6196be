// shipping_desk/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::models::LabelReceipt;
use crate::services::providers::ProviderFailure;
use labelflow::FlowError;

#[derive(Debug, Error)]
pub enum AppError {
  /// Bad or missing input. Nothing was changed.
  #[error("Validation Error: {0}")]
  Validation(String),

  /// Signature or bearer-token check failed. Nothing was changed.
  #[error("Authentication Failed: {0}")]
  Auth(String),

  /// A referenced order or shipment does not exist.
  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// The request collides with existing state (e.g. an order already holds an active label).
  #[error("Conflict: {0}")]
  Conflict(String),

  /// An upstream shipping provider rejected the call or could not be reached.
  #[error("Provider Error ({provider}): {message}")]
  Provider { provider: String, message: String },

  /// A local write failed. When `receipt` is set the provider has already
  /// sold the label and the receipt is needed for manual reconciliation.
  #[error("Persistence Error: {message}")]
  Persistence {
    message: String,
    receipt: Option<Box<LabelReceipt>>,
  },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Name of the error class as exposed in the response envelope.
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "ValidationError",
      AppError::Auth(_) => "AuthenticationError",
      AppError::NotFound(_) => "ReferenceError",
      AppError::Conflict(_) => "ConflictError",
      AppError::Provider { .. } => "ProviderError",
      AppError::Persistence { .. } => "PersistenceError",
      AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => "InternalError",
    }
  }

  pub fn persistence(message: impl Into<String>) -> Self {
    AppError::Persistence {
      message: message.into(),
      receipt: None,
    }
  }

  /// Message safe to show to a caller. Internal faults never leak detail.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::NotFound(m) | AppError::Conflict(m) => m.clone(),
      AppError::Provider { provider, message } => format!("{}: {}", provider, message),
      AppError::Persistence { receipt: Some(_), .. } => {
        "The label was purchased but could not be saved; it has been flagged for reconciliation.".to_string()
      }
      AppError::Persistence { receipt: None, .. } => "Storage operation failed.".to_string(),
      AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "An internal error occurred.".to_string()
      }
    }
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::Conflict(m) => AppError::Conflict(m),
      StoreError::InvalidReference(m) => AppError::Validation(m),
      other => AppError::persistence(other.to_string()),
    }
  }
}

impl From<ProviderFailure> for AppError {
  fn from(failure: ProviderFailure) -> Self {
    AppError::Provider {
      provider: failure.provider.to_string(),
      message: failure.message,
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(other) => AppError::Internal(format!("{:#}", other)),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Provider { .. } => StatusCode::BAD_GATEWAY,
      AppError::Persistence { .. } | AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, kind = self.kind(), "Responding with error");
    let mut body = json!({
      "success": false,
      "error": self.public_message(),
      "kind": self.kind(),
    });
    if let AppError::Persistence { receipt: Some(receipt), .. } = self {
      body["reconciliation"] = json!(receipt);
    }
    HttpResponse::build(self.status_code()).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
