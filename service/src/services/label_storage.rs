// shipping_desk/src/services/label_storage.rs

use crate::errors::AppError;
use crate::services::providers::http_client;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

const STORAGE: &str = "label_storage";

fn storage_error(message: impl Into<String>) -> AppError {
  AppError::Provider {
    provider: STORAGE.to_string(),
    message: message.into(),
  }
}

/// Object path for a label file, unique per order and tracking number.
pub fn label_path(order_id: Uuid, tracking_number: &str) -> String {
  let safe: String = tracking_number
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect();
  format!("labels/{}/{}.pdf", order_id, safe)
}

/// Blob storage for label files.
#[async_trait]
pub trait LabelStorage: Send + Sync {
  /// Copies the file at `source_url` to `path` and returns the stored path.
  async fn archive(&self, source_url: &str, path: &str) -> Result<String, AppError>;

  /// Removes the object at `path`. A missing object is not an error.
  async fn delete(&self, path: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct HttpLabelStorageConfig {
  pub base_url: String,
  pub bucket: String,
  pub service_key: String,
  pub timeout: Duration,
}

/// Supabase-style object storage over HTTP.
pub struct HttpLabelStorage {
  client: reqwest::Client,
  config: HttpLabelStorageConfig,
}

impl HttpLabelStorage {
  pub fn new(config: HttpLabelStorageConfig) -> reqwest::Result<Self> {
    let client = http_client(config.timeout)?;
    Ok(Self { client, config })
  }

  fn object_url(&self, path: &str) -> String {
    format!(
      "{}/storage/v1/object/{}/{}",
      self.config.base_url.trim_end_matches('/'),
      self.config.bucket,
      path.trim_start_matches('/')
    )
  }
}

#[async_trait]
impl LabelStorage for HttpLabelStorage {
  #[instrument(name = "HttpLabelStorage::archive", skip(self, source_url))]
  async fn archive(&self, source_url: &str, path: &str) -> Result<String, AppError> {
    let download = self
      .client
      .get(source_url)
      .send()
      .await
      .map_err(|e| storage_error(format!("label download failed: {}", e)))?;
    if !download.status().is_success() {
      return Err(storage_error(format!("label download returned HTTP {}", download.status().as_u16())));
    }
    let bytes = download
      .bytes()
      .await
      .map_err(|e| storage_error(format!("label download failed: {}", e)))?;

    let upload = self
      .client
      .post(self.object_url(path))
      .bearer_auth(&self.config.service_key)
      .header("apikey", &self.config.service_key)
      .header("content-type", "application/pdf")
      .header("x-upsert", "true")
      .body(bytes)
      .send()
      .await
      .map_err(|e| storage_error(format!("label upload failed: {}", e)))?;
    if !upload.status().is_success() {
      return Err(storage_error(format!("label upload returned HTTP {}", upload.status().as_u16())));
    }
    debug!("Label archived.");
    Ok(path.to_string())
  }

  #[instrument(name = "HttpLabelStorage::delete", skip(self))]
  async fn delete(&self, path: &str) -> Result<(), AppError> {
    let response = self
      .client
      .delete(self.object_url(path))
      .bearer_auth(&self.config.service_key)
      .header("apikey", &self.config.service_key)
      .send()
      .await
      .map_err(|e| storage_error(format!("delete failed: {}", e)))?;
    match response.status() {
      s if s.is_success() => Ok(()),
      StatusCode::NOT_FOUND => {
        debug!("Label object already gone.");
        Ok(())
      }
      s => Err(storage_error(format!("delete returned HTTP {}", s.as_u16()))),
    }
  }
}

/// In-process storage; records every delete so tests can count them.
#[derive(Default)]
pub struct MemoryLabelStorage {
  objects: Mutex<HashMap<String, String>>,
  deleted: Mutex<Vec<String>>,
  fail_archive: AtomicBool,
  fail_delete: AtomicBool,
}

impl MemoryLabelStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, path: &str, source_url: &str) {
    self.objects.lock().insert(path.to_string(), source_url.to_string());
  }

  pub fn contains(&self, path: &str) -> bool {
    self.objects.lock().contains_key(path)
  }

  pub fn deleted_paths(&self) -> Vec<String> {
    self.deleted.lock().clone()
  }

  pub fn fail_archive(&self, fail: bool) {
    self.fail_archive.store(fail, Ordering::SeqCst);
  }

  pub fn fail_delete(&self, fail: bool) {
    self.fail_delete.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl LabelStorage for MemoryLabelStorage {
  async fn archive(&self, source_url: &str, path: &str) -> Result<String, AppError> {
    if self.fail_archive.load(Ordering::SeqCst) {
      return Err(storage_error("archive unavailable"));
    }
    self.put(path, source_url);
    Ok(path.to_string())
  }

  async fn delete(&self, path: &str) -> Result<(), AppError> {
    if self.fail_delete.load(Ordering::SeqCst) {
      return Err(storage_error(format!("cannot delete {}", path)));
    }
    self.objects.lock().remove(path);
    self.deleted.lock().push(path.to_string());
    Ok(())
  }
}
