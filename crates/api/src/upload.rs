//! Batch upload engine.
//!
//! Every file of a batch is validated on its own; invalid files become failed
//! items and never reach the disk. Valid files are written with bounded
//! concurrency, each `put` retried with exponential backoff, and recorded as
//! `assets` rows. The report keeps the order files arrived in.

use std::time::Duration;

use atelier_core::hashing::sha256_hex;
use atelier_core::types::DbId;
use atelier_core::upload::{object_key, resolve_content_type, validate_size};
use atelier_db::models::asset::{Asset, CreateAsset};
use atelier_db::repositories::AssetRepo;
use atelier_events::bus::ASSET_UPLOADED;
use atelier_events::DomainEvent;
use atelier_storage::{StorageDisk, StorageError};
use axum::http::StatusCode;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::json;

use crate::config::UploadConfig;
use crate::state::AppState;

/// One file taken from the multipart body.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    /// `Content-Type` of the multipart field, if the client sent one.
    pub declared_type: Option<String>,
    pub data: Vec<u8>,
}

/// Where and for whom a batch is stored.
#[derive(Debug, Clone)]
pub struct BatchTarget {
    pub prefix: String,
    pub component_id: Option<DbId>,
    pub uploaded_by: Option<DbId>,
}

/// An asset row plus the URL it is served from.
///
/// `url` is `null` when the row belongs to a disk other than the active one,
/// since the active disk cannot serve it.
#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub url: Option<String>,
}

impl AssetView {
    pub fn new(asset: Asset, disk: &dyn StorageDisk) -> Self {
        let url = (asset.disk == disk.name()).then(|| disk.url(&asset.object_key));
        Self { asset, url }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadItem {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadItem {
    fn failed(name: String, error: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            asset: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub total: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub items: Vec<UploadItem>,
}

impl UploadReport {
    fn from_items(items: Vec<UploadItem>) -> Self {
        let uploaded = items.iter().filter(|i| i.ok).count();
        Self {
            total: items.len(),
            uploaded,
            failed: items.len() - uploaded,
            items,
        }
    }

    /// 201 when everything landed, 207 when some did, 422 when none did.
    pub fn status(&self) -> StatusCode {
        if self.failed == 0 {
            StatusCode::CREATED
        } else if self.uploaded > 0 {
            StatusCode::MULTI_STATUS
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

/// Upload every file of a batch and report per-file outcomes.
pub async fn upload_batch(
    state: &AppState,
    files: Vec<IncomingFile>,
    target: &BatchTarget,
) -> UploadReport {
    let config = &state.config.upload;

    let mut items: Vec<(usize, UploadItem)> = stream::iter(files.into_iter().enumerate())
        .map(|(index, file)| async move { (index, upload_one(state, file, target).await) })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;
    items.sort_by_key(|(index, _)| *index);

    let report = UploadReport::from_items(items.into_iter().map(|(_, item)| item).collect());
    tracing::info!(
        total = report.total,
        uploaded = report.uploaded,
        failed = report.failed,
        prefix = %target.prefix,
        "Batch upload finished",
    );
    report
}

async fn upload_one(state: &AppState, file: IncomingFile, target: &BatchTarget) -> UploadItem {
    let config = &state.config.upload;
    let disk = state.storage.as_ref();

    if let Err(e) = validate_size(&file.name, file.data.len(), config.max_upload_bytes) {
        return UploadItem::failed(file.name, e.to_string());
    }
    let content_type = match resolve_content_type(&file.name, file.declared_type.as_deref()) {
        Ok(ct) => ct,
        Err(e) => return UploadItem::failed(file.name, e.to_string()),
    };

    let key = object_key(&target.prefix, &file.name);
    if let Err(e) = put_with_retry(disk, &key, &file.data, &content_type, config).await {
        tracing::warn!(file = %file.name, key = %key, error = %e, "Upload failed");
        return UploadItem::failed(file.name, e.to_string());
    }

    let input = CreateAsset {
        disk: disk.name().to_string(),
        object_key: key.clone(),
        original_name: file.name.clone(),
        content_type,
        size_bytes: file.data.len() as i64,
        checksum_sha256: sha256_hex(&file.data),
        uploaded_by: target.uploaded_by,
        component_id: target.component_id,
    };
    match AssetRepo::create(&state.pool, &input).await {
        Ok(asset) => {
            state.event_bus.publish(
                DomainEvent::new(ASSET_UPLOADED)
                    .with_entity("asset", asset.id)
                    .with_optional_actor(target.uploaded_by)
                    .with_payload(json!({ "object_key": asset.object_key, "disk": asset.disk })),
            );
            UploadItem {
                name: file.name,
                ok: true,
                asset: Some(AssetView::new(asset, disk)),
                error: None,
            }
        }
        Err(e) => {
            tracing::error!(file = %file.name, key = %key, error = %e, "Asset row insert failed");
            // Do not leave an object no row points at.
            if let Err(cleanup) = disk.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Orphan object cleanup failed");
            }
            let message = match &e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                    "Referenced component does not exist".to_string()
                }
                _ => "Could not record the uploaded file".to_string(),
            };
            UploadItem::failed(file.name, message)
        }
    }
}

/// Write to the disk, retrying transient failures up to `max_retries` times
/// with a delay of `retry_base_delay_ms * 2^attempt`.
pub async fn put_with_retry(
    disk: &dyn StorageDisk,
    key: &str,
    data: &[u8],
    content_type: &str,
    config: &UploadConfig,
) -> Result<(), StorageError> {
    let mut attempt: u32 = 0;
    loop {
        match disk.put(key, data, content_type).await {
            Ok(()) => return Ok(()),
            // A bad key fails the same way every time.
            Err(e @ StorageError::InvalidKey(_)) => return Err(e),
            Err(e) if attempt >= config.max_retries => return Err(e),
            Err(e) => {
                let delay = backoff_delay(config.retry_base_delay_ms, attempt);
                tracing::debug!(key, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying upload");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
}
