//! Upload Pairing Engine.
//!
//! Turns one multipart upload into CAD file records. Parts are paired by base
//! file name: the first half seen creates the record under a fresh storage
//! key, the second half is written beside it under the same key and fills in
//! the other location through an update. Pairing state lives in a
//! [`PairingArena`] owned by a single call and is dropped with it.
//!
//! The batch shape is validated before any byte is written. An I/O failure
//! midway aborts the call and leaves already-written parts on storage.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::Bytes;
use sheetflow_core::error::CoreError;
use sheetflow_core::types::{new_id, EntityId};
use sheetflow_core::upload::{self, GeometryFormat, PartMeta};
use sheetflow_db::models::cad_file::CadFile;

use crate::context::ServiceContext;
use crate::error::PipelineError;
use crate::projects::{owned_project, project_dir};

/// One uploaded file part.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner_id: EntityId,
    pub project_id: EntityId,
    pub material: String,
    pub parts: Vec<UploadPart>,
}

// ---------------------------------------------------------------------------
// Storage keys
// ---------------------------------------------------------------------------

static LAST_STORAGE_KEY: AtomicI64 = AtomicI64::new(0);

/// A nanosecond timestamp, forced strictly above every key handed out before
/// in this process.
fn next_storage_key() -> i64 {
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut last = LAST_STORAGE_KEY.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_STORAGE_KEY.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(seen) => last = seen,
        }
    }
}

// ---------------------------------------------------------------------------
// Pairing
// ---------------------------------------------------------------------------

/// A record whose first half has been stored and which waits for its pair.
struct PendingPair {
    storage_key: i64,
    record: CadFile,
}

/// Request-scoped map from base file name to the half-paired record.
#[derive(Default)]
struct PairingArena {
    pending: HashMap<String, PendingPair>,
}

impl PairingArena {
    fn take(&mut self, base: &str) -> Option<PendingPair> {
        self.pending.remove(base)
    }

    fn hold(&mut self, base: String, pair: PendingPair) {
        self.pending.insert(base, pair);
    }

    fn unpaired(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }
}

/// Project-scoped relative path of one stored half.
fn relative_path(request: &UploadRequest, storage_key: i64, file_name: &str) -> PathBuf {
    let ext = upload::extension(file_name).unwrap_or_default();
    project_dir(request.owner_id, request.project_id).join(format!("{storage_key}.{ext}"))
}

fn part_size(part: &UploadPart) -> i64 {
    i64::try_from(part.bytes.len()).unwrap_or(i64::MAX)
}

/// Store every part of the upload and return the records whose pairing
/// completed, in the order their second half arrived.
///
/// Issues exactly one create per distinct base name and one update per
/// completed pair.
pub async fn upload_cad_files(
    ctx: &ServiceContext,
    request: UploadRequest,
) -> Result<Vec<CadFile>, PipelineError> {
    let material = request.material.trim().to_string();
    if material.is_empty() {
        return Err(CoreError::Validation("Material is required".into()).into());
    }

    let metas: Vec<PartMeta<'_>> = request
        .parts
        .iter()
        .map(|p| PartMeta {
            file_name: &p.file_name,
            size: p.bytes.len() as u64,
        })
        .collect();
    upload::validate_batch(&metas, ctx.config.max_upload_file_bytes)?;

    owned_project(ctx, request.project_id, request.owner_id).await?;

    let mut arena = PairingArena::default();
    let mut completed = Vec::with_capacity(request.parts.len() / 2);

    for part in &request.parts {
        let format = GeometryFormat::from_file_name(&part.file_name)?;
        let base = upload::base_name(&part.file_name);

        match arena.take(base) {
            Some(PendingPair {
                storage_key,
                mut record,
            }) => {
                let location = ctx
                    .storage
                    .write_new(&relative_path(&request, storage_key, &part.file_name), &part.bytes)
                    .await?;
                record.set_location(format, location);
                record.file_size += part_size(part);

                let record = ctx.store.update_cad_file(&record).await?;
                tracing::debug!(cad_file_id = %record.id, file_name = %record.file_name, "Geometry pair completed");
                completed.push(record);
            }
            None => {
                let storage_key = next_storage_key();
                let location = ctx
                    .storage
                    .write_new(&relative_path(&request, storage_key, &part.file_name), &part.bytes)
                    .await?;

                let mut record = CadFile::new(
                    new_id(),
                    request.project_id,
                    upload::display_name(base),
                    material.clone(),
                );
                record.set_location(format, location);
                record.file_size = part_size(part);

                let record = ctx.store.create_cad_file(&record).await?;
                arena.hold(
                    base.to_string(),
                    PendingPair {
                        storage_key,
                        record,
                    },
                );
            }
        }
    }

    for base in arena.unpaired() {
        tracing::warn!(base_name = %base, "Upload left a record waiting for its pair");
    }

    tracing::info!(
        project_id = %request.project_id,
        owner_id = %request.owner_id,
        parts = request.parts.len(),
        cad_files = completed.len(),
        "Upload stored",
    );
    Ok(completed)
}
