use crate::api::error::AppError;
use crate::services::image_store::ImageStore;
use crate::services::storage::StorageService;
use rand::Rng;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Picks stored filenames that collide neither with files in storage nor
/// with names already recorded in the metadata table.
///
/// Probing is read-only: the caller claims the returned name by writing the
/// file and inserting the record.
pub struct FilenameAllocator {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    max_attempts: u32,
}

impl FilenameAllocator {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, max_attempts: u32) -> Self {
        Self {
            db,
            storage,
            max_attempts,
        }
    }

    pub async fn allocate(&self, candidate: &str) -> Result<String, AppError> {
        let (stem, ext) = split_extension(candidate);
        let mut name = candidate.to_string();

        // The candidate itself is always checked, even with a zero cap
        for attempt in 1..=self.max_attempts.max(1) {
            if !self.is_taken(&name).await? {
                if attempt > 1 {
                    tracing::info!(
                        "🔀 Resolved name collision for {} as {} after {} probes",
                        candidate,
                        name,
                        attempt
                    );
                }
                return Ok(name);
            }
            name = suffixed_name(stem, ext);
        }

        Err(AppError::AllocationExhausted(candidate.to_string()))
    }

    async fn is_taken(&self, name: &str) -> Result<bool, AppError> {
        let on_disk = self
            .storage
            .file_exists(name)
            .await
            .map_err(|e| AppError::Io(e.to_string()))?;
        if on_disk {
            return Ok(true);
        }
        Ok(ImageStore::stored_filename_taken(&self.db, name).await?)
    }
}

/// Splits at the last `.`; the extension keeps its dot. Names whose only dot
/// is the leading one have no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// `{stem}_{6 hex}{ext}`: 24 bits of randomness per probe.
pub fn suffixed_name(stem: &str, ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1 << 24);
    format!("{}_{:06x}{}", stem, suffix, ext)
}
