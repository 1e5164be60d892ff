use crate::api::error::AppError;
use crate::config::GalleryConfig;
use crate::entities::images;
use crate::services::allocator::FilenameAllocator;
use crate::services::image_store::ImageStore;
use crate::services::storage::StorageService;
use crate::utils::validation::{
    sanitize_upload_name, secure_filename, validate_extension, validate_file_size,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;

pub struct GalleryService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    allocator: FilenameAllocator,
    config: GalleryConfig,
}

impl GalleryService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        config: GalleryConfig,
    ) -> Self {
        let allocator =
            FilenameAllocator::new(db.clone(), storage.clone(), config.max_allocation_attempts);
        Self {
            db,
            storage,
            allocator,
            config,
        }
    }

    pub fn allocator(&self) -> &FilenameAllocator {
        &self.allocator
    }

    /// Stores `data` under a fresh name and records it.
    ///
    /// The file is written first; if the record insert then fails the file is
    /// removed again before the error is returned.
    pub async fn upload(&self, data: &[u8], original_name: &str) -> Result<images::Model, AppError> {
        validate_extension(original_name, &self.config.allowed_extensions)?;
        validate_file_size(data.len(), self.config.max_file_size)?;

        let original_filename = sanitize_upload_name(original_name);
        let stored_filename = self.allocator.allocate(&original_filename).await?;

        self.storage
            .write_new(&stored_filename, data)
            .await
            .map_err(|e| AppError::Io(format!("Failed to write {}: {}", stored_filename, e)))?;

        match ImageStore::insert(&self.db, &original_filename, &stored_filename, Utc::now()).await {
            Ok(record) => {
                tracing::info!(
                    "📸 Uploaded {} as {} (id={}, {} bytes)",
                    record.original_filename,
                    record.stored_filename,
                    record.id,
                    data.len()
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(
                    "Record insert failed for {}, removing written file: {}",
                    stored_filename,
                    e
                );
                if let Err(cleanup) = self.storage.delete_file(&stored_filename).await {
                    tracing::error!(
                        "❌ Could not remove orphaned file {}: {}",
                        stored_filename,
                        cleanup
                    );
                }
                Err(AppError::Database(e))
            }
        }
    }

    /// Removes the file and then the record.
    ///
    /// A file that is already gone is fine. Any other removal failure keeps
    /// the record so the delete can be retried.
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;

        let record = ImageStore::find_by_id(&txn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {} not found", id)))?;

        let removed = self
            .storage
            .delete_file(&record.stored_filename)
            .await
            .map_err(|e| {
                AppError::Io(format!(
                    "Failed to remove {}: {}",
                    record.stored_filename, e
                ))
            })?;
        if !removed {
            tracing::warn!(
                "File {} for image {} was already missing",
                record.stored_filename,
                id
            );
        }

        ImageStore::delete(&txn, id).await?;
        txn.commit().await?;

        tracing::info!("🗑️  Deleted image {} ({})", id, record.stored_filename);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<images::Model>, AppError> {
        Ok(ImageStore::list(&self.db).await?)
    }

    pub async fn get(&self, id: i32) -> Result<images::Model, AppError> {
        ImageStore::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {} not found", id)))
    }

    /// Reads the bytes of a stored image. Names that are not already in
    /// sanitized form are never looked up.
    pub async fn open(&self, stored_filename: &str) -> Result<Vec<u8>, AppError> {
        if stored_filename.is_empty() || secure_filename(stored_filename) != stored_filename {
            tracing::warn!("Rejected request for unsafe filename: {}", stored_filename);
            return Err(AppError::NotFound(stored_filename.to_string()));
        }

        self.storage
            .read_file(stored_filename)
            .await
            .map_err(|e| AppError::Io(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(stored_filename.to_string()))
    }
}
