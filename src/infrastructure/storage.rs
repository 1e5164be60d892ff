use crate::config::GalleryConfig;
use crate::services::storage::LocalStorageService;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &GalleryConfig) -> anyhow::Result<Arc<LocalStorageService>> {
    let dir = &config.upload_dir;

    info!("🗂️  Upload directory: {}", dir.display());

    tokio::fs::create_dir_all(dir).await?;

    info!("✅ Upload directory '{}' is ready", dir.display());

    Ok(Arc::new(LocalStorageService::new(dir.clone())))
}
