pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::GalleryConfig;
use crate::services::gallery_service::GalleryService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Extra room on top of the file size limit for multipart framing
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::images::upload_image,
        api::handlers::images::list_gallery,
        api::handlers::images::get_image,
        api::handlers::images::delete_image,
        api::handlers::images::serve_upload,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::images::ImageResponse,
            api::handlers::images::UploadForm,
        )
    ),
    tags(
        (name = "images", description = "Image upload and gallery endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub gallery: Arc<GalleryService>,
    pub config: GalleryConfig,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        config: GalleryConfig,
    ) -> Self {
        let gallery = Arc::new(GalleryService::new(
            db.clone(),
            storage.clone(),
            config.clone(),
        ));
        Self {
            db,
            storage,
            gallery,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload", post(api::handlers::images::upload_image))
        .route("/gallery", get(api::handlers::images::list_gallery))
        .route(
            "/images/:id",
            get(api::handlers::images::get_image).delete(api::handlers::images::delete_image),
        )
        .route("/delete/:id", post(api::handlers::images::delete_image))
        .route("/uploads/:filename", get(api::handlers::images::serve_upload))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + MULTIPART_OVERHEAD,
        ))
        .with_state(state)
}
