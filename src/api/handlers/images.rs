use crate::AppState;
use crate::api::error::AppError;
use crate::entities::images;
use crate::utils::validation::extension_of;
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::Response,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub original_filename: String,
    pub stored_filename: String,
    pub upload_timestamp: DateTime<Utc>,
    pub upload_date: NaiveDate,
    pub url: String,
}

impl From<images::Model> for ImageResponse {
    fn from(record: images::Model) -> Self {
        Self {
            url: format!("/uploads/{}", record.stored_filename),
            upload_date: record.upload_timestamp.date_naive(),
            id: record.id,
            original_filename: record.original_filename,
            stored_filename: record.stored_filename,
            upload_timestamp: record.upload_timestamp,
        }
    }
}

/// Multipart form accepted by `/upload`
#[derive(ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 400, description = "No file part or no selected file"),
        (status = 413, description = "File too large"),
        (status = 415, description = "File type not allowed")
    ),
    tag = "images"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageResponse>), AppError> {
    let result: Result<images::Model, AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some("file") {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            if filename.is_empty() {
                return Err(AppError::BadRequest("No selected file".to_string()));
            }

            let data = field.bytes().await.map_err(multipart_error)?;
            return state.gallery.upload(&data, &filename).await;
        }

        Err(AppError::BadRequest("No file part".to_string()))
    }
    .await;

    match result {
        Ok(record) => Ok((StatusCode::CREATED, Json(record.into()))),
        Err(e) => {
            // Drain what the client is still sending so the connection is not reset
            tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    get,
    path = "/gallery",
    responses(
        (status = 200, description = "All images, newest first", body = Vec<ImageResponse>)
    ),
    tag = "images"
)]
pub async fn list_gallery(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    let records = state.gallery.list().await?;
    Ok(Json(records.into_iter().map(ImageResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/images/{id}",
    params(
        ("id" = i32, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image record", body = ImageResponse),
        (status = 404, description = "Image not found")
    ),
    tag = "images"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ImageResponse>, AppError> {
    Ok(Json(state.gallery.get(id).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/images/{id}",
    params(
        ("id" = i32, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image file and record removed"),
        (status = 404, description = "Image not found")
    ),
    tag = "images"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.gallery.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    params(
        ("filename" = String, Path, description = "Stored filename")
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No such file")
    ),
    tag = "images"
)]
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let data = state.gallery.open(&filename).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename).as_ref())
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn content_type_for(filename: &str) -> mime::Mime {
    match extension_of(filename).map(str::to_lowercase).as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("webp") => "image/webp"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PNG"), mime::IMAGE_PNG);
        assert_eq!(content_type_for("a.jpeg"), mime::IMAGE_JPEG);
        assert_eq!(content_type_for("a.webp").essence_str(), "image/webp");
        assert_eq!(content_type_for("a"), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_response_from_record() {
        let ts = DateTime::parse_from_rfc3339("2026-10-16T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let response = ImageResponse::from(images::Model {
            id: 3,
            original_filename: "cat.png".to_string(),
            stored_filename: "cat_0a1b2c.png".to_string(),
            upload_timestamp: ts,
        });

        assert_eq!(response.url, "/uploads/cat_0a1b2c.png");
        assert_eq!(response.upload_date.to_string(), "2026-10-16");
    }
}
