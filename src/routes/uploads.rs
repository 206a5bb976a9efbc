use actix_web::{web, HttpRequest, HttpResponse};
use actix_multipart::Multipart;
use futures_util::TryStreamExt as _;
use sha2::{Digest, Sha256};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::routes::{client_ip, AppState};
use crate::storage::FileStoreError;

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub hash: String,
    pub mime: String,
    pub size: usize,
    pub duplicate: bool, // true when upload was a duplicate (idempotent)
}

const UPLOAD_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

const ALLOWED_MIME: &[&str] = &[
    "image/png", "image/jpeg", "image/gif", "image/webp",
    "video/mp4", "video/webm",
    "application/pdf", // pitch decks
];

#[utoipa::path(
    post,
    path = "/api/v1/upload",
    responses(
        (status = 201, description = "File stored (new)", body = UploadResponse),
        (status = 200, description = "File already existed (idempotent)", body = UploadResponse),
        (status = 415, description = "Unsupported media type"),
        (status = 413, description = "Payload too large"),
    )
)]
pub async fn upload(
    req: HttpRequest,
    auth: Auth,
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let _ = auth; // any signed-in user may upload
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_upload(&client_ip(&req)) {
            return Err(ApiError::RateLimited);
        }
    }
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::Internal
    })? {
        if let Some(name) = field.content_disposition().get_name() {
            if name != "file" { continue; }
        } else { continue; }
        let mut field_stream = field;
        let mut hasher = Sha256::new();
        while let Some(chunk) = field_stream.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::Internal
        })? {
            if bytes.len() + chunk.len() > UPLOAD_SIZE_LIMIT {
                return Err(ApiError::PayloadTooLarge);
            }
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        let hash = hex::encode(hasher.finalize());
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !ALLOWED_MIME.contains(&mime.as_str()) {
            return Err(ApiError::UnsupportedMediaType);
        }
        // idempotent: re-uploading identical bytes answers 200 instead of 201
        let (created, duplicate) = match data.file_store.save(&hash, &mime, &bytes).await {
            Ok(()) => (true, false),
            Err(FileStoreError::Duplicate) => (false, true),
            Err(e) => {
                log::error!("file_store save error: {e}");
                return Err(ApiError::Internal);
            }
        };
        metrics::increment_counter!("startives_uploads_total");
        let resp = UploadResponse { hash, mime, size: bytes.len(), duplicate };
        return Ok(if created {
            HttpResponse::Created().json(resp)
        } else {
            HttpResponse::Ok().json(resp)
        });
    }
    Err(ApiError::bad_request("multipart field 'file' missing"))
}

/// Serve a stored blob by hash.
pub async fn get_upload(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let hash = path.into_inner();
    if hash.len() < 2 {
        return Err(ApiError::NotFound);
    }
    match data.file_store.load(&hash).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok().insert_header(("Content-Type", mime)).body(bytes)),
        Err(FileStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            log::error!("file_store load error: {e}");
            Err(ApiError::Internal)
        }
    }
}
