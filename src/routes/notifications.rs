use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, Notification};
use crate::routes::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = [Notification]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_notifications(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let notifications = data.repo.list_notifications(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

pub async fn mark_read(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    data.repo
        .mark_notification_read(path.into_inner(), auth.user_id())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"ok"})))
}

pub async fn mark_all_read(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let marked = data.repo.mark_all_read(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "marked": marked })))
}
