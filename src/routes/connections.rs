use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewNotification, NotificationKind, PublicUser};
use crate::routes::{notify, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConnectionRequestBody {
    pub user_id: Id,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingRequests {
    pub incoming: Vec<PublicUser>,
    pub sent: Vec<PublicUser>,
}

#[utoipa::path(
    get,
    path = "/api/v1/connections",
    responses(
        (status = 200, description = "Connected users", body = [PublicUser]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_connections(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let me = data.repo.get_user(auth.user_id()).await?;
    let users = data.repo.get_users(&me.connections).await?;
    let out: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    Ok(HttpResponse::Ok().json(out))
}

pub async fn list_requests(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let me = data.repo.get_user(auth.user_id()).await?;
    let incoming = data.repo.get_users(&me.connection_requests).await?;
    let sent = data.repo.get_users(&me.sent_requests).await?;
    Ok(HttpResponse::Ok().json(PendingRequests {
        incoming: incoming.into_iter().map(PublicUser::from).collect(),
        sent: sent.into_iter().map(PublicUser::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/requests",
    request_body = ConnectionRequestBody,
    responses(
        (status = 201, description = "Request sent"),
        (status = 400, description = "Requesting yourself"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already connected or already pending")
    )
)]
pub async fn send_request(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ConnectionRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let to = payload.user_id;
    data.repo.send_connection_request(auth.user_id(), to).await?;
    notify(
        data.repo.as_ref(),
        NewNotification {
            receiver_id: to,
            sender_id: auth.user_id(),
            kind: NotificationKind::ConnectionRequest,
            group_key: format!("connection_request:{}", auth.user_id()),
        },
    )
    .await;
    Ok(HttpResponse::Created().json(serde_json::json!({"status":"requested"})))
}

pub async fn accept_request(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let from = path.into_inner();
    data.repo.accept_connection_request(auth.user_id(), from).await?;
    notify(
        data.repo.as_ref(),
        NewNotification {
            receiver_id: from,
            sender_id: auth.user_id(),
            kind: NotificationKind::ConnectionAccepted,
            group_key: format!("connection_accepted:{}", auth.user_id()),
        },
    )
    .await;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"connected"})))
}

pub async fn reject_request(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    data.repo
        .reject_connection_request(auth.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"rejected"})))
}

pub async fn withdraw_request(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    data.repo
        .withdraw_connection_request(auth.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"withdrawn"})))
}

pub async fn remove_connection(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    data.repo
        .remove_connection(auth.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"removed"})))
}
