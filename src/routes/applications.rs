use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Application, ApplicationStatus, Id, NewApplication, NewNotification, NotificationKind};
use crate::routes::{notify, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    pub idea_id: Id,
    pub position_id: Id,
    #[serde(default)]
    pub answers: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub status: String, // "pending" | "accepted" | "rejected"
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub idea_id: Option<Id>,
}

#[utoipa::path(
    post,
    path = "/api/v1/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = Application),
        (status = 400, description = "Founder applying to own idea"),
        (status = 404, description = "Idea or position not found"),
        (status = 409, description = "Already applied to this position")
    )
)]
pub async fn create_application(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<CreateApplicationRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_application(&auth.user_id().to_string()) {
            return Err(ApiError::RateLimited);
        }
    }
    let req = payload.into_inner();
    let idea = data.repo.get_idea(req.idea_id).await?;
    if idea.founder_id == auth.user_id() {
        return Err(ApiError::bad_request("founders cannot apply to their own idea"));
    }
    if !idea.positions.iter().any(|p| p.id == req.position_id) {
        return Err(ApiError::NotFound);
    }
    let application = data
        .repo
        .create_application(NewApplication {
            idea_id: req.idea_id,
            position_id: req.position_id,
            applicant_id: auth.user_id(),
            answers: req.answers,
        })
        .await?;
    notify(
        data.repo.as_ref(),
        NewNotification {
            receiver_id: idea.founder_id,
            sender_id: auth.user_id(),
            kind: NotificationKind::ApplicationReceived,
            group_key: format!("application_received:{}", idea.id),
        },
    )
    .await;
    Ok(HttpResponse::Created().json(application))
}

#[utoipa::path(
    get,
    path = "/api/v1/applications",
    params(("idea_id" = Id, Query, description = "Idea whose applications to list")),
    responses(
        (status = 200, description = "Applications for the idea", body = [Application]),
        (status = 403, description = "Only the founder may list applications"),
        (status = 404, description = "Idea not found")
    )
)]
pub async fn list_for_idea(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let idea_id = query
        .idea_id
        .ok_or_else(|| ApiError::bad_request("idea_id query parameter required"))?;
    let idea = data.repo.get_idea(idea_id).await?;
    if idea.founder_id != auth.user_id() {
        return Err(ApiError::Forbidden);
    }
    let applications = data.repo.list_applications_for_idea(idea_id).await?;
    Ok(HttpResponse::Ok().json(applications))
}

pub async fn list_mine(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let applications = data.repo.list_applications_by_applicant(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(applications))
}

#[utoipa::path(
    put,
    path = "/api/v1/applications/{id}/status",
    request_body = SetStatusRequest,
    params(("id" = Id, Path, description = "Application id")),
    responses(
        (status = 200, description = "Status updated", body = Application),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Only the idea's founder may change status"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn set_status(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<SetStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let status = ApplicationStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::bad_request("status must be pending, accepted or rejected"))?;
    let id = path.into_inner();
    let application = data.repo.get_application(id).await?;
    let idea = data.repo.get_idea(application.idea_id).await?;
    if idea.founder_id != auth.user_id() {
        return Err(ApiError::Forbidden);
    }
    let updated = data.repo.set_application_status(id, status).await?;
    notify(
        data.repo.as_ref(),
        NewNotification {
            receiver_id: updated.applicant_id,
            sender_id: auth.user_id(),
            kind: NotificationKind::ApplicationStatus,
            group_key: format!("application_status:{id}"),
        },
    )
    .await;
    Ok(HttpResponse::Ok().json(updated))
}
