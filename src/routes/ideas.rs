use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, Idea, NewIdea, UpdateIdea};
use crate::routes::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/ideas",
    responses((status = 200, description = "All ideas, newest first", body = [Idea]))
)]
pub async fn list_ideas(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ideas = data.repo.list_ideas().await?;
    Ok(HttpResponse::Ok().json(ideas))
}

#[utoipa::path(
    post,
    path = "/api/v1/ideas",
    request_body = NewIdea,
    responses(
        (status = 201, description = "Idea created", body = Idea),
        (status = 400, description = "Missing title or description"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_idea(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewIdea>,
) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    if new.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    if new.description.trim().is_empty() {
        return Err(ApiError::bad_request("description must not be empty"));
    }
    if new.positions.iter().any(|p| p.title.trim().is_empty()) {
        return Err(ApiError::bad_request("position titles must not be empty"));
    }
    let idea = data.repo.create_idea(auth.user_id(), new).await?;
    metrics::increment_counter!("startives_ideas_created_total");
    Ok(HttpResponse::Created().json(idea))
}

#[utoipa::path(
    get,
    path = "/api/v1/ideas/{id}",
    params(("id" = Id, Path, description = "Idea id")),
    responses(
        (status = 200, description = "Idea", body = Idea),
        (status = 404, description = "Idea not found")
    )
)]
pub async fn get_idea(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let idea = data.repo.get_idea(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(idea))
}

#[utoipa::path(
    put,
    path = "/api/v1/ideas/{id}",
    request_body = UpdateIdea,
    params(("id" = Id, Path, description = "Idea id")),
    responses(
        (status = 200, description = "Idea updated", body = Idea),
        (status = 403, description = "Only the founder may edit"),
        (status = 404, description = "Idea not found")
    )
)]
pub async fn update_idea(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateIdea>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let idea = data.repo.get_idea(id).await?;
    if idea.founder_id != auth.user_id() {
        return Err(ApiError::Forbidden);
    }
    let updated = data.repo.update_idea(id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ideas/{id}",
    params(("id" = Id, Path, description = "Idea id")),
    responses(
        (status = 204, description = "Idea deleted"),
        (status = 403, description = "Only the founder may delete"),
        (status = 404, description = "Idea not found")
    )
)]
pub async fn delete_idea(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let idea = data.repo.get_idea(id).await?;
    if idea.founder_id != auth.user_id() {
        return Err(ApiError::Forbidden);
    }
    data.repo.delete_idea(id).await?;
    Ok(HttpResponse::NoContent().finish())
}
