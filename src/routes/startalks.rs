use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewNotification, NewStartalk, NotificationKind, ReactionOutcome, Startalk};
use crate::routes::{notify, AppState};

const CONTENT_MAX: usize = 1000;
const EMOJI_MAX_BYTES: usize = 32;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStartalkRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReactRequest {
    pub emoji: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/startalks",
    responses((status = 200, description = "All startalks, newest first", body = [Startalk]))
)]
pub async fn list_startalks(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let talks = data.repo.list_startalks().await?;
    Ok(HttpResponse::Ok().json(talks))
}

#[utoipa::path(
    post,
    path = "/api/v1/startalks",
    request_body = CreateStartalkRequest,
    responses(
        (status = 201, description = "Startalk posted", body = Startalk),
        (status = 400, description = "Empty or oversized content"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_startalk(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<CreateStartalkRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_startalk(&auth.user_id().to_string()) {
            return Err(ApiError::RateLimited);
        }
    }
    let content = payload.into_inner().content;
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    if content.chars().count() > CONTENT_MAX {
        return Err(ApiError::bad_request("content too long"));
    }
    let talk = data
        .repo
        .create_startalk(NewStartalk { author_id: auth.user_id(), content })
        .await?;
    Ok(HttpResponse::Created().json(talk))
}

#[utoipa::path(
    post,
    path = "/api/v1/startalks/{id}/react",
    request_body = ReactRequest,
    params(("id" = Id, Path, description = "Startalk id")),
    responses(
        (status = 200, description = "Updated startalk", body = Startalk),
        (status = 400, description = "Invalid emoji"),
        (status = 404, description = "Startalk not found")
    )
)]
pub async fn react(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ReactRequest>,
) -> Result<HttpResponse, ApiError> {
    let emoji = payload.into_inner().emoji;
    if emoji.trim().is_empty() || emoji.len() > EMOJI_MAX_BYTES {
        return Err(ApiError::bad_request("invalid emoji"));
    }
    let id = path.into_inner();
    // read-modify-write of the whole reaction pair; last write wins
    let mut talk = data.repo.get_startalk(id).await?;
    let outcome = talk.apply_reaction(auth.user_id(), &emoji);
    let updated = data
        .repo
        .replace_reactions(id, talk.reactions, talk.user_reactions)
        .await?;
    metrics::increment_counter!("startives_reactions_total");
    if matches!(outcome, ReactionOutcome::Added | ReactionOutcome::Switched)
        && updated.author_id != auth.user_id()
    {
        notify(
            data.repo.as_ref(),
            NewNotification {
                receiver_id: updated.author_id,
                sender_id: auth.user_id(),
                kind: NotificationKind::StartalkReaction,
                group_key: format!("startalk_reaction:{id}"),
            },
        )
        .await;
    }
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/startalks/{id}",
    params(("id" = Id, Path, description = "Startalk id")),
    responses(
        (status = 204, description = "Startalk deleted"),
        (status = 403, description = "Only the author may delete"),
        (status = 404, description = "Startalk not found")
    )
)]
pub async fn delete_startalk(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let talk = data.repo.get_startalk(id).await?;
    if talk.author_id != auth.user_id() {
        return Err(ApiError::Forbidden);
    }
    data.repo.delete_startalk(id).await?;
    Ok(HttpResponse::NoContent().finish())
}
