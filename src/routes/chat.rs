use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Conversation, Id, Message, NewConversation, NewMessage, NewNotification, NotificationKind};
use crate::routes::{notify, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    pub user_ids: Vec<Id>,
    #[serde(default)]
    pub is_team: bool,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub text: Option<String>,
    pub file_hash: Option<String>,
    pub mime: Option<String>,
}

fn require_participant(convo: &Conversation, user_id: Id) -> Result<(), ApiError> {
    if convo.user_ids.contains(&user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/conversations",
    responses(
        (status = 200, description = "Caller's conversations, most recent activity first", body = [Conversation]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_conversations(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conversations = data.repo.list_conversations(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = Conversation),
        (status = 200, description = "Existing direct conversation returned", body = Conversation),
        (status = 400, description = "Invalid participant set"),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn create_conversation(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    // participant set always includes the caller, deduplicated
    let mut user_ids = req.user_ids;
    user_ids.push(auth.user_id());
    user_ids.sort_unstable();
    user_ids.dedup();

    if req.is_team {
        let name = match req.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => return Err(ApiError::bad_request("team conversations need a name")),
        };
        if user_ids.len() < 2 {
            return Err(ApiError::bad_request("team conversations need at least two members"));
        }
        let convo = data
            .repo
            .create_conversation(NewConversation {
                creator_id: auth.user_id(),
                user_ids,
                is_team: true,
                name: Some(name),
            })
            .await?;
        return Ok(HttpResponse::Created().json(convo));
    }

    if user_ids.len() != 2 {
        return Err(ApiError::bad_request("direct conversations have exactly one other member"));
    }
    let other = *user_ids.iter().find(|&&id| id != auth.user_id()).unwrap_or(&auth.user_id());
    if let Some(existing) = data.repo.find_direct_conversation(auth.user_id(), other).await? {
        return Ok(HttpResponse::Ok().json(existing));
    }
    let convo = data
        .repo
        .create_conversation(NewConversation {
            creator_id: auth.user_id(),
            user_ids,
            is_team: false,
            name: None,
        })
        .await?;
    Ok(HttpResponse::Created().json(convo))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/conversations/{id}/messages",
    params(("id" = Id, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [Message]),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn list_messages(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let convo = data.repo.get_conversation(id).await?;
    require_participant(&convo, auth.user_id())?;
    let messages = data.repo.list_messages(id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/conversations/{id}/messages",
    request_body = SendMessageRequest,
    params(("id" = Id, Path, description = "Conversation id")),
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Neither text nor file given"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn send_message(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_message(&auth.user_id().to_string()) {
            return Err(ApiError::RateLimited);
        }
    }
    let id = path.into_inner();
    let convo = data.repo.get_conversation(id).await?;
    require_participant(&convo, auth.user_id())?;

    let req = payload.into_inner();
    let text = req.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    if text.is_none() && req.file_hash.is_none() {
        return Err(ApiError::bad_request("message needs text or a file"));
    }
    let message = data
        .repo
        .create_message(NewMessage {
            conversation_id: id,
            sender_id: auth.user_id(),
            text,
            file_hash: req.file_hash,
            mime: req.mime,
        })
        .await?;
    metrics::increment_counter!("startives_messages_total");
    for &participant in convo.user_ids.iter().filter(|&&u| u != auth.user_id()) {
        notify(
            data.repo.as_ref(),
            NewNotification {
                receiver_id: participant,
                sender_id: auth.user_id(),
                kind: NotificationKind::NewMessage,
                group_key: format!("new_message:{id}"),
            },
        )
        .await;
    }
    Ok(HttpResponse::Created().json(message))
}

pub async fn mark_read(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let convo = data.repo.get_conversation(id).await?;
    require_participant(&convo, auth.user_id())?;
    let marked = data.repo.mark_read(id, auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "marked": marked })))
}
