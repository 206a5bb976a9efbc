use std::sync::Arc;

use actix_web::{web, HttpRequest};

use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;
use crate::storage::FileStore;

pub mod auth;
pub mod users;
pub mod ideas;
pub mod startalks;
pub mod applications;
pub mod connections;
pub mod chat;
pub mod uploads;
pub mod notifications;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub file_store: Arc<dyn FileStore>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/auth/signup").route(web::post().to(auth::signup)),
            )
            .service(
                web::resource("/auth/login").route(web::post().to(auth::login)),
            )
            .service(web::resource("/auth/me").route(web::get().to(auth::me)))
            .service(
                web::resource("/auth/profile")
                    .route(web::get().to(auth::get_profile))
                    .route(web::put().to(auth::update_profile)),
            )
            .service(web::resource("/users/{id}").route(web::get().to(users::get_user)))
            .service(
                web::resource("/ideas")
                    .route(web::get().to(ideas::list_ideas))
                    .route(web::post().to(ideas::create_idea)),
            )
            .service(
                web::resource("/ideas/{id}")
                    .route(web::get().to(ideas::get_idea))
                    .route(web::put().to(ideas::update_idea))
                    .route(web::delete().to(ideas::delete_idea)),
            )
            .service(
                web::resource("/startalks")
                    .route(web::get().to(startalks::list_startalks))
                    .route(web::post().to(startalks::create_startalk)),
            )
            .service(
                web::resource("/startalks/{id}/react").route(web::post().to(startalks::react)),
            )
            .service(
                web::resource("/startalks/{id}").route(web::delete().to(startalks::delete_startalk)),
            )
            .service(
                web::resource("/applications")
                    .route(web::get().to(applications::list_for_idea))
                    .route(web::post().to(applications::create_application)),
            )
            .service(
                web::resource("/applications/mine").route(web::get().to(applications::list_mine)),
            )
            .service(
                web::resource("/applications/{id}/status")
                    .route(web::put().to(applications::set_status)),
            )
            .service(
                web::resource("/connections").route(web::get().to(connections::list_connections)),
            )
            .service(
                web::resource("/connections/requests")
                    .route(web::get().to(connections::list_requests))
                    .route(web::post().to(connections::send_request)),
            )
            .service(
                web::resource("/connections/requests/{user_id}/accept")
                    .route(web::post().to(connections::accept_request)),
            )
            .service(
                web::resource("/connections/requests/{user_id}/reject")
                    .route(web::post().to(connections::reject_request)),
            )
            .service(
                web::resource("/connections/requests/{user_id}")
                    .route(web::delete().to(connections::withdraw_request)),
            )
            .service(
                web::resource("/connections/{user_id}")
                    .route(web::delete().to(connections::remove_connection)),
            )
            .service(
                web::resource("/chat/conversations")
                    .route(web::get().to(chat::list_conversations))
                    .route(web::post().to(chat::create_conversation)),
            )
            .service(
                web::resource("/chat/conversations/{id}/messages")
                    .route(web::get().to(chat::list_messages))
                    .route(web::post().to(chat::send_message)),
            )
            .service(
                web::resource("/chat/conversations/{id}/read")
                    .route(web::post().to(chat::mark_read)),
            )
            .service(web::resource("/upload").route(web::post().to(uploads::upload)))
            .service(
                web::resource("/notifications")
                    .route(web::get().to(notifications::list_notifications)),
            )
            .service(
                web::resource("/notifications/read-all")
                    .route(web::post().to(notifications::mark_all_read)),
            )
            .service(
                web::resource("/notifications/{id}/read")
                    .route(web::post().to(notifications::mark_read)),
            ),
    );
    // public fetch route (no /api/v1 prefix so <img src="/uploads/{hash}"> works)
    cfg.route("/uploads/{hash}", web::get().to(uploads::get_upload));
}

pub(crate) fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// Notification writes are best-effort: a failed insert is logged and never
/// fails the request that triggered it.
pub(crate) async fn notify(repo: &dyn Repo, new: crate::models::NewNotification) {
    if let Err(e) = repo.create_notification(new).await {
        log::warn!("notification write failed: {e}");
    }
}
