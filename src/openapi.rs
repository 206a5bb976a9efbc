use crate::models::{
    Application, ApplicationStatus, Conversation, Idea, LastMessage, Message, NewIdea, NewPosition,
    Notification, NotificationKind, Position, PublicUser, Startalk, UpdateIdea, UpdateProfile,
    UserProfile,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::signup,
        crate::routes::auth::login,
        crate::routes::auth::get_profile,
        crate::routes::auth::update_profile,
        crate::routes::users::get_user,
        crate::routes::ideas::list_ideas,
        crate::routes::ideas::create_idea,
        crate::routes::ideas::get_idea,
        crate::routes::ideas::update_idea,
        crate::routes::ideas::delete_idea,
        crate::routes::startalks::list_startalks,
        crate::routes::startalks::create_startalk,
        crate::routes::startalks::react,
        crate::routes::startalks::delete_startalk,
        crate::routes::applications::create_application,
        crate::routes::applications::list_for_idea,
        crate::routes::applications::set_status,
        crate::routes::connections::list_connections,
        crate::routes::connections::send_request,
        crate::routes::chat::list_conversations,
        crate::routes::chat::create_conversation,
        crate::routes::chat::list_messages,
        crate::routes::chat::send_message,
        crate::routes::uploads::upload,
        crate::routes::notifications::list_notifications,
    ),
    components(schemas(
        UserProfile, PublicUser, UpdateProfile,
        Idea, NewIdea, UpdateIdea, Position, NewPosition,
        Startalk, Application, ApplicationStatus,
        Conversation, LastMessage, Message,
        Notification, NotificationKind,
        crate::routes::auth::SignupRequest,
        crate::routes::auth::LoginRequest,
        crate::routes::auth::AuthResponse,
        crate::routes::startalks::CreateStartalkRequest,
        crate::routes::startalks::ReactRequest,
        crate::routes::applications::CreateApplicationRequest,
        crate::routes::applications::SetStatusRequest,
        crate::routes::connections::ConnectionRequestBody,
        crate::routes::connections::PendingRequests,
        crate::routes::chat::CreateConversationRequest,
        crate::routes::chat::SendMessageRequest,
        crate::routes::uploads::UploadResponse,
    )),
    tags(
        (name = "auth", description = "Signup, login and profile"),
        (name = "ideas", description = "Startup idea postings"),
        (name = "startalks", description = "Short posts and reactions"),
        (name = "applications", description = "Position applications"),
        (name = "connections", description = "Connection requests"),
        (name = "chat", description = "Conversations and messages"),
    )
)]
pub struct ApiDoc;
