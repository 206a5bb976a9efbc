use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::models::*;

#[cfg(feature = "inmem-store")]
pub mod inmem;
#[cfg(feature = "postgres-store")]
pub mod pg;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("{0}")] Invalid(String),
    #[error("storage error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Bulk fetch preserving only users that still exist.
    async fn get_users(&self, ids: &[Id]) -> RepoResult<Vec<User>>;
    async fn update_profile(&self, id: Id, upd: UpdateProfile) -> RepoResult<User>;

    async fn send_connection_request(&self, from: Id, to: Id) -> RepoResult<()>;
    /// `user` accepts the pending request from `from`; both sides gain the
    /// connection and the pending entries are cleared.
    async fn accept_connection_request(&self, user: Id, from: Id) -> RepoResult<()>;
    async fn reject_connection_request(&self, user: Id, from: Id) -> RepoResult<()>;
    async fn withdraw_connection_request(&self, from: Id, to: Id) -> RepoResult<()>;
    async fn remove_connection(&self, a: Id, b: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait IdeaRepo: Send + Sync {
    async fn list_ideas(&self) -> RepoResult<Vec<Idea>>;
    async fn create_idea(&self, founder_id: Id, new: NewIdea) -> RepoResult<Idea>;
    async fn get_idea(&self, id: Id) -> RepoResult<Idea>;
    async fn update_idea(&self, id: Id, upd: UpdateIdea) -> RepoResult<Idea>;
    /// Removes the idea together with its applications.
    async fn delete_idea(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait StartalkRepo: Send + Sync {
    async fn list_startalks(&self) -> RepoResult<Vec<Startalk>>;
    async fn create_startalk(&self, new: NewStartalk) -> RepoResult<Startalk>;
    async fn get_startalk(&self, id: Id) -> RepoResult<Startalk>;
    /// Persists a recomputed `(reactions, user_reactions)` pair as one
    /// replacement write. Last write wins; no read-modify-write locking.
    async fn replace_reactions(
        &self,
        id: Id,
        reactions: BTreeMap<String, i64>,
        user_reactions: BTreeMap<String, String>,
    ) -> RepoResult<Startalk>;
    async fn delete_startalk(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait ApplicationRepo: Send + Sync {
    /// Fails with `Conflict` when the applicant already applied to the same
    /// position of the same idea.
    async fn create_application(&self, new: NewApplication) -> RepoResult<Application>;
    async fn get_application(&self, id: Id) -> RepoResult<Application>;
    async fn list_applications_for_idea(&self, idea_id: Id) -> RepoResult<Vec<Application>>;
    async fn list_applications_by_applicant(&self, applicant_id: Id) -> RepoResult<Vec<Application>>;
    async fn set_application_status(&self, id: Id, status: ApplicationStatus) -> RepoResult<Application>;
}

#[async_trait]
pub trait ChatRepo: Send + Sync {
    /// Conversations the user participates in, most recent activity first.
    async fn list_conversations(&self, user_id: Id) -> RepoResult<Vec<Conversation>>;
    async fn find_direct_conversation(&self, a: Id, b: Id) -> RepoResult<Option<Conversation>>;
    async fn create_conversation(&self, new: NewConversation) -> RepoResult<Conversation>;
    async fn get_conversation(&self, id: Id) -> RepoResult<Conversation>;
    /// Appends a message and refreshes the conversation's last-message
    /// snapshot in the same write.
    async fn create_message(&self, new: NewMessage) -> RepoResult<Message>;
    async fn list_messages(&self, conversation_id: Id) -> RepoResult<Vec<Message>>;
    /// Adds the user to `read_by` of every message they have not read yet;
    /// returns how many were marked.
    async fn mark_read(&self, conversation_id: Id, user_id: Id) -> RepoResult<usize>;
}

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn create_notification(&self, new: NewNotification) -> RepoResult<Notification>;
    async fn list_notifications(&self, receiver_id: Id) -> RepoResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: Id, receiver_id: Id) -> RepoResult<()>;
    async fn mark_all_read(&self, receiver_id: Id) -> RepoResult<usize>;
}

pub trait Repo:
    UserRepo + IdeaRepo + StartalkRepo + ApplicationRepo + ChatRepo + NotificationRepo
{
}

impl<T> Repo for T where
    T: UserRepo + IdeaRepo + StartalkRepo + ApplicationRepo + ChatRepo + NotificationRepo
{
}
