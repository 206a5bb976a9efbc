use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::*;
use crate::models::*;

const SNAPSHOT_PATH: &str = "data/state.json";

#[derive(Default, Serialize, Deserialize)]
struct State {
    users: HashMap<Id, User>,
    ideas: HashMap<Id, Idea>,
    startalks: HashMap<Id, Startalk>,
    applications: HashMap<Id, Application>,
    conversations: HashMap<Id, Conversation>,
    messages: HashMap<Id, Message>,
    notifications: HashMap<Id, Notification>,
    next_id: Id,
}

/// Whole-state JSON snapshot store. Every write serializes the full state to
/// one document on disk, which keeps the backend restart-safe without a
/// database. Suitable for development and tests.
#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Arc<PathBuf>,
}

impl InMemRepo {
    fn data_dir() -> PathBuf {
        std::env::var("STARTIVES_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"))
    }

    fn snapshot_path() -> PathBuf {
        if std::env::var("STARTIVES_DATA_DIR").is_ok() {
            let mut p = Self::data_dir();
            p.push("state.json");
            p
        } else {
            PathBuf::from(SNAPSHOT_PATH)
        }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    log::info!("loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    log::warn!("failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            },
            Err(_) => State::default(),
        }
    }

    fn persist(&self) {
        let path = self.snapshot_path.clone();
        if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            if let Err(e) = std::fs::write(&*path, s) {
                log::error!("failed to write snapshot '{}': {e}", path.display());
            }
        }
    }

    pub fn new() -> Self {
        let snapshot_path = Self::snapshot_path();
        let state = Self::load_state_from(&snapshot_path);
        Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Arc::new(snapshot_path),
        }
    }

    fn next_id(state: &mut State) -> Id {
        state.next_id += 1;
        state.next_id
    }
}

impl Default for InMemRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepo for InMemRepo {
    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let mut s = self.state.write().unwrap();
        if s.users.values().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let user = User {
            id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            headline: None,
            bio: None,
            skills: Vec::new(),
            avatar_hash: None,
            connections: Vec::new(),
            connection_requests: Vec::new(),
            sent_requests: Vec::new(),
            created_at: Utc::now(),
        };
        s.users.insert(id, user.clone());
        drop(s);
        self.persist();
        Ok(user)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let s = self.state.read().unwrap();
        s.users.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let s = self.state.read().unwrap();
        Ok(s.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_users(&self, ids: &[Id]) -> RepoResult<Vec<User>> {
        let s = self.state.read().unwrap();
        Ok(ids.iter().filter_map(|id| s.users.get(id).cloned()).collect())
    }

    async fn update_profile(&self, id: Id, upd: UpdateProfile) -> RepoResult<User> {
        let mut s = self.state.write().unwrap();
        let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(name) = upd.name { user.name = name; }
        if let Some(headline) = upd.headline { user.headline = Some(headline); }
        if let Some(bio) = upd.bio { user.bio = Some(bio); }
        if let Some(skills) = upd.skills { user.skills = skills; }
        if let Some(avatar) = upd.avatar_hash { user.avatar_hash = Some(avatar); }
        let updated = user.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn send_connection_request(&self, from: Id, to: Id) -> RepoResult<()> {
        if from == to {
            return Err(RepoError::Invalid("cannot send a connection request to yourself".into()));
        }
        let mut s = self.state.write().unwrap();
        if !s.users.contains_key(&from) || !s.users.contains_key(&to) {
            return Err(RepoError::NotFound);
        }
        let sender = &s.users[&from];
        if sender.connections.contains(&to) {
            return Err(RepoError::Conflict);
        }
        // pending in either direction blocks a new request
        if sender.sent_requests.contains(&to) || sender.connection_requests.contains(&to) {
            return Err(RepoError::Conflict);
        }
        s.users.get_mut(&from).unwrap().sent_requests.push(to);
        s.users.get_mut(&to).unwrap().connection_requests.push(from);
        drop(s);
        self.persist();
        Ok(())
    }

    async fn accept_connection_request(&self, user: Id, from: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if !s.users.contains_key(&from) {
            return Err(RepoError::NotFound);
        }
        {
            let receiver = s.users.get_mut(&user).ok_or(RepoError::NotFound)?;
            if !receiver.connection_requests.contains(&from) {
                return Err(RepoError::NotFound);
            }
            receiver.connection_requests.retain(|&id| id != from);
            if !receiver.connections.contains(&from) {
                receiver.connections.push(from);
            }
        }
        {
            let sender = s.users.get_mut(&from).unwrap();
            sender.sent_requests.retain(|&id| id != user);
            if !sender.connections.contains(&user) {
                sender.connections.push(user);
            }
        }
        drop(s);
        self.persist();
        Ok(())
    }

    async fn reject_connection_request(&self, user: Id, from: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        let receiver = s.users.get_mut(&user).ok_or(RepoError::NotFound)?;
        if !receiver.connection_requests.contains(&from) {
            return Err(RepoError::NotFound);
        }
        receiver.connection_requests.retain(|&id| id != from);
        if let Some(sender) = s.users.get_mut(&from) {
            sender.sent_requests.retain(|&id| id != user);
        }
        drop(s);
        self.persist();
        Ok(())
    }

    async fn withdraw_connection_request(&self, from: Id, to: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        let sender = s.users.get_mut(&from).ok_or(RepoError::NotFound)?;
        if !sender.sent_requests.contains(&to) {
            return Err(RepoError::NotFound);
        }
        sender.sent_requests.retain(|&id| id != to);
        if let Some(receiver) = s.users.get_mut(&to) {
            receiver.connection_requests.retain(|&id| id != from);
        }
        drop(s);
        self.persist();
        Ok(())
    }

    async fn remove_connection(&self, a: Id, b: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if !s.users.get(&a).map(|u| u.connections.contains(&b)).unwrap_or(false) {
            return Err(RepoError::NotFound);
        }
        s.users.get_mut(&a).unwrap().connections.retain(|&id| id != b);
        if let Some(other) = s.users.get_mut(&b) {
            other.connections.retain(|&id| id != a);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl IdeaRepo for InMemRepo {
    async fn list_ideas(&self) -> RepoResult<Vec<Idea>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.ideas.values().cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(v)
    }

    async fn create_idea(&self, founder_id: Id, new: NewIdea) -> RepoResult<Idea> {
        let mut s = self.state.write().unwrap();
        if !s.users.contains_key(&founder_id) {
            return Err(RepoError::NotFound);
        }
        let id = Self::next_id(&mut s);
        let positions = new
            .positions
            .into_iter()
            .enumerate()
            .map(|(i, p)| Position { id: i as Id + 1, title: p.title, description: p.description })
            .collect();
        let idea = Idea {
            id,
            founder_id,
            title: new.title,
            description: new.description,
            positions,
            created_at: Utc::now(),
        };
        s.ideas.insert(id, idea.clone());
        drop(s);
        self.persist();
        Ok(idea)
    }

    async fn get_idea(&self, id: Id) -> RepoResult<Idea> {
        let s = self.state.read().unwrap();
        s.ideas.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn update_idea(&self, id: Id, upd: UpdateIdea) -> RepoResult<Idea> {
        let mut s = self.state.write().unwrap();
        let idea = s.ideas.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(title) = upd.title { idea.title = title; }
        if let Some(description) = upd.description { idea.description = description; }
        if let Some(positions) = upd.positions {
            idea.positions = positions
                .into_iter()
                .enumerate()
                .map(|(i, p)| Position { id: i as Id + 1, title: p.title, description: p.description })
                .collect();
        }
        let updated = idea.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_idea(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        s.ideas.remove(&id).ok_or(RepoError::NotFound)?;
        s.applications.retain(|_, a| a.idea_id != id);
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl StartalkRepo for InMemRepo {
    async fn list_startalks(&self) -> RepoResult<Vec<Startalk>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.startalks.values().cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(v)
    }

    async fn create_startalk(&self, new: NewStartalk) -> RepoResult<Startalk> {
        let mut s = self.state.write().unwrap();
        if !s.users.contains_key(&new.author_id) {
            return Err(RepoError::NotFound);
        }
        let id = Self::next_id(&mut s);
        let talk = Startalk {
            id,
            author_id: new.author_id,
            content: new.content,
            reactions: BTreeMap::new(),
            user_reactions: BTreeMap::new(),
            created_at: Utc::now(),
        };
        s.startalks.insert(id, talk.clone());
        drop(s);
        self.persist();
        Ok(talk)
    }

    async fn get_startalk(&self, id: Id) -> RepoResult<Startalk> {
        let s = self.state.read().unwrap();
        s.startalks.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn replace_reactions(
        &self,
        id: Id,
        reactions: BTreeMap<String, i64>,
        user_reactions: BTreeMap<String, String>,
    ) -> RepoResult<Startalk> {
        let mut s = self.state.write().unwrap();
        let talk = s.startalks.get_mut(&id).ok_or(RepoError::NotFound)?;
        talk.reactions = reactions;
        talk.user_reactions = user_reactions;
        let updated = talk.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_startalk(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        s.startalks.remove(&id).ok_or(RepoError::NotFound)?;
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl ApplicationRepo for InMemRepo {
    async fn create_application(&self, new: NewApplication) -> RepoResult<Application> {
        let mut s = self.state.write().unwrap();
        if !s.ideas.contains_key(&new.idea_id) {
            return Err(RepoError::NotFound);
        }
        let duplicate = s.applications.values().any(|a| {
            a.idea_id == new.idea_id
                && a.position_id == new.position_id
                && a.applicant_id == new.applicant_id
        });
        if duplicate {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let application = Application {
            id,
            idea_id: new.idea_id,
            position_id: new.position_id,
            applicant_id: new.applicant_id,
            status: ApplicationStatus::Pending,
            answers: new.answers,
            created_at: Utc::now(),
        };
        s.applications.insert(id, application.clone());
        drop(s);
        self.persist();
        Ok(application)
    }

    async fn get_application(&self, id: Id) -> RepoResult<Application> {
        let s = self.state.read().unwrap();
        s.applications.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_applications_for_idea(&self, idea_id: Id) -> RepoResult<Vec<Application>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .applications
            .values()
            .filter(|a| a.idea_id == idea_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(v)
    }

    async fn list_applications_by_applicant(&self, applicant_id: Id) -> RepoResult<Vec<Application>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .applications
            .values()
            .filter(|a| a.applicant_id == applicant_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(v)
    }

    async fn set_application_status(&self, id: Id, status: ApplicationStatus) -> RepoResult<Application> {
        let mut s = self.state.write().unwrap();
        let application = s.applications.get_mut(&id).ok_or(RepoError::NotFound)?;
        application.status = status;
        let updated = application.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }
}

#[async_trait]
impl ChatRepo for InMemRepo {
    async fn list_conversations(&self, user_id: Id) -> RepoResult<Vec<Conversation>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .conversations
            .values()
            .filter(|c| c.user_ids.contains(&user_id))
            .cloned()
            .collect();
        v.sort_by(|a, b| {
            let a_at = a.last_message.as_ref().map(|m| m.sent_at).unwrap_or(a.created_at);
            let b_at = b.last_message.as_ref().map(|m| m.sent_at).unwrap_or(b.created_at);
            b_at.cmp(&a_at).then(b.id.cmp(&a.id))
        });
        Ok(v)
    }

    async fn find_direct_conversation(&self, a: Id, b: Id) -> RepoResult<Option<Conversation>> {
        let s = self.state.read().unwrap();
        Ok(s.conversations
            .values()
            .find(|c| !c.is_team && c.user_ids.len() == 2 && c.user_ids.contains(&a) && c.user_ids.contains(&b))
            .cloned())
    }

    async fn create_conversation(&self, new: NewConversation) -> RepoResult<Conversation> {
        let mut s = self.state.write().unwrap();
        if new.user_ids.iter().any(|id| !s.users.contains_key(id)) {
            return Err(RepoError::NotFound);
        }
        let id = Self::next_id(&mut s);
        let conversation = Conversation {
            id,
            is_team: new.is_team,
            name: new.name,
            user_ids: new.user_ids,
            last_message: None,
            created_at: Utc::now(),
        };
        s.conversations.insert(id, conversation.clone());
        drop(s);
        self.persist();
        Ok(conversation)
    }

    async fn get_conversation(&self, id: Id) -> RepoResult<Conversation> {
        let s = self.state.read().unwrap();
        s.conversations.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_message(&self, new: NewMessage) -> RepoResult<Message> {
        let mut s = self.state.write().unwrap();
        if !s.conversations.contains_key(&new.conversation_id) {
            return Err(RepoError::NotFound);
        }
        let id = Self::next_id(&mut s);
        let message = Message {
            id,
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            text: new.text,
            file_hash: new.file_hash,
            mime: new.mime,
            read_by: vec![new.sender_id],
            created_at: Utc::now(),
        };
        s.messages.insert(id, message.clone());
        if let Some(convo) = s.conversations.get_mut(&new.conversation_id) {
            convo.last_message = Some(LastMessage {
                sender_id: message.sender_id,
                preview: message.preview(),
                sent_at: message.created_at,
            });
        }
        drop(s);
        self.persist();
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Id) -> RepoResult<Vec<Message>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(v)
    }

    async fn mark_read(&self, conversation_id: Id, user_id: Id) -> RepoResult<usize> {
        let mut s = self.state.write().unwrap();
        if !s.conversations.contains_key(&conversation_id) {
            return Err(RepoError::NotFound);
        }
        let mut marked = 0;
        for message in s.messages.values_mut() {
            if message.conversation_id == conversation_id && !message.read_by.contains(&user_id) {
                message.read_by.push(user_id);
                marked += 1;
            }
        }
        drop(s);
        if marked > 0 {
            self.persist();
        }
        Ok(marked)
    }
}

#[async_trait]
impl NotificationRepo for InMemRepo {
    async fn create_notification(&self, new: NewNotification) -> RepoResult<Notification> {
        let mut s = self.state.write().unwrap();
        if !s.users.contains_key(&new.receiver_id) {
            return Err(RepoError::NotFound);
        }
        let id = Self::next_id(&mut s);
        let notification = Notification {
            id,
            receiver_id: new.receiver_id,
            sender_id: new.sender_id,
            kind: new.kind,
            group_key: new.group_key,
            is_read: false,
            created_at: Utc::now(),
        };
        s.notifications.insert(id, notification.clone());
        drop(s);
        self.persist();
        Ok(notification)
    }

    async fn list_notifications(&self, receiver_id: Id) -> RepoResult<Vec<Notification>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .notifications
            .values()
            .filter(|n| n.receiver_id == receiver_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(v)
    }

    async fn mark_notification_read(&self, id: Id, receiver_id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        let notification = s.notifications.get_mut(&id).ok_or(RepoError::NotFound)?;
        if notification.receiver_id != receiver_id {
            return Err(RepoError::NotFound);
        }
        notification.is_read = true;
        drop(s);
        self.persist();
        Ok(())
    }

    async fn mark_all_read(&self, receiver_id: Id) -> RepoResult<usize> {
        let mut s = self.state.write().unwrap();
        let mut marked = 0;
        for notification in s.notifications.values_mut() {
            if notification.receiver_id == receiver_id && !notification.is_read {
                notification.is_read = true;
                marked += 1;
            }
        }
        drop(s);
        if marked > 0 {
            self.persist();
        }
        Ok(marked)
    }
}
