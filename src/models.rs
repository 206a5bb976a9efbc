use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Full user record as persisted. Never serialized to API clients directly;
/// handlers map it to [`UserProfile`] or [`PublicUser`] first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub avatar_hash: Option<String>,
    pub connections: Vec<Id>,
    pub connection_requests: Vec<Id>, // incoming, pending
    pub sent_requests: Vec<Id>,       // outgoing, pending
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub avatar_hash: Option<String>,
}

/// The owner's view of their account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub avatar_hash: Option<String>,
    pub connections: Vec<Id>,
    pub connection_requests: Vec<Id>,
    pub sent_requests: Vec<Id>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            headline: u.headline,
            bio: u.bio,
            skills: u.skills,
            avatar_hash: u.avatar_hash,
            connections: u.connections,
            connection_requests: u.connection_requests,
            sent_requests: u.sent_requests,
            created_at: u.created_at,
        }
    }
}

/// What other users see.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicUser {
    pub id: Id,
    pub name: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub avatar_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            headline: u.headline,
            bio: u.bio,
            skills: u.skills,
            avatar_hash: u.avatar_hash,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub id: Id, // assigned 1..n within the owning idea
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPosition {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Idea {
    pub id: Id,
    pub founder_id: Id,
    pub title: String,
    pub description: String,
    pub positions: Vec<Position>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewIdea {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub positions: Vec<NewPosition>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateIdea {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Replaces the embedded set wholesale; position ids are reassigned 1..n.
    pub positions: Option<Vec<NewPosition>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Application {
    pub id: Id,
    pub idea_id: Id,
    pub position_id: Id,
    pub applicant_id: Id,
    pub status: ApplicationStatus,
    pub answers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub idea_id: Id,
    pub position_id: Id,
    pub applicant_id: Id,
    pub answers: Vec<String>,
}

/// Short status-update post with denormalized reaction state: `reactions`
/// counts per emoji, `user_reactions` records each user's current emoji
/// (keyed by the user id rendered as a string, matching the wire shape).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Startalk {
    pub id: Id,
    pub author_id: Id,
    pub content: String,
    pub reactions: BTreeMap<String, i64>,
    pub user_reactions: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStartalk {
    pub author_id: Id,
    pub content: String,
}

/// What a reaction submission did to the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Added,
    Switched,
    Removed,
}

impl Startalk {
    /// Computes the next `(reactions, user_reactions)` pair in place from the
    /// user's previous emoji (if any) and the submitted one. Resubmitting the
    /// current emoji removes it; a different emoji moves the count. Zeroed
    /// counters are dropped so neither map accumulates stale keys.
    pub fn apply_reaction(&mut self, user_id: Id, emoji: &str) -> ReactionOutcome {
        let key = user_id.to_string();
        let previous = self.user_reactions.get(&key).cloned();
        match previous {
            Some(prev) if prev == emoji => {
                Self::decrement(&mut self.reactions, &prev);
                self.user_reactions.remove(&key);
                ReactionOutcome::Removed
            }
            Some(prev) => {
                Self::decrement(&mut self.reactions, &prev);
                *self.reactions.entry(emoji.to_string()).or_insert(0) += 1;
                self.user_reactions.insert(key, emoji.to_string());
                ReactionOutcome::Switched
            }
            None => {
                *self.reactions.entry(emoji.to_string()).or_insert(0) += 1;
                self.user_reactions.insert(key, emoji.to_string());
                ReactionOutcome::Added
            }
        }
    }

    fn decrement(reactions: &mut BTreeMap<String, i64>, emoji: &str) {
        if let Some(count) = reactions.get_mut(emoji) {
            *count -= 1;
            if *count <= 0 {
                reactions.remove(emoji);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LastMessage {
    pub sender_id: Id,
    pub preview: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Id,
    pub is_team: bool,
    pub name: Option<String>, // team conversations only
    pub user_ids: Vec<Id>,
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub creator_id: Id,
    pub user_ids: Vec<Id>,
    pub is_team: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Message {
    pub id: Id,
    pub conversation_id: Id,
    pub sender_id: Id,
    pub text: Option<String>,
    pub file_hash: Option<String>,
    pub mime: Option<String>,
    pub read_by: Vec<Id>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Snapshot line shown in conversation lists.
    pub fn preview(&self) -> String {
        match &self.text {
            Some(t) if t.chars().count() > 80 => {
                let mut p: String = t.chars().take(79).collect();
                p.push('…');
                p
            }
            Some(t) => t.clone(),
            None => "[file]".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Id,
    pub sender_id: Id,
    pub text: Option<String>,
    pub file_hash: Option<String>,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ConnectionRequest,
    ConnectionAccepted,
    ApplicationReceived,
    ApplicationStatus,
    StartalkReaction,
    NewMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ConnectionRequest => "connection_request",
            NotificationKind::ConnectionAccepted => "connection_accepted",
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::ApplicationStatus => "application_status",
            NotificationKind::StartalkReaction => "startalk_reaction",
            NotificationKind::NewMessage => "new_message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connection_request" => Some(NotificationKind::ConnectionRequest),
            "connection_accepted" => Some(NotificationKind::ConnectionAccepted),
            "application_received" => Some(NotificationKind::ApplicationReceived),
            "application_status" => Some(NotificationKind::ApplicationStatus),
            "startalk_reaction" => Some(NotificationKind::StartalkReaction),
            "new_message" => Some(NotificationKind::NewMessage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Id,
    pub receiver_id: Id,
    pub sender_id: Id,
    pub kind: NotificationKind,
    /// Groups related entries in the notification center, e.g.
    /// `startalk_reaction:42`.
    pub group_key: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub receiver_id: Id,
    pub sender_id: Id,
    pub kind: NotificationKind,
    pub group_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Startalk {
        Startalk {
            id: 1,
            author_id: 7,
            content: "shipping".into(),
            reactions: BTreeMap::new(),
            user_reactions: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn consistent(s: &Startalk) -> bool {
        let mut tally: BTreeMap<&str, i64> = BTreeMap::new();
        for emoji in s.user_reactions.values() {
            *tally.entry(emoji.as_str()).or_insert(0) += 1;
        }
        tally.len() == s.reactions.len()
            && tally.iter().all(|(e, n)| s.reactions.get(*e) == Some(n))
    }

    #[test]
    fn first_reaction_adds() {
        let mut s = post();
        assert_eq!(s.apply_reaction(10, "🔥"), ReactionOutcome::Added);
        assert_eq!(s.reactions.get("🔥"), Some(&1));
        assert_eq!(s.user_reactions.get("10").map(String::as_str), Some("🔥"));
        assert!(consistent(&s));
    }

    #[test]
    fn resubmitting_same_emoji_removes() {
        let mut s = post();
        s.apply_reaction(10, "🔥");
        assert_eq!(s.apply_reaction(10, "🔥"), ReactionOutcome::Removed);
        assert!(s.reactions.is_empty());
        assert!(s.user_reactions.is_empty());
    }

    #[test]
    fn switching_emoji_moves_count_without_stale_entries() {
        let mut s = post();
        s.apply_reaction(10, "🔥");
        s.apply_reaction(11, "🔥");
        assert_eq!(s.apply_reaction(10, "💡"), ReactionOutcome::Switched);
        assert_eq!(s.reactions.get("🔥"), Some(&1));
        assert_eq!(s.reactions.get("💡"), Some(&1));
        assert_eq!(s.user_reactions.get("10").map(String::as_str), Some("💡"));
        assert!(consistent(&s));

        // last holder switches away: old key must disappear entirely
        s.apply_reaction(11, "💡");
        assert!(s.reactions.get("🔥").is_none());
        assert_eq!(s.reactions.get("💡"), Some(&2));
        assert!(consistent(&s));
    }

    #[test]
    fn counts_never_go_negative() {
        let mut s = post();
        // user entry without a matching counter: decrement must not underflow
        s.user_reactions.insert("10".into(), "🔥".into());
        s.apply_reaction(10, "🔥");
        assert!(s.reactions.get("🔥").is_none());
    }

    #[test]
    fn message_preview_truncates_and_marks_files() {
        let long = "x".repeat(200);
        let m = Message {
            id: 1,
            conversation_id: 1,
            sender_id: 1,
            text: Some(long),
            file_hash: None,
            mime: None,
            read_by: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(m.preview().chars().count(), 80);
        let f = Message { text: None, file_hash: Some("ab".into()), ..m };
        assert_eq!(f.preview(), "[file]");
    }
}
