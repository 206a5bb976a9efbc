use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Pool, Postgres};

use super::*;
use crate::models::*;

#[derive(Clone)]
pub struct PgRepo {
    pool: Pool<Postgres>,
}

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn internal(e: sqlx::Error) -> RepoError {
    RepoError::Internal(e.to_string())
}

/// Maps constraint violations onto the repo taxonomy: unique → Conflict,
/// foreign key → NotFound (the referenced row is gone).
fn map_write_err(e: sqlx::Error) -> RepoError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return RepoError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return RepoError::NotFound;
        }
    }
    internal(e)
}

fn positions_with_ids(positions: Vec<NewPosition>) -> Vec<Position> {
    positions
        .into_iter()
        .enumerate()
        .map(|(i, p)| Position { id: i as Id + 1, title: p.title, description: p.description })
        .collect()
}

#[derive(sqlx::FromRow)]
struct IdeaRow {
    id: Id,
    founder_id: Id,
    title: String,
    description: String,
    positions: Json<Vec<Position>>,
    created_at: DateTime<Utc>,
}

impl From<IdeaRow> for Idea {
    fn from(r: IdeaRow) -> Self {
        Idea {
            id: r.id,
            founder_id: r.founder_id,
            title: r.title,
            description: r.description,
            positions: r.positions.0,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StartalkRow {
    id: Id,
    author_id: Id,
    content: String,
    reactions: Json<BTreeMap<String, i64>>,
    user_reactions: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl From<StartalkRow> for Startalk {
    fn from(r: StartalkRow) -> Self {
        Startalk {
            id: r.id,
            author_id: r.author_id,
            content: r.content,
            reactions: r.reactions.0,
            user_reactions: r.user_reactions.0,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Id,
    idea_id: Id,
    position_id: Id,
    applicant_id: Id,
    status: String,
    answers: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = RepoError;
    fn try_from(r: ApplicationRow) -> Result<Self, RepoError> {
        let status = ApplicationStatus::parse(&r.status)
            .ok_or_else(|| RepoError::Internal(format!("unknown application status '{}'", r.status)))?;
        Ok(Application {
            id: r.id,
            idea_id: r.idea_id,
            position_id: r.position_id,
            applicant_id: r.applicant_id,
            status,
            answers: r.answers,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Id,
    is_team: bool,
    name: Option<String>,
    user_ids: Vec<Id>,
    last_message: Option<Json<LastMessage>>,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(r: ConversationRow) -> Self {
        Conversation {
            id: r.id,
            is_team: r.is_team,
            name: r.name,
            user_ids: r.user_ids,
            last_message: r.last_message.map(|j| j.0),
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Id,
    receiver_id: Id,
    sender_id: Id,
    kind: String,
    group_key: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = RepoError;
    fn try_from(r: NotificationRow) -> Result<Self, RepoError> {
        let kind = NotificationKind::parse(&r.kind)
            .ok_or_else(|| RepoError::Internal(format!("unknown notification kind '{}'", r.kind)))?;
        Ok(Notification {
            id: r.id,
            receiver_id: r.receiver_id,
            sender_id: r.sender_id,
            kind,
            group_key: r.group_key,
            is_read: r.is_read,
            created_at: r.created_at,
        })
    }
}

const USER_COLS: &str = "id, name, email, password_hash, headline, bio, skills, avatar_hash, \
                         connections, connection_requests, sent_requests, created_at";

#[async_trait]
impl UserRepo for PgRepo {
    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_err)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)
    }

    async fn get_users(&self, ids: &[Id]) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = ANY($1)");
        sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
    }

    async fn update_profile(&self, id: Id, upd: UpdateProfile) -> RepoResult<User> {
        let sql = format!(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               headline = COALESCE($3, headline), \
               bio = COALESCE($4, bio), \
               skills = COALESCE($5, skills), \
               avatar_hash = COALESCE($6, avatar_hash) \
             WHERE id = $1 RETURNING {USER_COLS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(upd.name)
            .bind(upd.headline)
            .bind(upd.bio)
            .bind(upd.skills)
            .bind(upd.avatar_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)
    }

    async fn send_connection_request(&self, from: Id, to: Id) -> RepoResult<()> {
        if from == to {
            return Err(RepoError::Invalid("cannot send a connection request to yourself".into()));
        }
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let sender = sqlx::query_as::<_, (Vec<Id>, Vec<Id>, Vec<Id>)>(
            "SELECT connections, sent_requests, connection_requests FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(from)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        let receiver_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(to)
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal)?;
        if receiver_exists.is_none() {
            return Err(RepoError::NotFound);
        }
        let (connections, sent, incoming) = sender;
        if connections.contains(&to) || sent.contains(&to) || incoming.contains(&to) {
            return Err(RepoError::Conflict);
        }
        sqlx::query("UPDATE users SET sent_requests = array_append(sent_requests, $2) WHERE id = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        sqlx::query("UPDATE users SET connection_requests = array_append(connection_requests, $2) WHERE id = $1")
            .bind(to)
            .bind(from)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(internal)
    }

    async fn accept_connection_request(&self, user: Id, from: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let pending = sqlx::query_as::<_, (Vec<Id>,)>(
            "SELECT connection_requests FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        if !pending.0.contains(&from) {
            return Err(RepoError::NotFound);
        }
        sqlx::query(
            "UPDATE users SET \
               connection_requests = array_remove(connection_requests, $2), \
               connections = array_append(array_remove(connections, $2), $2) \
             WHERE id = $1",
        )
        .bind(user)
        .bind(from)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
        sqlx::query(
            "UPDATE users SET \
               sent_requests = array_remove(sent_requests, $2), \
               connections = array_append(array_remove(connections, $2), $2) \
             WHERE id = $1",
        )
        .bind(from)
        .bind(user)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
        tx.commit().await.map_err(internal)
    }

    async fn reject_connection_request(&self, user: Id, from: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let pending = sqlx::query_as::<_, (Vec<Id>,)>(
            "SELECT connection_requests FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        if !pending.0.contains(&from) {
            return Err(RepoError::NotFound);
        }
        sqlx::query("UPDATE users SET connection_requests = array_remove(connection_requests, $2) WHERE id = $1")
            .bind(user)
            .bind(from)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        sqlx::query("UPDATE users SET sent_requests = array_remove(sent_requests, $2) WHERE id = $1")
            .bind(from)
            .bind(user)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(internal)
    }

    async fn withdraw_connection_request(&self, from: Id, to: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let sent = sqlx::query_as::<_, (Vec<Id>,)>(
            "SELECT sent_requests FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(from)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        if !sent.0.contains(&to) {
            return Err(RepoError::NotFound);
        }
        sqlx::query("UPDATE users SET sent_requests = array_remove(sent_requests, $2) WHERE id = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        sqlx::query("UPDATE users SET connection_requests = array_remove(connection_requests, $2) WHERE id = $1")
            .bind(to)
            .bind(from)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(internal)
    }

    async fn remove_connection(&self, a: Id, b: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let connections = sqlx::query_as::<_, (Vec<Id>,)>(
            "SELECT connections FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(a)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        if !connections.0.contains(&b) {
            return Err(RepoError::NotFound);
        }
        sqlx::query("UPDATE users SET connections = array_remove(connections, $2) WHERE id = $1")
            .bind(a)
            .bind(b)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        sqlx::query("UPDATE users SET connections = array_remove(connections, $2) WHERE id = $1")
            .bind(b)
            .bind(a)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(internal)
    }
}

#[async_trait]
impl IdeaRepo for PgRepo {
    async fn list_ideas(&self) -> RepoResult<Vec<Idea>> {
        let rows = sqlx::query_as::<_, IdeaRow>(
            "SELECT id, founder_id, title, description, positions, created_at \
             FROM ideas ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows.into_iter().map(Idea::from).collect())
    }

    async fn create_idea(&self, founder_id: Id, new: NewIdea) -> RepoResult<Idea> {
        let positions = positions_with_ids(new.positions);
        let row = sqlx::query_as::<_, IdeaRow>(
            "INSERT INTO ideas (founder_id, title, description, positions) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, founder_id, title, description, positions, created_at",
        )
        .bind(founder_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(Json(positions))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(row.into())
    }

    async fn get_idea(&self, id: Id) -> RepoResult<Idea> {
        let row = sqlx::query_as::<_, IdeaRow>(
            "SELECT id, founder_id, title, description, positions, created_at FROM ideas WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn update_idea(&self, id: Id, upd: UpdateIdea) -> RepoResult<Idea> {
        let positions = upd.positions.map(positions_with_ids);
        let row = sqlx::query_as::<_, IdeaRow>(
            "UPDATE ideas SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               positions = COALESCE($4, positions) \
             WHERE id = $1 \
             RETURNING id, founder_id, title, description, positions, created_at",
        )
        .bind(id)
        .bind(upd.title)
        .bind(upd.description)
        .bind(positions.map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_idea(&self, id: Id) -> RepoResult<()> {
        // applications go with it via ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM ideas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

const STARTALK_COLS: &str = "id, author_id, content, reactions, user_reactions, created_at";

#[async_trait]
impl StartalkRepo for PgRepo {
    async fn list_startalks(&self) -> RepoResult<Vec<Startalk>> {
        let sql = format!("SELECT {STARTALK_COLS} FROM startalks ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, StartalkRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(Startalk::from).collect())
    }

    async fn create_startalk(&self, new: NewStartalk) -> RepoResult<Startalk> {
        let sql = format!(
            "INSERT INTO startalks (author_id, content) VALUES ($1, $2) RETURNING {STARTALK_COLS}"
        );
        let row = sqlx::query_as::<_, StartalkRow>(&sql)
            .bind(new.author_id)
            .bind(&new.content)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_err)?;
        Ok(row.into())
    }

    async fn get_startalk(&self, id: Id) -> RepoResult<Startalk> {
        let sql = format!("SELECT {STARTALK_COLS} FROM startalks WHERE id = $1");
        let row = sqlx::query_as::<_, StartalkRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn replace_reactions(
        &self,
        id: Id,
        reactions: BTreeMap<String, i64>,
        user_reactions: BTreeMap<String, String>,
    ) -> RepoResult<Startalk> {
        let sql = format!(
            "UPDATE startalks SET reactions = $2, user_reactions = $3 WHERE id = $1 RETURNING {STARTALK_COLS}"
        );
        let row = sqlx::query_as::<_, StartalkRow>(&sql)
            .bind(id)
            .bind(Json(reactions))
            .bind(Json(user_reactions))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_startalk(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM startalks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

const APPLICATION_COLS: &str = "id, idea_id, position_id, applicant_id, status, answers, created_at";

#[async_trait]
impl ApplicationRepo for PgRepo {
    async fn create_application(&self, new: NewApplication) -> RepoResult<Application> {
        let sql = format!(
            "INSERT INTO applications (idea_id, position_id, applicant_id, status, answers) \
             VALUES ($1, $2, $3, 'pending', $4) RETURNING {APPLICATION_COLS}"
        );
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(new.idea_id)
            .bind(new.position_id)
            .bind(new.applicant_id)
            .bind(&new.answers)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_err)?;
        row.try_into()
    }

    async fn get_application(&self, id: Id) -> RepoResult<Application> {
        let sql = format!("SELECT {APPLICATION_COLS} FROM applications WHERE id = $1");
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)?;
        row.try_into()
    }

    async fn list_applications_for_idea(&self, idea_id: Id) -> RepoResult<Vec<Application>> {
        let sql = format!(
            "SELECT {APPLICATION_COLS} FROM applications WHERE idea_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(idea_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn list_applications_by_applicant(&self, applicant_id: Id) -> RepoResult<Vec<Application>> {
        let sql = format!(
            "SELECT {APPLICATION_COLS} FROM applications WHERE applicant_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(applicant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn set_application_status(&self, id: Id, status: ApplicationStatus) -> RepoResult<Application> {
        let sql = format!(
            "UPDATE applications SET status = $2 WHERE id = $1 RETURNING {APPLICATION_COLS}"
        );
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)?;
        row.try_into()
    }
}

const CONVERSATION_COLS: &str = "id, is_team, name, user_ids, last_message, created_at";
const MESSAGE_COLS: &str = "id, conversation_id, sender_id, text, file_hash, mime, read_by, created_at";

#[async_trait]
impl ChatRepo for PgRepo {
    async fn list_conversations(&self, user_id: Id) -> RepoResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLS} FROM conversations WHERE user_ids @> ARRAY[$1]::bigint[]"
        );
        let rows = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        let mut v: Vec<Conversation> = rows.into_iter().map(Conversation::from).collect();
        v.sort_by(|a, b| {
            let a_at = a.last_message.as_ref().map(|m| m.sent_at).unwrap_or(a.created_at);
            let b_at = b.last_message.as_ref().map(|m| m.sent_at).unwrap_or(b.created_at);
            b_at.cmp(&a_at).then(b.id.cmp(&a.id))
        });
        Ok(v)
    }

    async fn find_direct_conversation(&self, a: Id, b: Id) -> RepoResult<Option<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLS} FROM conversations \
             WHERE is_team = FALSE \
               AND array_length(user_ids, 1) = 2 \
               AND user_ids @> ARRAY[$1, $2]::bigint[] \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.map(Conversation::from))
    }

    async fn create_conversation(&self, new: NewConversation) -> RepoResult<Conversation> {
        let known = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM users WHERE id = ANY($1)")
            .bind(&new.user_ids)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        if known as usize != new.user_ids.len() {
            return Err(RepoError::NotFound);
        }
        let sql = format!(
            "INSERT INTO conversations (is_team, name, user_ids) VALUES ($1, $2, $3) RETURNING {CONVERSATION_COLS}"
        );
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(new.is_team)
            .bind(&new.name)
            .bind(&new.user_ids)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_err)?;
        Ok(row.into())
    }

    async fn get_conversation(&self, id: Id) -> RepoResult<Conversation> {
        let sql = format!("SELECT {CONVERSATION_COLS} FROM conversations WHERE id = $1");
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn create_message(&self, new: NewMessage) -> RepoResult<Message> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let sql = format!(
            "INSERT INTO messages (conversation_id, sender_id, text, file_hash, mime, read_by) \
             VALUES ($1, $2, $3, $4, $5, ARRAY[$2]::bigint[]) RETURNING {MESSAGE_COLS}"
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(new.conversation_id)
            .bind(new.sender_id)
            .bind(&new.text)
            .bind(&new.file_hash)
            .bind(&new.mime)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_err)?;
        let snapshot = LastMessage {
            sender_id: message.sender_id,
            preview: message.preview(),
            sent_at: message.created_at,
        };
        sqlx::query("UPDATE conversations SET last_message = $2 WHERE id = $1")
            .bind(new.conversation_id)
            .bind(Json(snapshot))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(internal)?;
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Id) -> RepoResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLS} FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
    }

    async fn mark_read(&self, conversation_id: Id, user_id: Id) -> RepoResult<usize> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        if exists.is_none() {
            return Err(RepoError::NotFound);
        }
        let res = sqlx::query(
            "UPDATE messages SET read_by = array_append(read_by, $2) \
             WHERE conversation_id = $1 AND NOT (read_by @> ARRAY[$2]::bigint[])",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(res.rows_affected() as usize)
    }
}

const NOTIFICATION_COLS: &str = "id, receiver_id, sender_id, kind, group_key, is_read, created_at";

#[async_trait]
impl NotificationRepo for PgRepo {
    async fn create_notification(&self, new: NewNotification) -> RepoResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications (receiver_id, sender_id, kind, group_key) \
             VALUES ($1, $2, $3, $4) RETURNING {NOTIFICATION_COLS}"
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(new.receiver_id)
            .bind(new.sender_id)
            .bind(new.kind.as_str())
            .bind(&new.group_key)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_err)?;
        row.try_into()
    }

    async fn list_notifications(&self, receiver_id: Id) -> RepoResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLS} FROM notifications WHERE receiver_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(receiver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_notification_read(&self, id: Id, receiver_id: Id) -> RepoResult<()> {
        let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND receiver_id = $2")
            .bind(id)
            .bind(receiver_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn mark_all_read(&self, receiver_id: Id) -> RepoResult<usize> {
        let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE receiver_id = $1 AND is_read = FALSE")
            .bind(receiver_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(res.rows_affected() as usize)
    }
}
