#![cfg(feature = "inmem-store")]

use startives::models::*;
use startives::repo::inmem::InMemRepo;
use startives::repo::{
    ApplicationRepo, ChatRepo, IdeaRepo, NotificationRepo, RepoError, StartalkRepo, UserRepo,
};

/// Helper that returns a fresh, empty repository for every test run.
fn repo() -> InMemRepo {
    // isolate state: do **not** persist to the default file path
    std::env::set_var("STARTIVES_DATA_DIR", tempfile::tempdir().unwrap().path());
    InMemRepo::new()
}

async fn seed_user(r: &InMemRepo, name: &str, email: &str) -> User {
    r.create_user(NewUser {
        name: name.into(),
        email: email.into(),
        password_hash: "$argon2id$fake".into(),
    })
    .await
    .unwrap()
}

#[tokio::test]
#[serial_test::serial]
async fn duplicate_email_is_rejected() {
    let r = repo();
    seed_user(&r, "Ada", "ada@example.com").await;
    let err = r
        .create_user(NewUser {
            name: "Imposter".into(),
            email: "ada@example.com".into(),
            password_hash: "x".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
}

#[tokio::test]
#[serial_test::serial]
async fn profile_update_is_partial() {
    let r = repo();
    let u = seed_user(&r, "Ada", "ada@example.com").await;
    let updated = r
        .update_profile(
            u.id,
            UpdateProfile {
                headline: Some("CTO".into()),
                skills: Some(vec!["rust".into(), "ml".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Ada"); // untouched
    assert_eq!(updated.headline.as_deref(), Some("CTO"));
    assert_eq!(updated.skills, vec!["rust", "ml"]);
}

#[tokio::test]
#[serial_test::serial]
async fn connection_request_lifecycle() {
    let r = repo();
    let a = seed_user(&r, "A", "a@example.com").await;
    let b = seed_user(&r, "B", "b@example.com").await;

    r.send_connection_request(a.id, b.id).await.unwrap();
    let a2 = r.get_user(a.id).await.unwrap();
    let b2 = r.get_user(b.id).await.unwrap();
    assert_eq!(a2.sent_requests, vec![b.id]);
    assert_eq!(b2.connection_requests, vec![a.id]);

    // duplicate request blocked
    assert!(matches!(
        r.send_connection_request(a.id, b.id).await.unwrap_err(),
        RepoError::Conflict
    ));
    // reverse direction while pending also blocked
    assert!(matches!(
        r.send_connection_request(b.id, a.id).await.unwrap_err(),
        RepoError::Conflict
    ));
    // self request is invalid
    assert!(matches!(
        r.send_connection_request(a.id, a.id).await.unwrap_err(),
        RepoError::Invalid(_)
    ));

    // accept is symmetric and clears pending entries on both sides
    r.accept_connection_request(b.id, a.id).await.unwrap();
    let a3 = r.get_user(a.id).await.unwrap();
    let b3 = r.get_user(b.id).await.unwrap();
    assert_eq!(a3.connections, vec![b.id]);
    assert_eq!(b3.connections, vec![a.id]);
    assert!(a3.sent_requests.is_empty());
    assert!(b3.connection_requests.is_empty());

    // another request while connected is a conflict
    assert!(matches!(
        r.send_connection_request(a.id, b.id).await.unwrap_err(),
        RepoError::Conflict
    ));

    // sever it
    r.remove_connection(a.id, b.id).await.unwrap();
    assert!(r.get_user(a.id).await.unwrap().connections.is_empty());
    assert!(r.get_user(b.id).await.unwrap().connections.is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn reject_and_withdraw_clear_pending_state() {
    let r = repo();
    let a = seed_user(&r, "A", "a@example.com").await;
    let b = seed_user(&r, "B", "b@example.com").await;
    let c = seed_user(&r, "C", "c@example.com").await;

    r.send_connection_request(a.id, b.id).await.unwrap();
    r.reject_connection_request(b.id, a.id).await.unwrap();
    assert!(r.get_user(a.id).await.unwrap().sent_requests.is_empty());
    assert!(r.get_user(b.id).await.unwrap().connection_requests.is_empty());

    r.send_connection_request(a.id, c.id).await.unwrap();
    r.withdraw_connection_request(a.id, c.id).await.unwrap();
    assert!(r.get_user(a.id).await.unwrap().sent_requests.is_empty());
    assert!(r.get_user(c.id).await.unwrap().connection_requests.is_empty());

    // accepting something that is no longer pending fails
    assert!(matches!(
        r.accept_connection_request(c.id, a.id).await.unwrap_err(),
        RepoError::NotFound
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn idea_positions_get_sequential_ids() {
    let r = repo();
    let founder = seed_user(&r, "F", "f@example.com").await;
    let idea = r
        .create_idea(
            founder.id,
            NewIdea {
                title: "Robo bakery".into(),
                description: "bread as a service".into(),
                positions: vec![
                    NewPosition { title: "CTO".into(), description: "tech".into() },
                    NewPosition { title: "Baker".into(), description: "bread".into() },
                ],
            },
        )
        .await
        .unwrap();
    assert_eq!(idea.positions.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);

    // replacing positions reassigns ids from 1
    let updated = r
        .update_idea(
            idea.id,
            UpdateIdea {
                positions: Some(vec![NewPosition { title: "Designer".into(), description: "ui".into() }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.positions.len(), 1);
    assert_eq!(updated.positions[0].id, 1);
    assert_eq!(updated.title, "Robo bakery");
}

#[tokio::test]
#[serial_test::serial]
async fn deleting_idea_drops_its_applications() {
    let r = repo();
    let founder = seed_user(&r, "F", "f@example.com").await;
    let applicant = seed_user(&r, "A", "a@example.com").await;
    let idea = r
        .create_idea(
            founder.id,
            NewIdea {
                title: "T".into(),
                description: "D".into(),
                positions: vec![NewPosition { title: "CTO".into(), description: "tech".into() }],
            },
        )
        .await
        .unwrap();
    r.create_application(NewApplication {
        idea_id: idea.id,
        position_id: 1,
        applicant_id: applicant.id,
        answers: vec!["hi".into()],
    })
    .await
    .unwrap();

    r.delete_idea(idea.id).await.unwrap();
    assert!(matches!(r.get_idea(idea.id).await.unwrap_err(), RepoError::NotFound));
    assert!(r
        .list_applications_by_applicant(applicant.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn duplicate_application_is_rejected() {
    let r = repo();
    let founder = seed_user(&r, "F", "f@example.com").await;
    let applicant = seed_user(&r, "A", "a@example.com").await;
    let idea = r
        .create_idea(
            founder.id,
            NewIdea {
                title: "T".into(),
                description: "D".into(),
                positions: vec![NewPosition { title: "CTO".into(), description: "tech".into() }],
            },
        )
        .await
        .unwrap();
    let new = NewApplication {
        idea_id: idea.id,
        position_id: 1,
        applicant_id: applicant.id,
        answers: vec![],
    };
    r.create_application(new.clone()).await.unwrap();
    assert!(matches!(
        r.create_application(new).await.unwrap_err(),
        RepoError::Conflict
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn reaction_replacement_persists_both_maps() {
    let r = repo();
    let author = seed_user(&r, "A", "a@example.com").await;
    let talk = r
        .create_startalk(NewStartalk { author_id: author.id, content: "demo day!".into() })
        .await
        .unwrap();

    let mut working = talk.clone();
    working.apply_reaction(99, "🔥");
    let stored = r
        .replace_reactions(talk.id, working.reactions.clone(), working.user_reactions.clone())
        .await
        .unwrap();
    assert_eq!(stored.reactions.get("🔥"), Some(&1));
    assert_eq!(stored.user_reactions.get("99").map(String::as_str), Some("🔥"));

    // reload to prove it survived the write
    let reloaded = r.get_startalk(talk.id).await.unwrap();
    assert_eq!(reloaded.reactions, stored.reactions);
    assert_eq!(reloaded.user_reactions, stored.user_reactions);
}

#[tokio::test]
#[serial_test::serial]
async fn direct_conversations_are_found_per_pair() {
    let r = repo();
    let a = seed_user(&r, "A", "a@example.com").await;
    let b = seed_user(&r, "B", "b@example.com").await;
    let c = seed_user(&r, "C", "c@example.com").await;

    let convo = r
        .create_conversation(NewConversation {
            creator_id: a.id,
            user_ids: vec![a.id, b.id],
            is_team: false,
            name: None,
        })
        .await
        .unwrap();

    let found = r.find_direct_conversation(b.id, a.id).await.unwrap();
    assert_eq!(found.map(|f| f.id), Some(convo.id));
    assert!(r.find_direct_conversation(a.id, c.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial_test::serial]
async fn messages_update_snapshot_and_read_state() {
    let r = repo();
    let a = seed_user(&r, "A", "a@example.com").await;
    let b = seed_user(&r, "B", "b@example.com").await;
    let convo = r
        .create_conversation(NewConversation {
            creator_id: a.id,
            user_ids: vec![a.id, b.id],
            is_team: false,
            name: None,
        })
        .await
        .unwrap();

    let msg = r
        .create_message(NewMessage {
            conversation_id: convo.id,
            sender_id: a.id,
            text: Some("hello".into()),
            file_hash: None,
            mime: None,
        })
        .await
        .unwrap();
    assert_eq!(msg.read_by, vec![a.id]); // sender has read their own message

    let convo2 = r.get_conversation(convo.id).await.unwrap();
    let last = convo2.last_message.expect("snapshot set");
    assert_eq!(last.preview, "hello");
    assert_eq!(last.sender_id, a.id);

    assert_eq!(r.mark_read(convo.id, b.id).await.unwrap(), 1);
    // second call is a no-op
    assert_eq!(r.mark_read(convo.id, b.id).await.unwrap(), 0);
    let msgs = r.list_messages(convo.id).await.unwrap();
    assert!(msgs[0].read_by.contains(&b.id));
}

#[tokio::test]
#[serial_test::serial]
async fn notifications_filter_and_mark() {
    let r = repo();
    let a = seed_user(&r, "A", "a@example.com").await;
    let b = seed_user(&r, "B", "b@example.com").await;

    r.create_notification(NewNotification {
        receiver_id: a.id,
        sender_id: b.id,
        kind: NotificationKind::ConnectionRequest,
        group_key: format!("connection_request:{}", b.id),
    })
    .await
    .unwrap();
    r.create_notification(NewNotification {
        receiver_id: b.id,
        sender_id: a.id,
        kind: NotificationKind::NewMessage,
        group_key: "new_message:1".into(),
    })
    .await
    .unwrap();

    let for_a = r.list_notifications(a.id).await.unwrap();
    assert_eq!(for_a.len(), 1);
    assert!(!for_a[0].is_read);

    // b cannot mark a's notification
    assert!(matches!(
        r.mark_notification_read(for_a[0].id, b.id).await.unwrap_err(),
        RepoError::NotFound
    ));
    r.mark_notification_read(for_a[0].id, a.id).await.unwrap();
    assert!(r.list_notifications(a.id).await.unwrap()[0].is_read);

    assert_eq!(r.mark_all_read(b.id).await.unwrap(), 1);
    assert_eq!(r.mark_all_read(b.id).await.unwrap(), 0);
}
