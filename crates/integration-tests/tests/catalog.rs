//! Users, forums, threads and service status.

use chrono::{TimeZone, Utc};
use domains::{
    DomainError, Entity, Insertion, NewForum, NewThread, ThreadListing, ThreadRef, ThreadUpdate,
    UserListing, UserProfile, UserUpdate,
};
use integration_tests::{reply, seeded, services, user, FORUM};
use services::Services;

fn profile(email: &str) -> UserProfile {
    UserProfile {
        fullname: "Someone".into(),
        email: email.into(),
        about: "about".into(),
    }
}

fn new_thread(slug: Option<&str>, created_secs: i64) -> NewThread {
    NewThread {
        title: "title".into(),
        author: "bob".into(),
        message: "message".into(),
        slug: slug.map(str::to_owned),
        created: Some(Utc.timestamp_opt(created_secs, 0).unwrap()),
        forum: String::new(),
    }
}

async fn thread_ids(services: &Services, listing: ThreadListing) -> Vec<i64> {
    services
        .forums
        .threads(FORUM, &listing)
        .await
        .unwrap()
        .iter()
        .map(|thread| thread.id)
        .collect()
}

#[tokio::test]
async fn user_clash_returns_every_conflicting_user() {
    let services = services();
    user(&services, "alice").await;
    user(&services, "bob").await;

    let clash = services
        .users
        .create("ALICE", profile("bob@example.org"))
        .await
        .unwrap();
    let Insertion::Existing(users) = clash else {
        panic!("expected a clash, got {clash:?}");
    };
    let mut nicknames: Vec<_> = users.into_iter().map(|u| u.nickname).collect();
    nicknames.sort();
    assert_eq!(nicknames, vec!["alice", "bob"]);
}

#[tokio::test]
async fn user_update_keeps_absent_fields_and_guards_email() {
    let services = services();
    user(&services, "alice").await;
    user(&services, "bob").await;

    let updated = services
        .users
        .update(
            "Alice",
            &UserUpdate {
                about: Some("rustacean".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.about, "rustacean");
    assert_eq!(updated.email, "alice@example.org");

    let err = services
        .users
        .update(
            "alice",
            &UserUpdate {
                email: Some("BOB@example.org".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let err = services
        .users
        .update("carol", &UserUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found(Entity::User));
}

#[tokio::test]
async fn forum_slug_clash_returns_the_existing_forum() {
    let (services, _) = seeded().await;
    let clash = services
        .forums
        .create(NewForum {
            slug: "RUST".into(),
            title: "Another".into(),
            user: "bob".into(),
        })
        .await
        .unwrap();
    match clash {
        Insertion::Existing(forum) => {
            assert_eq!(forum.slug, FORUM);
            assert_eq!(forum.user, "alice");
        }
        other => panic!("expected the existing forum, got {other:?}"),
    }

    let err = services
        .forums
        .create(NewForum {
            slug: "go".into(),
            title: "Go".into(),
            user: "nobody".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found(Entity::User));
}

#[tokio::test]
async fn thread_creation_counts_and_clashes() {
    let (services, _) = seeded().await;
    services
        .forums
        .create_thread(FORUM, new_thread(Some("second"), 10))
        .await
        .unwrap();

    let clash = services
        .forums
        .create_thread(FORUM, new_thread(Some("SECOND"), 20))
        .await
        .unwrap();
    assert!(matches!(clash, Insertion::Existing(ref thread) if thread.id == 2));

    assert_eq!(services.forums.details(FORUM).await.unwrap().threads, 2);

    let err = services
        .forums
        .create_thread("missing", new_thread(None, 0))
        .await
        .unwrap_err();
    assert!(err.is_not_found(Entity::Forum));
}

#[tokio::test]
async fn forum_threads_since_is_inclusive() {
    let services = services();
    user(&services, "bob").await;
    services
        .forums
        .create(NewForum {
            slug: FORUM.into(),
            title: "Rust".into(),
            user: "bob".into(),
        })
        .await
        .unwrap();
    for created in [300, 100, 200] {
        services
            .forums
            .create_thread(FORUM, new_thread(None, created))
            .await
            .unwrap();
    }

    assert_eq!(thread_ids(&services, ThreadListing::default()).await, vec![2, 3, 1]);

    let since = Some(Utc.timestamp_opt(200, 0).unwrap());
    let asc = ThreadListing {
        since,
        ..Default::default()
    };
    assert_eq!(thread_ids(&services, asc).await, vec![3, 1]);

    let desc = ThreadListing {
        since,
        desc: true,
        limit: Some(1),
    };
    assert_eq!(thread_ids(&services, desc).await, vec![3]);
}

#[tokio::test]
async fn forum_members_are_ordered_case_insensitively() {
    let (services, thread) = seeded().await;
    user(&services, "Carol").await;
    services
        .posts
        .create_posts(
            &ThreadRef::from(thread.id),
            vec![
                integration_tests::new_post("carol", 0),
                integration_tests::new_post("bob", 0),
            ],
        )
        .await
        .unwrap();

    let all = services
        .forums
        .members(FORUM, &UserListing::default())
        .await
        .unwrap();
    let nicknames: Vec<_> = all.iter().map(|u| u.nickname.as_str()).collect();
    assert_eq!(nicknames, vec!["alice", "bob", "Carol"]);

    let after_bob = services
        .forums
        .members(
            FORUM,
            &UserListing {
                since: Some("BOB".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(after_bob.len(), 1);
    assert_eq!(after_bob[0].nickname, "Carol");

    let desc = services
        .forums
        .members(
            FORUM,
            &UserListing {
                desc: true,
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let nicknames: Vec<_> = desc.iter().map(|u| u.nickname.as_str()).collect();
    assert_eq!(nicknames, vec!["Carol", "bob"]);
}

#[tokio::test]
async fn thread_update_and_lookup_by_slug_or_id() {
    let (services, thread) = seeded().await;

    let updated = services
        .threads
        .update(
            &ThreadRef::from("TALK"),
            &ThreadUpdate {
                title: Some("renamed".into()),
                message: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.message, thread.message);

    let by_id = services
        .threads
        .details(&ThreadRef::from(thread.id))
        .await
        .unwrap();
    assert_eq!(by_id, updated);

    let err = services
        .threads
        .details(&ThreadRef::from("42"))
        .await
        .unwrap_err();
    assert!(err.is_not_found(Entity::Thread));
}

#[tokio::test]
async fn status_counts_rows_and_clear_resets_them() {
    let (services, thread) = seeded().await;
    reply(&services, &thread, &[0, 0]).await;
    reply(&services, &thread, &[1]).await;

    let status = services.status.status().await.unwrap();
    assert_eq!(
        (status.user, status.forum, status.thread, status.post),
        (2, 1, 1, 3)
    );

    services.status.clear().await.unwrap();
    assert_eq!(services.status.status().await.unwrap(), Default::default());
}
