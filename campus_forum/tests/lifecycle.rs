mod common;

use campus_forum::{
    error::ForumError,
    lifecycle::{ContentUpdate, NewReply, Outcome, UpdatedContent},
    models::{ContentKind, ValidationStatus},
};
use common::helpers::{comment, engines, karma, new_article, new_thread, reply, seed_users, staff, student};
use futures::future::join_all;
use sqlx::PgPool;

async fn is_available(pool: &PgPool, table: &str, id: &str) -> bool {
    sqlx::query_scalar::<_, bool>(&format!("SELECT available FROM {} WHERE id = $1", table))
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn count_rows(pool: &PgPool, table: &str, content_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {} WHERE content_id = $1", table))
        .bind(content_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// --- Creation and deletion ---

#[sqlx::test]
async fn thread_lifecycle_restores_karma(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine
        .create_thread(&alice, new_thread("Midterm prep", "Who wants to study?"))
        .await
        .unwrap();
    assert_eq!(karma(&pool, "alice").await, 10);
    assert!(created.header_post.is_header);
    assert_eq!(created.header_post.title.as_deref(), Some("Midterm prep"));

    let post = engine
        .create_reply(&bob, &created.thread.id, reply("Count me in"))
        .await
        .unwrap();
    assert_eq!(karma(&pool, "bob").await, 5);

    let outcome = engine.delete_content(&alice, &created.thread.id).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);

    assert_eq!(karma(&pool, "alice").await, 0);
    assert_eq!(karma(&pool, "bob").await, 0);
    assert!(!is_available(&pool, "threads", &created.thread.id).await);
    assert!(!is_available(&pool, "posts", &created.header_post.id).await);
    assert!(!is_available(&pool, "posts", &post.id).await);
    assert_eq!(count_rows(&pool, "likes", &created.thread.id).await, 0);
}

#[sqlx::test]
async fn thread_delete_purges_engagement_of_every_post(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let (alice, bob, carol) = (student("alice"), student("bob"), student("carol"));

    let created = engine.create_thread(&alice, new_thread("Lab 3", "Stuck on part b")).await.unwrap();
    let thread_id = created.thread.id.clone();
    let bob_post = engine.create_reply(&bob, &thread_id, reply("Same here")).await.unwrap();
    let carol_post = engine.create_reply(&carol, &thread_id, reply("Check the errata")).await.unwrap();

    engine.like(&bob, &thread_id).await.unwrap();
    engine.like(&carol, &bob_post.id).await.unwrap();
    engine.like(&alice, &carol_post.id).await.unwrap();
    engine.favorite(&bob, &thread_id).await.unwrap();
    engine.favorite(&alice, &carol_post.id).await.unwrap();

    assert_eq!(karma(&pool, "alice").await, 11);
    assert_eq!(karma(&pool, "bob").await, 6);
    assert_eq!(karma(&pool, "carol").await, 6);

    engine.delete_content(&alice, &thread_id).await.unwrap();

    for id in [&thread_id, &bob_post.id, &carol_post.id, &created.header_post.id] {
        assert_eq!(count_rows(&pool, "likes", id).await, 0, "likes left on {}", id);
        assert_eq!(count_rows(&pool, "favorites", id).await, 0, "favorites left on {}", id);
    }
    assert!(!is_available(&pool, "posts", &bob_post.id).await);
    assert!(!is_available(&pool, "posts", &carol_post.id).await);

    // Creation awards are reversed; karma earned from likes is kept.
    assert_eq!(karma(&pool, "alice").await, 1);
    assert_eq!(karma(&pool, "bob").await, 1);
    assert_eq!(karma(&pool, "carol").await, 1);
}

#[sqlx::test]
async fn delete_is_idempotent(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    // Karma outside the deleted thread keeps the zero floor from hiding a
    // second reversal.
    let other = engine.create_thread(&alice, new_thread("Other", "Body")).await.unwrap();
    engine.create_reply(&bob, &other.thread.id, reply("Elsewhere")).await.unwrap();

    let created = engine.create_thread(&alice, new_thread("Topic", "Body")).await.unwrap();
    let post = engine.create_reply(&bob, &created.thread.id, reply("Reply")).await.unwrap();
    assert_eq!(karma(&pool, "alice").await, 20);
    assert_eq!(karma(&pool, "bob").await, 10);

    assert_eq!(engine.delete_content(&bob, &post.id).await.unwrap(), Outcome::Applied);
    assert_eq!(engine.delete_content(&bob, &post.id).await.unwrap(), Outcome::Unchanged);
    assert_eq!(karma(&pool, "bob").await, 5);

    // The cascade skips the reply that was already deleted.
    assert_eq!(engine.delete_content(&alice, &created.thread.id).await.unwrap(), Outcome::Applied);
    assert_eq!(karma(&pool, "bob").await, 5);
    assert_eq!(karma(&pool, "alice").await, 10);

    assert_eq!(engine.delete_content(&alice, &created.thread.id).await.unwrap(), Outcome::Unchanged);
    assert_eq!(karma(&pool, "alice").await, 10);
    assert_eq!(karma(&pool, "bob").await, 5);
}

#[sqlx::test]
async fn delete_of_unknown_or_malformed_id(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");

    assert!(matches!(
        engine.delete_content(&alice, "tdoesnotexist0000").await,
        Err(ForumError::NotFound { kind: "thread", .. })
    ));
    assert!(matches!(
        engine.delete_content(&alice, "pdoesnotexist0000").await,
        Err(ForumError::NotFound { kind: "post", .. })
    ));
    assert!(matches!(
        engine.delete_content(&alice, "zzz").await,
        Err(ForumError::Validation(_))
    ));
}

#[sqlx::test]
async fn students_cannot_delete_other_students_content(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let carol = student("carol");

    let created = engine.create_thread(&alice, new_thread("Mine", "Hands off")).await.unwrap();

    let err = engine.delete_content(&carol, &created.thread.id).await.unwrap_err();
    assert!(matches!(err, ForumError::Unauthorized { .. }));
    assert!(is_available(&pool, "threads", &created.thread.id).await);
    assert_eq!(karma(&pool, "alice").await, 10);

    // Staff may moderate anyone's content.
    let outcome = engine.delete_content(&staff("ta"), &created.thread.id).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(karma(&pool, "alice").await, 0);
}

#[sqlx::test]
async fn deleting_header_post_deletes_thread(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine.create_thread(&alice, new_thread("Header", "First")).await.unwrap();
    engine.create_reply(&bob, &created.thread.id, reply("Second")).await.unwrap();

    let outcome = engine.delete_content(&alice, &created.header_post.id).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert!(!is_available(&pool, "threads", &created.thread.id).await);
    assert_eq!(karma(&pool, "alice").await, 0);
    assert_eq!(karma(&pool, "bob").await, 0);
}

#[sqlx::test]
async fn replies_to_deleted_threads_are_rejected(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");

    let created = engine.create_thread(&alice, new_thread("Gone soon", "Body")).await.unwrap();
    engine.delete_content(&alice, &created.thread.id).await.unwrap();

    let err = engine
        .create_reply(&student("bob"), &created.thread.id, reply("Late"))
        .await
        .unwrap_err();
    assert!(matches!(err, ForumError::NotFound { kind: "thread", .. }));
    assert_eq!(karma(&pool, "bob").await, 0);
}

#[sqlx::test]
async fn reply_target_must_be_available_in_same_thread(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let first = engine.create_thread(&alice, new_thread("One", "Body")).await.unwrap();
    let second = engine.create_thread(&alice, new_thread("Two", "Body")).await.unwrap();

    let missing = NewReply {
        reply_to: Some("pmissing00000000".into()),
        ..reply("Hello?")
    };
    assert!(matches!(
        engine.create_reply(&bob, &first.thread.id, missing).await,
        Err(ForumError::Validation(_))
    ));

    let cross_thread = NewReply {
        reply_to: Some(second.header_post.id.clone()),
        ..reply("Wrong thread")
    };
    assert!(matches!(
        engine.create_reply(&bob, &first.thread.id, cross_thread).await,
        Err(ForumError::Validation(_))
    ));

    let valid = NewReply {
        reply_to: Some(first.header_post.id.clone()),
        ..reply("Answering the header")
    };
    let post = engine.create_reply(&bob, &first.thread.id, valid).await.unwrap();
    assert_eq!(post.reply_to.as_deref(), Some(first.header_post.id.as_str()));
    assert_eq!(karma(&pool, "bob").await, 5);
}

#[sqlx::test]
async fn karma_never_goes_negative(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");

    let created = engine.create_thread(&alice, new_thread("Floor", "Body")).await.unwrap();
    sqlx::query("UPDATE karma SET balance = 3 WHERE user_id = 'alice'")
        .execute(&pool)
        .await
        .unwrap();

    engine.delete_content(&alice, &created.thread.id).await.unwrap();
    assert_eq!(karma(&pool, "alice").await, 0);
}

#[sqlx::test]
async fn karma_is_conserved_across_mixed_operations(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let (alice, bob, carol) = (student("alice"), student("bob"), student("carol"));

    let t = engine.create_thread(&alice, new_thread("T", "Body")).await.unwrap();
    let p1 = engine.create_reply(&bob, &t.thread.id, reply("p1")).await.unwrap();
    engine.create_reply(&carol, &t.thread.id, reply("p2")).await.unwrap();
    let a = engine.create_article(&carol, new_article("A", "Article body")).await.unwrap();
    let c = engine.create_comment(&bob, &a.id, comment("Nice")).await.unwrap();
    engine.like(&alice, &a.id).await.unwrap();
    engine.like(&carol, &p1.id).await.unwrap();
    engine.unlike(&carol, &p1.id).await.unwrap();
    engine.delete_content(&bob, &c.id).await.unwrap();

    // alice 10; bob 5 + 2 - 2; carol 5 + 10 + 1
    assert_eq!(karma(&pool, "alice").await, 10);
    assert_eq!(karma(&pool, "bob").await, 5);
    assert_eq!(karma(&pool, "carol").await, 16);

    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(balance), 0)::BIGINT FROM karma")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 31);
}

// --- Articles and comments ---

#[sqlx::test]
async fn article_and_comment_lifecycle(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, queries) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let article = engine.create_article(&alice, new_article("Notes", "Week 1 notes")).await.unwrap();
    let c = engine.create_comment(&bob, &article.id, comment("Thanks!")).await.unwrap();
    assert_eq!(karma(&pool, "alice").await, 10);
    assert_eq!(karma(&pool, "bob").await, 2);

    let detail = queries.get_article(&article.id, "bob").await.unwrap();
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.article.num_replies, 1);

    assert_eq!(engine.delete_content(&bob, &c.id).await.unwrap(), Outcome::Applied);
    assert_eq!(karma(&pool, "bob").await, 0);

    assert_eq!(engine.delete_content(&alice, &article.id).await.unwrap(), Outcome::Applied);
    assert_eq!(karma(&pool, "alice").await, 0);
    assert!(matches!(
        queries.get_article(&article.id, "bob").await,
        Err(ForumError::NotFound { kind: "article", .. })
    ));
    assert!(matches!(
        engine.create_comment(&bob, &article.id, comment("Too late")).await,
        Err(ForumError::NotFound { .. })
    ));
}

#[sqlx::test]
async fn comments_of_deleted_articles_reject_engagement_and_edits(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let (alice, bob, carol) = (student("alice"), student("bob"), student("carol"));

    let article = engine.create_article(&alice, new_article("Notes", "Body")).await.unwrap();
    let c = engine.create_comment(&bob, &article.id, comment("Useful")).await.unwrap();
    engine.like(&carol, &c.id).await.unwrap();
    assert_eq!(karma(&pool, "bob").await, 3);

    engine.delete_content(&alice, &article.id).await.unwrap();

    assert!(matches!(
        engine.like(&alice, &c.id).await,
        Err(ForumError::NotFound { kind: "comment", .. })
    ));
    assert!(matches!(
        engine.favorite(&alice, &c.id).await,
        Err(ForumError::NotFound { kind: "comment", .. })
    ));
    let edit = ContentUpdate {
        title: None,
        body: "Edited later".into(),
    };
    assert!(matches!(
        engine.update_content(&bob, &c.id, edit).await,
        Err(ForumError::NotFound { kind: "comment", .. })
    ));
    assert_eq!(karma(&pool, "bob").await, 3);
}

// --- Edits ---

#[sqlx::test]
async fn editing_thread_updates_header_post(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, queries) = engines(&pool);
    let alice = student("alice");

    let created = engine.create_thread(&alice, new_thread("Old title", "Old body")).await.unwrap();
    let updated = engine
        .update_content(
            &alice,
            &created.thread.id,
            ContentUpdate {
                title: Some("New title".into()),
                body: "New body".into(),
            },
        )
        .await
        .unwrap();
    match updated {
        UpdatedContent::Thread(thread) => {
            assert_eq!(thread.title, "New title");
            assert_eq!(thread.preview, "New body");
        }
        other => panic!("unexpected update result {:?}", other),
    }

    let detail = queries.get_thread(&created.thread.id, "alice").await.unwrap();
    let header = detail.posts.iter().find(|p| p.is_header).unwrap();
    assert_eq!(header.title.as_deref(), Some("New title"));
    assert_eq!(header.body, "New body");

    // Editing the header post flows back into the thread.
    engine
        .update_content(
            &alice,
            &created.header_post.id,
            ContentUpdate {
                title: Some("Header edit".into()),
                body: "Header body".into(),
            },
        )
        .await
        .unwrap();
    let detail = queries.get_thread(&created.thread.id, "alice").await.unwrap();
    assert_eq!(detail.thread.title, "Header edit");
    assert_eq!(detail.thread.preview, "Header body");
}

#[sqlx::test]
async fn edits_require_ownership_and_valid_input(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");

    let article = engine.create_article(&alice, new_article("Mine", "Body")).await.unwrap();
    let update = ContentUpdate {
        title: None,
        body: "Hijacked".into(),
    };
    assert!(matches!(
        engine.update_content(&student("carol"), &article.id, update.clone()).await,
        Err(ForumError::Unauthorized { .. })
    ));

    let empty = ContentUpdate {
        title: None,
        body: "   ".into(),
    };
    assert!(matches!(
        engine.update_content(&alice, &article.id, empty).await,
        Err(ForumError::Validation(_))
    ));

    match engine.update_content(&staff("ta"), &article.id, update).await.unwrap() {
        UpdatedContent::Article(a) => {
            assert_eq!(a.body, "Hijacked");
            assert_eq!(a.title, "Mine");
        }
        other => panic!("unexpected update result {:?}", other),
    }
}

// --- Engagement ---

#[sqlx::test]
async fn duplicate_like_awards_karma_once(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine.create_thread(&alice, new_thread("Like me", "Please")).await.unwrap();
    assert_eq!(engine.like(&bob, &created.thread.id).await.unwrap(), Outcome::Applied);
    assert_eq!(engine.like(&bob, &created.thread.id).await.unwrap(), Outcome::Unchanged);

    assert_eq!(count_rows(&pool, "likes", &created.thread.id).await, 1);
    assert_eq!(karma(&pool, "alice").await, 11);
}

#[sqlx::test]
async fn concurrent_likes_insert_one_row(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine.create_thread(&alice, new_thread("Race", "Go")).await.unwrap();
    let thread_id = created.thread.id.clone();

    let attempts = (0..8).map(|_| {
        let engine = engine.clone();
        let bob = bob.clone();
        let thread_id = thread_id.clone();
        tokio::spawn(async move { engine.like(&bob, &thread_id).await })
    });
    let outcomes: Vec<Outcome> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Applied).count(), 1);
    assert_eq!(count_rows(&pool, "likes", &thread_id).await, 1);
    assert_eq!(karma(&pool, "alice").await, 11);
}

#[sqlx::test]
async fn unlike_reverses_like_karma(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let article = engine.create_article(&alice, new_article("Guide", "Body")).await.unwrap();
    engine.like(&bob, &article.id).await.unwrap();
    assert_eq!(karma(&pool, "alice").await, 11);

    assert_eq!(engine.unlike(&bob, &article.id).await.unwrap(), Outcome::Applied);
    assert_eq!(engine.unlike(&bob, &article.id).await.unwrap(), Outcome::Unchanged);
    assert_eq!(karma(&pool, "alice").await, 10);
}

#[sqlx::test]
async fn self_likes_earn_nothing(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");

    let created = engine.create_thread(&alice, new_thread("Me", "Myself")).await.unwrap();
    assert_eq!(engine.like(&alice, &created.thread.id).await.unwrap(), Outcome::Applied);
    assert_eq!(karma(&pool, "alice").await, 10);
    engine.unlike(&alice, &created.thread.id).await.unwrap();
    assert_eq!(karma(&pool, "alice").await, 10);
}

#[sqlx::test]
async fn engagement_on_deleted_content_is_not_found(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine.create_thread(&alice, new_thread("Bye", "Body")).await.unwrap();
    engine.delete_content(&alice, &created.thread.id).await.unwrap();

    assert!(matches!(
        engine.like(&bob, &created.thread.id).await,
        Err(ForumError::NotFound { .. })
    ));
    assert!(matches!(
        engine.favorite(&bob, &created.thread.id).await,
        Err(ForumError::NotFound { .. })
    ));
    assert_eq!(karma(&pool, "alice").await, 0);
}

#[sqlx::test]
async fn favorites_toggle_without_karma(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, queries) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine.create_thread(&alice, new_thread("Bookmark", "Body")).await.unwrap();
    assert_eq!(engine.favorite(&bob, &created.thread.id).await.unwrap(), Outcome::Applied);
    assert_eq!(engine.favorite(&bob, &created.thread.id).await.unwrap(), Outcome::Unchanged);
    assert_eq!(karma(&pool, "alice").await, 10);

    let favorites = queries.list_favorites("bob", ContentKind::Thread).await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].title, "Bookmark");

    assert_eq!(engine.unfavorite(&bob, &created.thread.id).await.unwrap(), Outcome::Applied);
    assert!(queries.list_favorites("bob", ContentKind::Thread).await.unwrap().is_empty());
}

// --- Moderation ---

#[sqlx::test]
async fn validation_status_is_staff_only(pool: PgPool) {
    seed_users(&pool).await;
    let (engine, _) = engines(&pool);
    let alice = student("alice");
    let bob = student("bob");

    let created = engine.create_thread(&alice, new_thread("Q", "Is 2+2 4?")).await.unwrap();
    let answer = engine.create_reply(&bob, &created.thread.id, reply("Yes")).await.unwrap();
    assert_eq!(answer.validation_status, ValidationStatus::Unverified);

    assert!(matches!(
        engine.set_validation_status(&alice, &answer.id, "validated").await,
        Err(ForumError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine.set_validation_status(&staff("ta"), &answer.id, "certain").await,
        Err(ForumError::Validation(_))
    ));

    let post = engine
        .set_validation_status(&staff("ta"), &answer.id, "validated")
        .await
        .unwrap();
    assert_eq!(post.validation_status, ValidationStatus::Validated);
}
