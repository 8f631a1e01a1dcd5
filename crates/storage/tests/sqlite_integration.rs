use chrono::Duration;
use portal_core::model::{
    CounterTable, GroupId, NewReviewEvent, NewStudySession, StudyActivityId, StudySessionId,
    WordId,
};
use portal_core::time::fixed_now;
use storage::repository::{
    CatalogRepository, ResetRepository, ReviewRepository, SessionRepository, StorageError,
};
use storage::seed::SeedCatalog;
use storage::sqlite::SqliteRepository;
use tempfile::TempDir;

async fn seeded(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo.full_reset(&SeedCatalog::default_catalog().unwrap())
        .await
        .expect("seed");
    repo
}

async fn start(repo: &SqliteRepository, offset_secs: i64) -> portal_core::model::StudySession {
    repo.insert_session(NewStudySession::new(
        GroupId::new(1),
        StudyActivityId::new(1),
        fixed_now() + Duration::seconds(offset_secs),
    ))
    .await
    .unwrap()
}

#[tokio::test]
async fn sqlite_seed_loads_catalog() {
    let repo = seeded("memdb_seed").await;

    assert_eq!(repo.total_word_count().await.unwrap(), 3);
    assert_eq!(repo.group_word_count(GroupId::new(1)).await.unwrap(), 3);
    assert_eq!(repo.group_word_count(GroupId::new(2)).await.unwrap(), 0);
    assert_eq!(
        repo.group_name(GroupId::new(2)).await.unwrap().as_deref(),
        Some("Basic Words")
    );
    let word = repo.get_word(WordId::new(2)).await.unwrap().unwrap();
    assert_eq!(word.romaji(), "neko");
    assert!(!repo.word_exists(WordId::new(99)).await.unwrap());
    assert!(
        repo.study_activity_exists(StudyActivityId::new(2))
            .await
            .unwrap()
    );

    // Migrations are idempotent.
    repo.migrate().await.unwrap();
}

#[tokio::test]
async fn sqlite_append_keeps_counters_in_step() {
    let repo = seeded("memdb_append").await;
    let session = start(&repo, 0).await;

    let outcomes = [(1, true), (1, false), (2, true), (1, true), (3, false)];
    for (i, (word, correct)) in outcomes.into_iter().enumerate() {
        let at = fixed_now() + Duration::seconds(i64::try_from(i).unwrap());
        repo.append_review(NewReviewEvent::new(
            session.id,
            WordId::new(word),
            correct,
            at,
        ))
        .await
        .unwrap();

        let history = repo.review_history().await.unwrap();
        assert_eq!(history.events.len(), i + 1);
        let replayed = CounterTable::from_events(&history.events);
        let stored = CounterTable::from_counters(history.counters);
        assert!(replayed.diff(&stored).is_empty());
    }

    assert_eq!(
        repo.counters_for_word(WordId::new(1)).await.unwrap().counts(),
        (2, 1)
    );
    assert_eq!(
        repo.counters_for_word(WordId::new(99)).await.unwrap().counts(),
        (0, 0)
    );

    let totals = repo.review_totals().await.unwrap();
    assert_eq!((totals.total, totals.correct, totals.distinct_words), (5, 3, 3));
    assert_eq!(repo.events_for_session(session.id).await.unwrap().len(), 5);
    assert_eq!(repo.events_for_word(WordId::new(1)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn sqlite_rejects_unknown_references() {
    let repo = seeded("memdb_unknown").await;

    let err = repo
        .append_review(NewReviewEvent::new(
            StudySessionId::new(9999),
            WordId::new(1),
            true,
            fixed_now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(repo.all_events_ordered().await.unwrap().is_empty());
    assert!(repo.all_counters().await.unwrap().is_empty());

    let err = repo
        .insert_session(NewStudySession::new(
            GroupId::new(42),
            StudyActivityId::new(1),
            fixed_now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert_eq!(repo.count_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn sqlite_rebuild_matches_incremental() {
    let repo = seeded("memdb_rebuild").await;
    let session = start(&repo, 0).await;
    for (word, correct) in [(1, true), (2, false), (2, false), (3, true)] {
        repo.append_review(NewReviewEvent::new(
            session.id,
            WordId::new(word),
            correct,
            fixed_now(),
        ))
        .await
        .unwrap();
    }
    let before = repo.all_counters().await.unwrap();

    sqlx::query("UPDATE word_review_counters SET correct_count = 40 WHERE word_id = 1")
        .execute(repo.pool())
        .await
        .unwrap();

    let words = repo.rebuild_counters().await.unwrap();
    assert_eq!(words, 3);
    assert_eq!(repo.all_counters().await.unwrap(), before);
}

#[tokio::test]
async fn sqlite_session_ordering_and_listing() {
    let repo = seeded("memdb_sessions").await;
    assert!(repo.last_session().await.unwrap().is_none());

    let a = start(&repo, 120).await;
    let b = start(&repo, 0).await;
    let c = start(&repo, 120).await;
    repo.insert_session(NewStudySession::new(
        GroupId::new(2),
        StudyActivityId::new(2),
        fixed_now() + Duration::seconds(60),
    ))
    .await
    .unwrap();

    let last = repo.last_session().await.unwrap().unwrap();
    assert_eq!(last.id, c.id);
    assert_eq!(last.created_at, fixed_now() + Duration::seconds(120));

    let flashcards = repo
        .list_sessions(Some(StudyActivityId::new(1)), 0, 10)
        .await
        .unwrap();
    let ids: Vec<_> = flashcards.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);

    let page = repo.list_sessions(None, 1, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, a.id);
    assert!(repo.list_sessions(None, u64::MAX, 10).await.unwrap().is_empty());

    assert_eq!(repo.count_sessions().await.unwrap(), 4);
    assert_eq!(
        repo.count_sessions_for_activity(StudyActivityId::new(1))
            .await
            .unwrap(),
        3
    );
    let groups = repo.distinct_active_group_ids().await.unwrap();
    assert_eq!(
        groups.into_iter().collect::<Vec<_>>(),
        vec![GroupId::new(1), GroupId::new(2)]
    );
}

#[tokio::test]
async fn sqlite_reset_history_keeps_catalog() {
    let repo = seeded("memdb_reset").await;
    let session = start(&repo, 0).await;
    repo.append_review(NewReviewEvent::new(
        session.id,
        WordId::new(1),
        true,
        fixed_now(),
    ))
    .await
    .unwrap();

    repo.reset_history().await.unwrap();

    assert_eq!(repo.count_sessions().await.unwrap(), 0);
    assert!(repo.all_events_ordered().await.unwrap().is_empty());
    assert!(repo.all_counters().await.unwrap().is_empty());
    assert_eq!(repo.total_word_count().await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_file_concurrent_appends_keep_every_increment() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("reviews.sqlite3").display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo.full_reset(&SeedCatalog::default_catalog().unwrap())
        .await
        .expect("seed");
    let session_id = start(&repo, 0).await.id;

    let mut writers = Vec::new();
    for writer in 0..8_u64 {
        let repo = repo.clone();
        writers.push(tokio::spawn(async move {
            for i in 0..50_u64 {
                repo.append_review(NewReviewEvent::new(
                    session_id,
                    WordId::new(2),
                    (writer + i) % 2 == 0,
                    fixed_now(),
                ))
                .await
                .unwrap();
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let counter = repo.counters_for_word(WordId::new(2)).await.unwrap();
    assert_eq!(counter.counts(), (200, 200));
    assert_eq!(repo.events_for_word(WordId::new(2)).await.unwrap().len(), 400);
}
