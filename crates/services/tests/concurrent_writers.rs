use portal_core::ReportingZone;
use portal_core::model::{GroupId, StudyActivityId, StudySessionId, WordId};
use portal_core::time::fixed_clock;
use services::{Dataset, Portal};
use tempfile::TempDir;

const WRITERS: u64 = 8;
const REVIEWS_PER_WRITER: u64 = 50;

async fn seeded(portal: Portal) -> Portal {
    portal.resets().full_reset().await.expect("seed");
    portal
}

async fn in_memory_portal() -> Portal {
    seeded(Portal::new(Dataset::in_memory(fixed_clock()))).await
}

// Shared-cache memory databases ignore busy_timeout, so writers need a file.
async fn file_backed_portal(dir: &TempDir) -> Portal {
    let url = format!("sqlite://{}", dir.path().join("portal.sqlite3").display());
    let portal = Portal::new_sqlite(&url, fixed_clock(), ReportingZone::utc())
        .await
        .expect("sqlite portal");
    seeded(portal).await
}

async fn open_session(portal: &Portal) -> StudySessionId {
    portal
        .ledger()
        .create_session(GroupId::new(1), StudyActivityId::new(1))
        .await
        .unwrap()
        .id
}

async fn reviews_of_one_word_are_all_counted(portal: Portal) {
    let session = open_session(&portal).await;
    let word = WordId::new(1);

    let mut writers = Vec::new();
    for writer in 0..WRITERS {
        let portal = portal.clone();
        writers.push(tokio::spawn(async move {
            for i in 0..REVIEWS_PER_WRITER {
                portal
                    .events()
                    .append_review(session, word, (writer + i) % 2 == 0)
                    .await
                    .unwrap();
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let expected = WRITERS * REVIEWS_PER_WRITER;
    let counter = portal.counters().counters_for_word(word).await.unwrap();
    let events = portal.events().events_for_word(word).await.unwrap();
    assert_eq!(counter.total(), expected);
    assert_eq!(events.len() as u64, expected);
    assert_eq!(counter.counts(), (expected / 2, expected / 2));
}

async fn audits_stay_clean_while_reviews_stream_in(portal: Portal, reviews: u64) {
    let session = open_session(&portal).await;

    let writer = {
        let portal = portal.clone();
        tokio::spawn(async move {
            for i in 0..reviews {
                portal
                    .events()
                    .append_review(session, WordId::new(i % 3 + 1), i % 4 != 0)
                    .await
                    .unwrap();
            }
        })
    };

    let mut audits = 0;
    loop {
        let audit = portal.counters().verify().await.unwrap();
        assert!(audit.repaired.is_empty(), "repaired {:?}", audit.repaired);
        audits += 1;
        if writer.is_finished() && audits >= 20 {
            break;
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    let audit = portal.counters().verify().await.unwrap();
    assert_eq!(audit.words_checked, 3);
    assert!(audit.repaired.is_empty());
    let mut sum = 0;
    for id in 1..=3 {
        sum += portal
            .counters()
            .counters_for_word(WordId::new(id))
            .await
            .unwrap()
            .total();
    }
    assert_eq!(sum, reviews);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_memory_concurrent_reviews_keep_every_increment() {
    reviews_of_one_word_are_all_counted(in_memory_portal().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_reviews_keep_every_increment() {
    let dir = TempDir::new().unwrap();
    reviews_of_one_word_are_all_counted(file_backed_portal(&dir).await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_memory_verify_ignores_appends_in_flight() {
    audits_stay_clean_while_reviews_stream_in(in_memory_portal().await, 5_000).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_verify_ignores_appends_in_flight() {
    let dir = TempDir::new().unwrap();
    audits_stay_clean_while_reviews_stream_in(file_backed_portal(&dir).await, 300).await;
}
