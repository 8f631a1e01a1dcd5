use portal_core::ReportingZone;
use portal_core::model::{GroupId, StudyActivityId};
use portal_core::time::{fixed_clock, fixed_now};
use serde_json::json;
use services::{Api, Dataset, Portal};

async fn run_scenario(api: &Api) {
    let reply = api.handle("POST", "/api/full_reset", None).await;
    assert_eq!(reply.status, 200);

    let stats = api.handle("GET", "/api/dashboard/quick-stats", None).await;
    assert_eq!(stats.status, 200);
    assert_eq!(stats.body["total_study_sessions"], 0);
    assert_eq!(stats.body["success_rate"], 0.0);

    let created = api
        .handle(
            "POST",
            "/api/study_activities",
            Some(&json!({ "group_id": 1, "study_activity_id": 1 })),
        )
        .await;
    assert_eq!(created.status, 200);
    assert_eq!(created.body["group_id"], 1);
    assert_eq!(created.body["created_at"], "2023-11-14T22:13:20+00:00");
    let session_id = created.body["id"].as_u64().unwrap();

    let reviewed = api
        .handle(
            "POST",
            &format!("/api/study_sessions/{session_id}/words/1/review?correct=true"),
            None,
        )
        .await;
    assert_eq!(reviewed.status, 200);
    assert_eq!(reviewed.body["success"], true);
    assert_eq!(reviewed.body["correct"], true);

    let wrong = api
        .handle(
            "POST",
            &format!("/api/study_sessions/{session_id}/words/2/review?correct=false"),
            None,
        )
        .await;
    assert_eq!(wrong.status, 200);

    let stats = api.handle("GET", "/api/dashboard/quick-stats", None).await;
    assert_eq!(
        stats.body,
        json!({
            "success_rate": 0.5,
            "total_study_sessions": 1,
            "total_active_groups": 1,
            "study_streak_days": 1
        })
    );

    let progress = api.handle("GET", "/api/dashboard/study_progress", None).await;
    assert_eq!(
        progress.body,
        json!({ "total_words_studied": 2, "total_available_words": 3 })
    );

    let last = api
        .handle("GET", "/api/dashboard/last_study_session", None)
        .await;
    assert_eq!(last.status, 200);
    assert_eq!(last.body["id"].as_u64(), Some(session_id));
    assert_eq!(last.body["group_name"], "Animals");

    let listing = api.handle("GET", "/api/study_sessions?page=1", None).await;
    assert_eq!(listing.body["total_items"], 1);
    assert_eq!(listing.body["items"][0]["review_items_count"], 2);
    assert_eq!(listing.body["items"][0]["activity_name"], "Flashcards");

    let far = api
        .handle("GET", "/api/study_sessions?page=100000000000000000", None)
        .await;
    assert_eq!(far.status, 200);
    assert_eq!(far.body["items"], json!([]));
    assert_eq!(far.body["total_items"], 1);

    let words = api
        .handle("GET", &format!("/api/study_sessions/{session_id}/words"), None)
        .await;
    assert_eq!(words.body["items"][1]["english"], "cat");
    assert_eq!(words.body["items"][1]["wrong_count"], 1);

    let verify = api.verify_counters().await;
    assert_eq!(verify.status, 200);
    assert_eq!(verify.body["repaired"], json!([]));

    let reply = api.handle("POST", "/api/reset_history", None).await;
    assert_eq!(reply.status, 200);
    let last = api
        .handle("GET", "/api/dashboard/last_study_session", None)
        .await;
    assert_eq!(last.status, 404);
    assert!(last.body["error"].is_string());
}

#[tokio::test]
async fn end_to_end_in_memory() {
    let api = Api::new(Portal::new(Dataset::in_memory(fixed_clock())));
    run_scenario(&api).await;
}

#[tokio::test]
async fn end_to_end_sqlite() {
    let portal = Portal::new_sqlite(
        "sqlite:file:memdb_dashboard_flow?mode=memory&cache=shared",
        fixed_clock(),
        ReportingZone::utc(),
    )
    .await
    .expect("sqlite portal");
    run_scenario(&Api::new(portal)).await;
}

#[tokio::test]
async fn sqlite_unknown_references_leave_no_trace() {
    let portal = Portal::new_sqlite(
        "sqlite:file:memdb_unknown_refs?mode=memory&cache=shared",
        fixed_clock(),
        ReportingZone::utc(),
    )
    .await
    .unwrap();
    let api = Api::new(portal);
    api.full_reset().await;

    let reply = api
        .handle("POST", "/study_sessions/9999/words/1/review?correct=true", None)
        .await;
    assert_eq!(reply.status, 404);

    let session = api
        .portal()
        .ledger()
        .create_session(GroupId::new(1), StudyActivityId::new(1))
        .await
        .unwrap();
    assert_eq!(session.created_at, fixed_now());
    let reply = api
        .handle(
            "POST",
            &format!("/study_sessions/{}/words/404/review?correct=true", session.id),
            None,
        )
        .await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body["error"], "word with ID 404 does not exist");

    let progress = api.study_progress().await;
    assert_eq!(progress.body["total_words_studied"], 0);
}
