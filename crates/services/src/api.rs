//! Endpoint adapters: map service results onto `{status, JSON body}` replies.
//!
//! Routes follow the HTTP surface of the study portal. An optional leading
//! `/api` segment is accepted.

use portal_core::model::{GroupId, StudyActivityId, StudySessionId, WordId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ProgressError;
use crate::portal::Portal;

/// A transport-neutral response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(500, e.to_string()),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    fn message(message: &str) -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "message": message }),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<ProgressError> for Reply {
    fn from(err: ProgressError) -> Self {
        if err.is_not_found() {
            Reply::error(404, err.to_string())
        } else {
            tracing::error!(error = %err, "request failed");
            Reply::error(500, err.to_string())
        }
    }
}

fn respond<T: Serialize>(result: Result<T, ProgressError>) -> Reply {
    match result {
        Ok(body) => Reply::ok(&body),
        Err(e) => e.into(),
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    group_id: u64,
    study_activity_id: u64,
}

/// Body of `POST /study_activities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSession {
    pub id: StudySessionId,
    pub created_at: String,
    pub group_id: GroupId,
    pub study_activity_id: StudyActivityId,
}

/// Body of `POST /study_sessions/:id/words/:word_id/review`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecorded {
    pub success: bool,
    pub word_id: WordId,
    pub study_session_id: StudySessionId,
    pub correct: bool,
    pub created_at: String,
}

#[derive(Clone)]
pub struct Api {
    portal: Portal,
}

impl Api {
    #[must_use]
    pub fn new(portal: Portal) -> Self {
        Self { portal }
    }

    #[must_use]
    pub fn portal(&self) -> &Portal {
        &self.portal
    }

    /// Route `method target` (e.g. `GET /dashboard/quick-stats?x=1`) to its endpoint.
    pub async fn handle(&self, method: &str, target: &str, body: Option<&Value>) -> Reply {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.first() == Some(&"api") {
            segments.remove(0);
        }
        let page = query_param(query, "page")
            .and_then(|p| p.parse::<u64>().ok())
            .unwrap_or(1);

        tracing::debug!(method, path, "handling request");

        match (method.to_ascii_uppercase().as_str(), segments.as_slice()) {
            ("GET", ["dashboard", "quick-stats"]) => self.quick_stats().await,
            ("GET", ["dashboard", "study_progress"]) => self.study_progress().await,
            ("GET", ["dashboard", "last_study_session"]) => self.last_study_session().await,
            ("POST", ["study_activities"]) => match body {
                Some(body) => self.create_study_session(body).await,
                None => Reply::error(400, "invalid request body"),
            },
            ("GET", ["study_activities", id, "study_sessions"]) => match id.parse() {
                Ok(id) => self.study_activity_sessions(id, page).await,
                Err(_) => Reply::error(400, "invalid study activity ID"),
            },
            ("GET", ["study_sessions"]) => self.study_sessions(page).await,
            ("GET", ["study_sessions", id]) => match id.parse() {
                Ok(id) => self.study_session(id).await,
                Err(_) => Reply::error(400, "invalid study session ID"),
            },
            ("GET", ["study_sessions", id, "words"]) => match id.parse() {
                Ok(id) => self.study_session_words(id, page).await,
                Err(_) => Reply::error(400, "invalid study session ID"),
            },
            ("POST", ["study_sessions", id, "words", word_id, "review"]) => {
                let Ok(session_id) = id.parse() else {
                    return Reply::error(400, "invalid study session ID");
                };
                let Ok(word_id) = word_id.parse() else {
                    return Reply::error(400, "invalid word ID");
                };
                let correct = query_param(query, "correct") == Some("true");
                self.review_word(session_id, word_id, correct).await
            }
            ("POST", ["reset_history"]) => self.reset_history().await,
            ("POST", ["full_reset"]) => self.full_reset().await,
            _ => Reply::error(404, format!("no route for {method} {path}")),
        }
    }

    pub async fn quick_stats(&self) -> Reply {
        respond(self.portal.reporter().quick_stats().await)
    }

    pub async fn study_progress(&self) -> Reply {
        respond(self.portal.reporter().study_progress().await)
    }

    pub async fn last_study_session(&self) -> Reply {
        respond(self.portal.reporter().last_study_session().await)
    }

    /// Body: `{"group_id": int, "study_activity_id": int}`.
    pub async fn create_study_session(&self, body: &Value) -> Reply {
        let Ok(req) = CreateSessionRequest::deserialize(body) else {
            return Reply::error(400, "invalid request body");
        };
        self.start_session(GroupId::new(req.group_id), StudyActivityId::new(req.study_activity_id))
            .await
    }

    pub async fn start_session(&self, group_id: GroupId, activity_id: StudyActivityId) -> Reply {
        let zone = self.portal.dataset().zone();
        respond(
            self.portal
                .ledger()
                .create_session(group_id, activity_id)
                .await
                .map(|s| CreatedSession {
                    id: s.id,
                    created_at: zone.format_timestamp(s.created_at),
                    group_id: s.group_id,
                    study_activity_id: s.study_activity_id,
                }),
        )
    }

    pub async fn review_word(
        &self,
        session_id: StudySessionId,
        word_id: WordId,
        correct: bool,
    ) -> Reply {
        let zone = self.portal.dataset().zone();
        respond(
            self.portal
                .events()
                .append_review(session_id, word_id, correct)
                .await
                .map(|e| ReviewRecorded {
                    success: true,
                    word_id: e.word_id,
                    study_session_id: e.session_id,
                    correct: e.correct,
                    created_at: zone.format_timestamp(e.reviewed_at),
                }),
        )
    }

    pub async fn study_sessions(&self, page: u64) -> Reply {
        respond(self.portal.listing().study_sessions(page).await)
    }

    pub async fn study_activity_sessions(&self, id: StudyActivityId, page: u64) -> Reply {
        respond(self.portal.listing().study_activity_sessions(id, page).await)
    }

    pub async fn study_session(&self, id: StudySessionId) -> Reply {
        respond(self.portal.listing().study_session(id).await)
    }

    pub async fn study_session_words(&self, id: StudySessionId, page: u64) -> Reply {
        respond(self.portal.listing().study_session_words(id, page).await)
    }

    pub async fn reset_history(&self) -> Reply {
        match self.portal.resets().reset_history().await {
            Ok(()) => Reply::message("Study history has been reset"),
            Err(e) => e.into(),
        }
    }

    pub async fn full_reset(&self) -> Reply {
        match self.portal.resets().full_reset().await {
            Ok(()) => Reply::message("System has been fully reset"),
            Err(e) => e.into(),
        }
    }

    /// Rebuild all word counters from the review log.
    pub async fn rebuild_counters(&self) -> Reply {
        respond(
            self.portal
                .counters()
                .rebuild_from_log()
                .await
                .map(|words| json!({ "success": true, "words": words })),
        )
    }

    /// Audit counters against the log, repairing drift.
    pub async fn verify_counters(&self) -> Reply {
        respond(self.portal.counters().verify().await)
    }
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seeded_dataset;

    async fn api() -> Api {
        Api::new(Portal::new(seeded_dataset().await))
    }

    #[test]
    fn query_param_lookup() {
        assert_eq!(query_param("correct=true&page=2", "page"), Some("2"));
        assert_eq!(query_param("correct=false", "correct"), Some("false"));
        assert_eq!(query_param("", "correct"), None);
    }

    #[tokio::test]
    async fn last_session_on_empty_ledger_is_404() {
        let reply = api()
            .await
            .handle("GET", "/api/dashboard/last_study_session", None)
            .await;
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body["error"], "no study sessions found");
    }

    #[tokio::test]
    async fn review_of_unknown_session_is_404() {
        let reply = api()
            .await
            .handle("POST", "/study_sessions/9999/words/1/review?correct=true", None)
            .await;
        assert_eq!(reply.status, 404);
        assert_eq!(
            reply.body["error"],
            "study session with ID 9999 does not exist"
        );
    }

    #[tokio::test]
    async fn malformed_requests_are_400() {
        let api = api().await;
        let reply = api
            .handle("POST", "/study_activities", Some(&json!({ "group_id": "x" })))
            .await;
        assert_eq!(reply.status, 400);
        let reply = api.handle("GET", "/study_sessions/abc", None).await;
        assert_eq!(reply.status, 400);
        let reply = api.handle("DELETE", "/study_sessions", None).await;
        assert_eq!(reply.status, 404);
    }

    #[tokio::test]
    async fn create_session_with_unknown_group_is_404() {
        let reply = api()
            .await
            .handle(
                "POST",
                "/study_activities",
                Some(&json!({ "group_id": 12, "study_activity_id": 1 })),
            )
            .await;
        assert_eq!(reply.status, 404);
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn reset_endpoints_reply_with_messages() {
        let api = api().await;
        let reply = api.handle("POST", "/reset_history", None).await;
        assert_eq!(
            reply.body,
            json!({ "success": true, "message": "Study history has been reset" })
        );
        let reply = api.handle("POST", "/full_reset", None).await;
        assert_eq!(reply.body["message"], "System has been fully reset");
    }
}
