use portal_core::ReportingZone;
use portal_core::model::{GroupId, StudyActivityId, StudySessionId};
use serde::Serialize;

use crate::aggregate::AggregateCalculator;
use crate::dataset::Dataset;
use crate::error::ProgressError;

/// Body of `GET /dashboard/quick-stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStats {
    pub success_rate: f64,
    pub total_study_sessions: u64,
    pub total_active_groups: u64,
    pub study_streak_days: u32,
}

/// Body of `GET /dashboard/study_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyProgress {
    pub total_words_studied: u64,
    pub total_available_words: u64,
}

/// Body of `GET /dashboard/last_study_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastStudySession {
    pub id: StudySessionId,
    pub group_id: GroupId,
    pub created_at: String,
    pub study_activity_id: StudyActivityId,
    pub group_name: String,
}

/// Assembles calculator output into the dashboard response shapes.
#[derive(Clone)]
pub struct ProgressReporter {
    calculator: AggregateCalculator,
    zone: ReportingZone,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        Self {
            calculator: AggregateCalculator::new(dataset),
            zone: dataset.zone(),
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn quick_stats(&self) -> Result<QuickStats, ProgressError> {
        let snapshot = self.calculator.snapshot().await?;
        Ok(QuickStats {
            success_rate: snapshot.success_rate,
            total_study_sessions: snapshot.total_study_sessions,
            total_active_groups: snapshot.total_active_groups,
            study_streak_days: snapshot.study_streak_days,
        })
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn study_progress(&self) -> Result<StudyProgress, ProgressError> {
        Ok(StudyProgress {
            total_words_studied: self.calculator.total_words_studied().await?,
            total_available_words: self.calculator.total_available_words().await?,
        })
    }

    /// # Errors
    ///
    /// Returns `ProgressError::NoData` if no session exists.
    pub async fn last_study_session(&self) -> Result<LastStudySession, ProgressError> {
        let summary = self.calculator.last_session_summary().await?;
        Ok(LastStudySession {
            id: summary.id,
            group_id: summary.group_id,
            created_at: self.zone.format_timestamp(summary.created_at),
            study_activity_id: summary.study_activity_id,
            group_name: summary.group_name,
        })
    }
}
