//! Diagnostic event log.
//!
//! Every state change and every rejected attempt is recorded here.
//! Events are observations only; progress is never rebuilt from them.

use crate::types::{Amount, Day, Millis, PlanName, SurveyId};
use serde::{Deserialize, Serialize};

/// Variants are appended over time, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    ProgressSeeded {
        plan:          PlanName,
        referral_code: String,
    },
    SnapshotDiscarded {
        reason: String,
    },
    SurveyCompleted {
        survey_id:               SurveyId,
        reward:                  Amount,
        surveys_completed_today: u32,
        total_earnings:          Amount,
    },
    CompletionRejected {
        survey_id: SurveyId,
        reason:    String,
    },
    CompletionScheduled {
        task_id:   u64,
        survey_id: SurveyId,
        due_at:    Millis,
    },
    CompletionCancelled {
        task_id:   u64,
        survey_id: SurveyId,
    },
    DayRolledOver {
        from:           Option<Day>,
        to:             Day,
        previous_count: u32,
    },
    WithdrawalRequested {
        plan:    PlanName,
        pending: Amount,
        minimum: Amount,
    },
}

impl ProgressEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ProgressSeeded { .. }      => "progress_seeded",
            Self::SnapshotDiscarded { .. }   => "snapshot_discarded",
            Self::SurveyCompleted { .. }     => "survey_completed",
            Self::CompletionRejected { .. }  => "completion_rejected",
            Self::CompletionScheduled { .. } => "completion_scheduled",
            Self::CompletionCancelled { .. } => "completion_cancelled",
            Self::DayRolledOver { .. }       => "day_rolled_over",
            Self::WithdrawalRequested { .. } => "withdrawal_requested",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    /// Progress revision current when the event was written.
    pub revision:   u64,
    pub event_type: String,
    pub payload:    String, // JSON-serialized ProgressEvent
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<ProgressEvent> {
        serde_json::from_str(&self.payload)
    }
}
