use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Catalog source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Catalog not ready")]
    CatalogNotReady,

    #[error("No active plan selected")]
    NoActivePlan,

    #[error("Survey '{survey_id}' not found")]
    UnknownSurvey { survey_id: String },

    #[error("Daily limit of {daily_quota} surveys reached on plan '{plan}'")]
    QuotaExceeded { plan: String, daily_quota: u32 },

    #[error("Survey '{survey_id}': answered {answered} of {expected} questions")]
    IncompleteAnswers {
        survey_id: String,
        answered:  usize,
        expected:  usize,
    },

    #[error("Survey '{survey_id}': '{answer}' is not a choice for question '{question_id}'")]
    InvalidChoice {
        survey_id:   String,
        question_id: String,
        answer:      String,
    },

    #[error("Pending earnings {pending:.2} below withdrawal minimum {minimum:.2}")]
    BelowWithdrawalMinimum { pending: f64, minimum: f64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SurveyError {
    /// True for user-facing rejections that leave progress untouched.
    /// Everything else is an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoActivePlan
                | Self::UnknownSurvey { .. }
                | Self::QuotaExceeded { .. }
                | Self::IncompleteAnswers { .. }
                | Self::InvalidChoice { .. }
                | Self::BelowWithdrawalMinimum { .. }
        )
    }

    /// Stable short code, used for event payloads and IPC replies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_)                  => "database",
            Self::Serialization(_)             => "serialization",
            Self::SourceUnavailable { .. }     => "source_unavailable",
            Self::CatalogNotReady              => "catalog_not_ready",
            Self::NoActivePlan                 => "no_active_plan",
            Self::UnknownSurvey { .. }         => "unknown_survey",
            Self::QuotaExceeded { .. }         => "quota_exceeded",
            Self::IncompleteAnswers { .. }     => "incomplete_answers",
            Self::InvalidChoice { .. }         => "invalid_choice",
            Self::BelowWithdrawalMinimum { .. }=> "below_withdrawal_minimum",
            Self::Other(_)                     => "other",
        }
    }
}

pub type SurveyResult<T> = Result<T, SurveyError>;
