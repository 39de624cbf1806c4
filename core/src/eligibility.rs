//! Eligibility queries: pure functions over catalog + progress.
//!
//! available_surveys() is quota-blind and, under the default policy,
//! history-blind: a completed survey stays listed. Use can_start() for
//! the "may start right now" answer.

use crate::{
    config::{CatalogConfig, PlanTier, SurveyDefinition},
    progress::UserProgress,
};
use serde::{Deserialize, Serialize};

/// Fixed capability order. Unknown plan names rank below Starter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanRank {
    Unranked,
    Starter,
    Silver,
    Gold,
    Platinum,
}

impl PlanRank {
    pub fn of(plan_name: &str) -> Self {
        match plan_name {
            "Starter"  => Self::Starter,
            "Silver"   => Self::Silver,
            "Gold"     => Self::Gold,
            "Platinum" => Self::Platinum,
            _          => Self::Unranked,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unranked => "unranked",
            Self::Starter  => "Starter",
            Self::Silver   => "Silver",
            Self::Gold     => "Gold",
            Self::Platinum => "Platinum",
        }
    }
}

/// Whether already-completed surveys stay in the eligibility list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    #[default]
    IncludeCompleted,
    ExcludeCompleted,
}

/// Exact-name lookup of the progress record's plan.
pub fn active_plan<'a>(progress: &UserProgress, catalog: &'a CatalogConfig) -> Option<&'a PlanTier> {
    catalog.plan(&progress.current_plan)
}

/// Surveys whose required rank is at or below the active plan's rank,
/// in catalog order. Empty without an active plan.
pub fn available_surveys<'a>(
    progress: &UserProgress,
    catalog: &'a CatalogConfig,
) -> Vec<&'a SurveyDefinition> {
    available_surveys_with(progress, catalog, HistoryPolicy::IncludeCompleted)
}

pub fn available_surveys_with<'a>(
    progress: &UserProgress,
    catalog: &'a CatalogConfig,
    policy: HistoryPolicy,
) -> Vec<&'a SurveyDefinition> {
    let Some(plan) = active_plan(progress, catalog) else {
        return Vec::new();
    };
    let rank = PlanRank::of(&plan.plan_name);

    catalog
        .surveys
        .iter()
        .filter(|s| PlanRank::of(&s.required_plan) <= rank)
        .filter(|s| match policy {
            HistoryPolicy::IncludeCompleted => true,
            HistoryPolicy::ExcludeCompleted => !progress.completed_surveys.contains(&s.id),
        })
        .collect()
}

/// Is `survey` within the active plan's rank?
pub fn is_eligible(progress: &UserProgress, catalog: &CatalogConfig, survey: &SurveyDefinition) -> bool {
    active_plan(progress, catalog)
        .map(|p| PlanRank::of(&survey.required_plan) <= PlanRank::of(&p.plan_name))
        .unwrap_or(false)
}

/// Surveys left in today's window. Zero without an active plan.
pub fn remaining_quota(progress: &UserProgress, catalog: &CatalogConfig) -> u32 {
    active_plan(progress, catalog)
        .map(|p| p.daily_survey.saturating_sub(progress.surveys_completed_today))
        .unwrap_or(0)
}

/// The quota half of "can the user start a survey now".
pub fn can_start(progress: &UserProgress, catalog: &CatalogConfig) -> bool {
    remaining_quota(progress, catalog) > 0
}

/// Pending earnings have reached the active plan's withdrawal minimum.
pub fn withdrawal_ready(progress: &UserProgress, catalog: &CatalogConfig) -> bool {
    active_plan(progress, catalog)
        .map(|p| progress.pending_earnings >= p.minimum_withdrawal)
        .unwrap_or(false)
}
